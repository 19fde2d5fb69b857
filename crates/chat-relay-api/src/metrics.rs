//! Metrics collection for the API service.

use prometheus::{
    Histogram, HistogramOpts, IntCounter, IntCounterVec, IntGauge, Opts, Registry, TextEncoder,
};
use std::sync::Arc;

/// Service metrics for observability
///
/// Each instance owns its registry, so independent services (and tests) do
/// not collide on metric names.
#[derive(Debug)]
pub struct ServiceMetrics {
    registry: Registry,

    // HTTP request metrics
    pub http_request_duration: Histogram,

    // Webhook processing metrics
    pub webhook_requests_total: IntCounterVec,

    // Deferred reply metrics
    pub deferred_tasks_scheduled_total: IntCounter,
    pub deferred_tasks_pending: IntGauge,
}

impl ServiceMetrics {
    pub fn new() -> Result<Arc<Self>, prometheus::Error> {
        let registry = Registry::new();

        let http_request_duration = Histogram::with_opts(
            HistogramOpts::new(
                "http_request_duration_seconds",
                "HTTP request processing time",
            )
            .buckets(vec![0.001, 0.01, 0.1, 0.5, 1.0, 5.0, 10.0]),
        )?;
        let webhook_requests_total = IntCounterVec::new(
            Opts::new(
                "webhook_requests_total",
                "Webhook requests received, by outcome",
            ),
            &["outcome"],
        )?;
        let deferred_tasks_scheduled_total = IntCounter::new(
            "deferred_tasks_scheduled_total",
            "Deferred replies scheduled",
        )?;
        let deferred_tasks_pending = IntGauge::new(
            "deferred_tasks_pending",
            "Deferred replies waiting to fire",
        )?;

        registry.register(Box::new(http_request_duration.clone()))?;
        registry.register(Box::new(webhook_requests_total.clone()))?;
        registry.register(Box::new(deferred_tasks_scheduled_total.clone()))?;
        registry.register(Box::new(deferred_tasks_pending.clone()))?;

        Ok(Arc::new(Self {
            registry,
            http_request_duration,
            webhook_requests_total,
            deferred_tasks_scheduled_total,
            deferred_tasks_pending,
        }))
    }

    pub fn record_http_request(&self, duration: std::time::Duration) {
        self.http_request_duration.observe(duration.as_secs_f64());
    }

    pub fn record_webhook_request(&self, outcome: &str) {
        self.webhook_requests_total
            .with_label_values(&[outcome])
            .inc();
    }

    pub fn record_task_scheduled(&self) {
        self.deferred_tasks_scheduled_total.inc();
    }

    pub fn set_pending_tasks(&self, pending: usize) {
        self.deferred_tasks_pending
            .set(i64::try_from(pending).unwrap_or(i64::MAX));
    }

    /// Render every registered metric in the Prometheus text format.
    pub fn encode(&self) -> Result<String, prometheus::Error> {
        TextEncoder::new().encode_to_string(&self.registry.gather())
    }
}

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;
