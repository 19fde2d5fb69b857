//! # Chat Relay HTTP Service
//!
//! HTTP server that receives chat platform events and answers them through
//! the [`chat_relay_core::Dispatcher`].
//!
//! This service provides:
//! - The webhook endpoint the chat platform posts events to
//! - Health and readiness endpoints
//! - A Prometheus metrics endpoint
//!
//! Deferred replies are scheduled on a [`DeferredNotifier`] owned by the
//! [`AppState`], so they outlive the request that created them.

pub mod config;
pub mod errors;
pub mod metrics;
pub mod responses;

pub use config::{
    ChatApiConfig, ConfigError, LoggingConfig, LookupConfig, ServerConfig, ServiceConfig,
    WebhookConfig,
};
pub use errors::{ServiceError, WebhookHandlerError};
pub use metrics::ServiceMetrics;
pub use responses::{HealthResponse, ReadinessResponse};

use axum::{
    extract::{DefaultBodyLimit, FromRequest, Request, State},
    http::{HeaderMap, HeaderValue, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{any, get},
    Router,
};
use bytes::Bytes;
use chat_relay_core::{
    DeferredNotifier, DeferredTask, Dispatcher, ExternalLookup, OutboundClient, ReplyEnvelope,
    TaskScheduler,
};
use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;
use tracing::{error, info, instrument, warn};

// ============================================================================
// Application State
// ============================================================================

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    /// Configuration for the service
    pub config: ServiceConfig,

    /// Routes inbound events to replies
    pub dispatcher: Arc<Dispatcher>,

    /// Fires deferred replies; queried for the pending count
    pub notifier: Arc<DeferredNotifier>,

    /// Metrics collector for observability
    pub metrics: Arc<ServiceMetrics>,
}

impl AppState {
    /// Create new application state
    pub fn new(
        config: ServiceConfig,
        dispatcher: Arc<Dispatcher>,
        notifier: Arc<DeferredNotifier>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        Self {
            config,
            dispatcher,
            notifier,
            metrics,
        }
    }

    /// Wire a dispatcher and notifier around the given remote clients.
    ///
    /// Deferred replies are delivered through `outbound`; `lookup` serves the
    /// keyword policy when one is configured.
    pub fn with_clients(
        config: ServiceConfig,
        outbound: Arc<dyn OutboundClient>,
        lookup: Option<Arc<dyn ExternalLookup>>,
        metrics: Arc<ServiceMetrics>,
    ) -> Self {
        let notifier = Arc::new(DeferredNotifier::new(outbound));
        let scheduler = Arc::new(MeteredScheduler {
            inner: notifier.clone(),
            metrics: metrics.clone(),
        });

        let mut dispatcher = Dispatcher::new(config.bot.clone(), scheduler);
        if let Some(lookup) = lookup {
            dispatcher = dispatcher.with_lookup(lookup);
        }

        Self::new(config, Arc::new(dispatcher), notifier, metrics)
    }
}

/// Counts scheduled tasks before handing them to the notifier.
struct MeteredScheduler {
    inner: Arc<DeferredNotifier>,
    metrics: Arc<ServiceMetrics>,
}

impl TaskScheduler for MeteredScheduler {
    fn schedule(&self, task: DeferredTask) {
        self.metrics.record_task_scheduled();
        self.inner.schedule(task);
    }
}

// ============================================================================
// Router and Server
// ============================================================================

/// Create the HTTP router with all endpoints
pub fn create_router(state: AppState) -> Router {
    // Any method reaches the handler, which rejects non-POST before reading.
    let webhook_routes =
        Router::new().route(&state.config.webhooks.endpoint_path, any(handle_webhook));

    let health_routes = Router::new()
        .route("/health", get(handle_health_check))
        .route("/ready", get(handle_readiness_check));

    let observability_routes = Router::new().route("/metrics", get(metrics_endpoint));

    Router::new()
        .merge(webhook_routes)
        .merge(health_routes)
        .merge(observability_routes)
        .layer(DefaultBodyLimit::max(state.config.server.max_body_size))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(middleware::from_fn(request_logging_middleware))
                .layer(middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .into_inner(),
        )
        .with_state(state)
}

/// Start HTTP server
///
/// Binds `server.host:server.port`, serves until SIGINT or SIGTERM, then
/// drains in-flight requests for at most `server.shutdown_timeout_seconds`.
pub async fn start_server(
    config: ServiceConfig,
    outbound: Arc<dyn OutboundClient>,
    lookup: Option<Arc<dyn ExternalLookup>>,
) -> Result<(), ServiceError> {
    config.validate()?;

    let metrics = ServiceMetrics::new().map_err(|e| {
        ServiceError::Configuration(ConfigError::Invalid {
            message: format!("Failed to initialize metrics: {}", e),
        })
    })?;

    let address = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(address.as_str())
        .await
        .map_err(|e| ServiceError::BindFailed {
            address: address.clone(),
            message: e.to_string(),
        })?;

    info!(address = %address, "Starting HTTP server");

    let state = AppState::with_clients(config, outbound, lookup, metrics);
    serve(listener, state, shutdown_signal()).await
}

/// Serve `state` on an already bound listener until `shutdown` resolves.
///
/// After `shutdown` resolves the listener stops accepting connections and
/// in-flight requests get `server.shutdown_timeout_seconds` to finish.
/// Deferred replies that have not fired yet are dropped.
pub async fn serve<F>(
    listener: tokio::net::TcpListener,
    state: AppState,
    shutdown: F,
) -> Result<(), ServiceError>
where
    F: Future<Output = ()> + Send + 'static,
{
    let shutdown_timeout = Duration::from_secs(state.config.server.shutdown_timeout_seconds);
    let notifier = state.notifier.clone();
    let app = create_router(state);

    let (signalled_tx, mut signalled_rx) = tokio::sync::watch::channel(false);
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown.await;
            let _ = signalled_tx.send(true);
        })
        .into_future();
    tokio::pin!(server);

    let drain_deadline = async move {
        let signalled = signalled_rx.wait_for(|signalled| *signalled).await.is_ok();
        if !signalled {
            return std::future::pending::<()>().await;
        }
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        result = &mut server => {
            result.map_err(|e| ServiceError::ServerFailed {
                message: e.to_string(),
            })?;
        }
        _ = drain_deadline => {
            warn!(
                timeout_seconds = shutdown_timeout.as_secs(),
                "In-flight requests did not finish before the shutdown timeout"
            );
        }
    }

    let pending = notifier.pending_tasks();
    if pending > 0 {
        warn!(pending_tasks = pending, "Dropping deferred replies that have not fired");
    }

    info!("HTTP server shutdown complete");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT (Ctrl+C), initiating graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, initiating graceful shutdown"),
    }
}

// ============================================================================
// Webhook Handler
// ============================================================================

/// Handle one chat platform event
///
/// Anything but `POST` is rejected before the body is read. The reply, if
/// any, is returned synchronously as the JSON response body. Events that need
/// no reply get `200 OK` with an empty body.
#[instrument(skip(state, request), fields(method = %request.method(), body_size))]
pub async fn handle_webhook(
    State(state): State<AppState>,
    request: Request,
) -> Result<Response, WebhookHandlerError> {
    let result = process_event(&state, request).await;

    match result {
        Ok(Some(reply)) => {
            state.metrics.record_webhook_request("reply");
            Ok(Json(reply).into_response())
        }
        Ok(None) => {
            state.metrics.record_webhook_request("no_reply");
            Ok(StatusCode::OK.into_response())
        }
        Err(err) => {
            state.metrics.record_webhook_request(err.outcome());
            Err(err)
        }
    }
}

/// Buffer the body of a `POST`, honouring the router's body limit, and
/// dispatch it.
async fn process_event(
    state: &AppState,
    request: Request,
) -> Result<Option<ReplyEnvelope>, WebhookHandlerError> {
    let method = request.method().clone();
    if method != Method::POST {
        return Err(WebhookHandlerError::MethodNotAllowed {
            method: method.to_string(),
        });
    }

    let body = Bytes::from_request(request, state).await?;
    tracing::Span::current().record("body_size", body.len());

    Ok(state.dispatcher.handle(method.as_str(), &body).await?)
}

// ============================================================================
// Health and Observability Handlers
// ============================================================================

/// Basic health check endpoint
#[instrument(skip(state))]
async fn handle_health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        pending_tasks: state.notifier.pending_tasks(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Readiness check
///
/// The service holds no connections that need warming up, so it is ready as
/// soon as it serves requests.
#[instrument(skip_all)]
async fn handle_readiness_check() -> Json<ReadinessResponse> {
    Json(ReadinessResponse {
        ready: true,
        timestamp: chrono::Utc::now(),
    })
}

/// Prometheus metrics endpoint
#[instrument(skip_all)]
async fn metrics_endpoint(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .set_pending_tasks(state.notifier.pending_tasks());

    state.metrics.encode().map_err(|e| {
        error!(error = %e, "Failed to encode metrics");
        StatusCode::INTERNAL_SERVER_ERROR
    })
}

// ============================================================================
// Middleware
// ============================================================================

/// Header carrying the request correlation ID
pub const CORRELATION_ID_HEADER: &str = "x-correlation-id";

/// Tags each request with a correlation ID and logs its completion.
///
/// A non-empty `x-correlation-id` from the caller is kept; otherwise a fresh
/// UUID is used. The ID is echoed on the response.
#[instrument(skip_all, fields(
    method = %request.method(),
    uri = %request.uri(),
    correlation_id
))]
async fn request_logging_middleware(
    mut request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let correlation_id = correlation_id_of(request.headers());
    tracing::Span::current().record("correlation_id", correlation_id.as_str());
    request.extensions_mut().insert(correlation_id.clone());

    let start = std::time::Instant::now();
    let mut response = next.run(request).await;
    let elapsed_ms = start.elapsed().as_millis() as u64;

    if let Ok(value) = HeaderValue::from_str(&correlation_id) {
        response.headers_mut().insert(CORRELATION_ID_HEADER, value);
    }

    let status = response.status();
    if status.is_client_error() || status.is_server_error() {
        warn!(status = status.as_u16(), elapsed_ms, "Request failed");
    } else {
        info!(status = status.as_u16(), elapsed_ms, "Request handled");
    }

    response
}

fn correlation_id_of(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string())
}

/// Records the request duration histogram.
async fn metrics_middleware(
    State(state): State<AppState>,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let start = std::time::Instant::now();
    let response = next.run(request).await;
    state.metrics.record_http_request(start.elapsed());
    response
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
