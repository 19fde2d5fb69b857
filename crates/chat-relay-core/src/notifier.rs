//! Deferred one-shot notifications.
//!
//! A [`DeferredTask`] is scheduled while a webhook request is being handled
//! and fires later, after that request has completed. When it fires, the
//! reply is built by the task's payload factory and pushed to the
//! conversation through an [`OutboundClient`].
//!
//! # Delivery Guarantees
//!
//! Delivery is best effort and at most once:
//! - tasks live only in process memory and are lost if the process exits
//!   before they fire;
//! - a failed send is logged with the conversation ID and dropped, never
//!   retried, because there is no longer a request to report it to;
//! - scheduled tasks cannot be cancelled.

use crate::{ConversationId, ReplyEnvelope};
use async_trait::async_trait;
use std::fmt;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};

// ============================================================================
// Deferred Task
// ============================================================================

/// Produces the follow-up reply when a task fires.
pub type PayloadFactory = Box<dyn FnOnce() -> ReplyEnvelope + Send + 'static>;

/// A scheduled one-shot notification.
pub struct DeferredTask {
    /// Delay between scheduling and firing
    pub fire_after: Duration,

    /// Conversation the follow-up is delivered into
    pub conversation_id: ConversationId,

    payload: PayloadFactory,
}

impl DeferredTask {
    /// Create a task whose reply is produced by `payload` at fire time
    pub fn new(
        fire_after: Duration,
        conversation_id: ConversationId,
        payload: impl FnOnce() -> ReplyEnvelope + Send + 'static,
    ) -> Self {
        Self {
            fire_after,
            conversation_id,
            payload: Box::new(payload),
        }
    }

    /// Run the payload factory, consuming the task
    pub fn materialize(self) -> (ConversationId, ReplyEnvelope) {
        let reply = (self.payload)();
        (self.conversation_id, reply)
    }
}

impl fmt::Debug for DeferredTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeferredTask")
            .field("fire_after", &self.fire_after)
            .field("conversation_id", &self.conversation_id)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Capabilities
// ============================================================================

/// Accepts deferred tasks for later execution.
pub trait TaskScheduler: Send + Sync {
    /// Schedule `task`; returns immediately
    fn schedule(&self, task: DeferredTask);
}

/// Pushes a message into a conversation outside of a request/response
/// exchange.
///
/// Implementations must be safe to call concurrently: every firing timer
/// shares the same client.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OutboundClient: Send + Sync {
    /// Deliver `reply` into `conversation_id`
    async fn send(
        &self,
        conversation_id: &ConversationId,
        reply: &ReplyEnvelope,
    ) -> Result<(), OutboundError>;
}

/// Failure to deliver an outbound message.
#[derive(Debug, thiserror::Error)]
pub enum OutboundError {
    #[error("Outbound request failed: {message}")]
    Transport { message: String },

    #[error("Chat platform rejected message: {status} - {message}")]
    Rejected { status: u16, message: String },

    #[error("Outbound credentials unavailable: {message}")]
    Unauthorized { message: String },
}

impl OutboundError {
    /// Check if this error represents a transient condition
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            Self::Unauthorized { .. } => false,
        }
    }
}

// ============================================================================
// Deferred Notifier
// ============================================================================

/// Timer-driven [`TaskScheduler`] that delivers through an [`OutboundClient`].
///
/// Each scheduled task runs on its own Tokio task, so `schedule` must be
/// called from within a Tokio runtime.
pub struct DeferredNotifier {
    client: Arc<dyn OutboundClient>,
    pending: Arc<AtomicUsize>,
}

impl DeferredNotifier {
    /// Create a notifier delivering through `client`
    pub fn new(client: Arc<dyn OutboundClient>) -> Self {
        Self {
            client,
            pending: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Number of tasks scheduled that have not finished firing yet
    pub fn pending_tasks(&self) -> usize {
        self.pending.load(Ordering::SeqCst)
    }
}

impl TaskScheduler for DeferredNotifier {
    fn schedule(&self, task: DeferredTask) {
        let client = Arc::clone(&self.client);
        let guard = PendingGuard::new(Arc::clone(&self.pending));

        debug!(
            conversation_id = %task.conversation_id,
            fire_after_ms = task.fire_after.as_millis() as u64,
            "Deferred task scheduled"
        );

        tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(task.fire_after).await;
            deliver(client.as_ref(), task).await;
        });
    }
}

async fn deliver(client: &dyn OutboundClient, task: DeferredTask) {
    let (conversation_id, reply) = task.materialize();

    match client.send(&conversation_id, &reply).await {
        Ok(()) => {
            info!(conversation_id = %conversation_id, "Deferred message delivered");
        }
        Err(e) => {
            error!(
                conversation_id = %conversation_id,
                error = %e,
                transient = e.is_transient(),
                "Failed to deliver deferred message"
            );
        }
    }
}

/// Keeps the pending count accurate even when a task is dropped before it
/// fires, e.g. on runtime shutdown.
struct PendingGuard(Arc<AtomicUsize>);

impl PendingGuard {
    fn new(counter: Arc<AtomicUsize>) -> Self {
        counter.fetch_add(1, Ordering::SeqCst);
        Self(counter)
    }
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[cfg(test)]
#[path = "notifier_tests.rs"]
mod tests;
