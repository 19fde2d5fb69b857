//! Keyword-triggered lookups against external data sources.

use crate::ReplyEnvelope;
use async_trait::async_trait;

/// External data source consulted when a message matches a lookup keyword.
///
/// Implementations fetch the remote data and turn it into a reply. The
/// dispatcher never sees the raw payload; it only needs a reply or an error
/// it can swap for an apology.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ExternalLookup: Send + Sync {
    /// Fetch data for `query` and render it as a reply
    async fn lookup(&self, query: &str) -> Result<ReplyEnvelope, FetchError>;
}

/// Failure of an external lookup.
///
/// Never surfaced to the chat platform as an error response; the dispatcher
/// replaces it with the configured apology text.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("Lookup request failed: {message}")]
    Transport { message: String },

    #[error("Lookup returned HTTP {status}")]
    Status { status: u16 },

    #[error("Lookup response could not be decoded: {message}")]
    InvalidPayload { message: String },
}

impl FetchError {
    /// Check if the failure might succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status } => *status >= 500 || *status == 429,
            Self::InvalidPayload { .. } => false,
        }
    }
}
