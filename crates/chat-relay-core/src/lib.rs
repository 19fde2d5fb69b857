//! # Chat Relay Core
//!
//! Core logic for the Chat Relay webhook bot: decoding chat platform events,
//! routing them to a reply, and delivering delayed follow-up messages.
//!
//! ## Architecture
//!
//! - [`dispatch::Dispatcher`] turns one inbound request body into an optional
//!   [`ReplyEnvelope`] or a structured [`dispatch::DispatchError`].
//! - [`notifier::DeferredNotifier`] fires one-shot follow-up messages after a
//!   delay, outside the lifetime of the request that scheduled them.
//! - Everything that talks to the outside world sits behind a trait
//!   ([`notifier::OutboundClient`], [`lookup::ExternalLookup`],
//!   [`notifier::TaskScheduler`]) and is injected at construction time.
//!
//! ## Usage
//!
//! ```rust
//! use chat_relay_core::{duration::parse_duration, ConversationId};
//! use std::time::Duration;
//!
//! let conversation = ConversationId::new("spaces/AAAA").unwrap();
//! assert_eq!(conversation.as_str(), "spaces/AAAA");
//! assert_eq!(parse_duration("1m30s").unwrap(), Duration::from_secs(90));
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub mod dispatch;
pub mod duration;
pub mod event;
pub mod lookup;
pub mod notifier;
pub mod reply;

pub use dispatch::{DispatchError, Dispatcher, DispatcherConfig, MessagePolicy};
pub use event::{ConversationKind, DecodeError, EventEnvelope, EventKind};
pub use lookup::{ExternalLookup, FetchError};
pub use notifier::{
    DeferredNotifier, DeferredTask, OutboundClient, OutboundError, PayloadFactory, TaskScheduler,
};
pub use reply::ReplyEnvelope;

// ============================================================================
// Domain Identifier Types
// ============================================================================

/// Opaque identifier of the room or thread a reply is delivered into.
///
/// For the chat platform this is the space resource name, e.g. `spaces/AAAA`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ConversationId(String);

impl ConversationId {
    /// Create a conversation ID with validation
    ///
    /// # Validation Rules
    /// - Must not be empty
    /// - Must not contain whitespace
    pub fn new(value: impl Into<String>) -> Result<Self, ValidationError> {
        let value = value.into();

        if value.is_empty() {
            return Err(ValidationError::Required {
                field: "conversation_id".to_string(),
            });
        }

        if value.chars().any(char::is_whitespace) {
            return Err(ValidationError::InvalidCharacters {
                field: "conversation_id".to_string(),
                invalid_chars: "whitespace".to_string(),
            });
        }

        Ok(Self(value))
    }

    /// Get string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConversationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ConversationId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for ConversationId {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<ConversationId> for String {
    fn from(id: ConversationId) -> Self {
        id.0
    }
}

// ============================================================================
// Error Types
// ============================================================================

/// Error type for input validation failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ValidationError {
    #[error("Field '{field}' is required")]
    Required { field: String },

    #[error("Field '{field}' contains invalid characters: {invalid_chars}")]
    InvalidCharacters {
        field: String,
        invalid_chars: String,
    },
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
