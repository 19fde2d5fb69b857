//! Reply payloads returned to the chat platform.

use serde::{Deserialize, Serialize};

/// Structured response payload for the chat platform.
///
/// Serializes as `{"text": "..."}`, adding a `cards` array only when display
/// elements are attached. Cards are opaque JSON produced by whichever handler
/// built the reply; the core never inspects them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReplyEnvelope {
    /// Human-readable message text
    pub text: String,

    /// Structured display elements (cards/widgets)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cards: Vec<serde_json::Value>,
}

impl ReplyEnvelope {
    /// Create a plain text reply
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            cards: Vec::new(),
        }
    }

    /// Create a reply carrying display cards alongside its text
    pub fn with_cards(text: impl Into<String>, cards: Vec<serde_json::Value>) -> Self {
        Self {
            text: text.into(),
            cards,
        }
    }

    /// Whether the reply carries any cards
    pub fn has_cards(&self) -> bool {
        !self.cards.is_empty()
    }
}

#[cfg(test)]
#[path = "reply_tests.rs"]
mod tests;
