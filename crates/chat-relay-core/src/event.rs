//! Inbound chat platform events.
//!
//! The platform posts one JSON object per event. Only a handful of fields
//! matter for routing:
//!
//! | JSON path              | Envelope field      | Required |
//! |------------------------|---------------------|----------|
//! | `type`                 | `kind`              | yes      |
//! | `space.name`           | `conversation_id`   | yes      |
//! | `space.type`           | `conversation_kind` | no       |
//! | `message.text`         | `text`              | no       |
//! | `message.argumentText` | `argument_text`     | no       |
//! | `user.name`            | `sender_id`         | no       |
//! | `user.displayName`     | `sender_name`       | no       |
//! | `eventTime`            | `event_time`        | no       |
//!
//! Everything else in the payload is ignored.

use crate::ConversationId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

// ============================================================================
// Event Classification
// ============================================================================

/// Kind of platform event carried by an envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventKind {
    /// A user posted a message to the bot (`MESSAGE`)
    MessageReceived,

    /// The bot was added to a room or direct conversation (`ADDED_TO_SPACE`)
    ParticipantAdded,

    /// Any other event type, kept verbatim (e.g. `REMOVED_FROM_SPACE`)
    Other(String),
}

impl EventKind {
    /// Map the platform's `type` string onto an event kind
    pub fn from_wire(value: &str) -> Self {
        match value {
            "MESSAGE" => Self::MessageReceived,
            "ADDED_TO_SPACE" => Self::ParticipantAdded,
            other => Self::Other(other.to_string()),
        }
    }

    /// Platform `type` string for this kind
    pub fn as_str(&self) -> &str {
        match self {
            Self::MessageReceived => "MESSAGE",
            Self::ParticipantAdded => "ADDED_TO_SPACE",
            Self::Other(value) => value,
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Whether the conversation is a multi-party room or a direct conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ConversationKind {
    /// Multi-party room (`ROOM`)
    Room,
    /// One-to-one conversation with the bot (`DM`)
    Direct,
    /// Absent or unrecognized `space.type`
    Unknown,
}

impl ConversationKind {
    fn from_wire(value: Option<&str>) -> Self {
        match value {
            Some("ROOM") => Self::Room,
            Some("DM") => Self::Direct,
            _ => Self::Unknown,
        }
    }
}

// ============================================================================
// Event Envelope
// ============================================================================

/// Decoded representation of an inbound platform event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventEnvelope {
    pub kind: EventKind,
    pub conversation_id: ConversationId,
    pub conversation_kind: ConversationKind,
    /// Raw message text; empty when the event carries no message
    pub text: String,
    /// Message text with the bot mention stripped, when the platform sends it
    pub argument_text: Option<String>,
    pub sender_id: Option<String>,
    pub sender_name: Option<String>,
    pub event_time: Option<DateTime<Utc>>,
}

impl EventEnvelope {
    /// Decode an envelope from a raw request body.
    ///
    /// Never panics: every malformed or incomplete body maps onto a
    /// [`DecodeError`].
    pub fn decode(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body)?;
        let root = value.as_object().ok_or(DecodeError::NotAnObject)?;

        let kind = match string_at(root, &["type"])? {
            Some("") => {
                return Err(DecodeError::InvalidField {
                    field: "type".to_string(),
                    message: "must not be empty".to_string(),
                })
            }
            Some(value) => EventKind::from_wire(value),
            None => {
                return Err(DecodeError::MissingField {
                    field: "type".to_string(),
                })
            }
        };

        let space_name =
            string_at(root, &["space", "name"])?.ok_or_else(|| DecodeError::MissingField {
                field: "space.name".to_string(),
            })?;
        let conversation_id =
            ConversationId::new(space_name).map_err(|e| DecodeError::InvalidField {
                field: "space.name".to_string(),
                message: e.to_string(),
            })?;

        // Informational only; an unparseable timestamp must not block routing.
        let event_time = string_at(root, &["eventTime"])?.and_then(|raw| {
            DateTime::parse_from_rfc3339(raw)
                .map(|t| t.with_timezone(&Utc))
                .map_err(|e| {
                    debug!(event_time = raw, error = %e, "Ignoring unparseable eventTime");
                })
                .ok()
        });

        Ok(Self {
            kind,
            conversation_id,
            conversation_kind: ConversationKind::from_wire(string_at(root, &["space", "type"])?),
            text: string_at(root, &["message", "text"])?
                .unwrap_or_default()
                .to_string(),
            argument_text: string_at(root, &["message", "argumentText"])?.map(str::to_string),
            sender_id: string_at(root, &["user", "name"])?.map(str::to_string),
            sender_name: string_at(root, &["user", "displayName"])?.map(str::to_string),
            event_time,
        })
    }

    /// Text a command keyword is matched against: the argument text when the
    /// platform supplied it, the raw message text otherwise.
    pub fn command_text(&self) -> &str {
        self.argument_text.as_deref().unwrap_or(&self.text)
    }
}

/// Walk `path` through nested objects and return the string at its end.
///
/// Missing or `null` segments yield `Ok(None)`; a segment of the wrong JSON
/// type is an [`DecodeError::InvalidField`].
fn string_at<'a>(
    root: &'a Map<String, Value>,
    path: &[&str],
) -> Result<Option<&'a str>, DecodeError> {
    let invalid = |expected: &str| DecodeError::InvalidField {
        field: path.join("."),
        message: format!("expected {}", expected),
    };

    let Some((leaf, parents)) = path.split_last() else {
        return Ok(None);
    };

    let mut current = root;
    for segment in parents {
        match current.get(*segment) {
            None | Some(Value::Null) => return Ok(None),
            Some(Value::Object(child)) => current = child,
            Some(_) => return Err(invalid("an object")),
        }
    }

    match current.get(*leaf) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(value)) => Ok(Some(value.as_str())),
        Some(_) => Err(invalid("a string")),
    }
}

// ============================================================================
// Errors
// ============================================================================

/// Failure to decode a request body into an [`EventEnvelope`].
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("JSON parsing failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Event payload must be a JSON object")]
    NotAnObject,

    #[error("Missing required field: {field}")]
    MissingField { field: String },

    #[error("Invalid field format: {field} - {message}")]
    InvalidField { field: String, message: String },
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
