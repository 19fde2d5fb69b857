//! Event dispatch: from a raw request body to a reply.
//!
//! The [`Dispatcher`] accepts only `POST` requests, decodes the body into an
//! [`EventEnvelope`] and routes it:
//!
//! 1. `ADDED_TO_SPACE` in a room produces the configured greeting; in a
//!    direct conversation it produces no reply unless a direct greeting is
//!    configured.
//! 2. `MESSAGE` is handled according to the configured [`MessagePolicy`].
//! 3. Any other event kind is accepted and ignored.
//!
//! Routing is a pure function of the envelope, except that the
//! [`MessagePolicy::DeferredReply`] policy schedules one [`DeferredTask`] per
//! accepted delay and [`MessagePolicy::KeywordLookup`] consults the external
//! lookup.

use crate::duration::{format_duration, parse_duration};
use crate::event::{ConversationKind, DecodeError, EventEnvelope, EventKind};
use crate::lookup::ExternalLookup;
use crate::notifier::{DeferredTask, TaskScheduler};
use crate::ReplyEnvelope;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// The only request method the dispatcher accepts, matched case-sensitively.
pub const ACCEPTED_METHOD: &str = "POST";

// ============================================================================
// Configuration
// ============================================================================

/// Reply behaviour of a [`Dispatcher`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Reply when the bot is added to a room
    pub greeting: String,

    /// Reply when the bot is added to a direct conversation (none = silent)
    pub direct_greeting: Option<String>,

    /// How `MESSAGE` events are answered
    pub message_policy: MessagePolicy,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            greeting: "thanks for adding me.".to_string(),
            direct_greeting: None,
            message_policy: MessagePolicy::default(),
        }
    }
}

/// How the dispatcher answers `MESSAGE` events.
///
/// Deserialized from a table tagged by `mode`, e.g.
///
/// ```yaml
/// message_policy:
///   mode: keyword_lookup
///   keyword: random
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum MessagePolicy {
    /// Parse the message as a delay and send a follow-up once it elapses
    #[default]
    DeferredReply,

    /// Reply with the message text behind a fixed prefix
    Echo {
        #[serde(default = "default_echo_prefix")]
        prefix: String,
    },

    /// Consult the external lookup when the message contains `keyword`
    KeywordLookup {
        keyword: String,

        /// Reply for messages without the keyword (default: "Try keyword <keyword>")
        #[serde(default)]
        prompt: Option<String>,

        /// Reply when the lookup fails
        #[serde(default = "default_apology")]
        apology: String,
    },
}

fn default_echo_prefix() -> String {
    "you said ".to_string()
}

fn default_apology() -> String {
    "An error occurred while looking that up".to_string()
}

// ============================================================================
// Dispatcher
// ============================================================================

/// Routes inbound platform events to replies.
pub struct Dispatcher {
    config: DispatcherConfig,
    scheduler: Arc<dyn TaskScheduler>,
    lookup: Option<Arc<dyn ExternalLookup>>,
}

impl Dispatcher {
    /// Create a dispatcher that schedules follow-ups through `scheduler`
    pub fn new(config: DispatcherConfig, scheduler: Arc<dyn TaskScheduler>) -> Self {
        Self {
            config,
            scheduler,
            lookup: None,
        }
    }

    /// Attach the external lookup used by [`MessagePolicy::KeywordLookup`]
    pub fn with_lookup(mut self, lookup: Arc<dyn ExternalLookup>) -> Self {
        self.lookup = Some(lookup);
        self
    }

    /// Active configuration
    pub fn config(&self) -> &DispatcherConfig {
        &self.config
    }

    /// Handle one inbound request.
    ///
    /// The method is checked before the body is looked at. `Ok(None)` means
    /// the event was accepted but warrants no reply.
    ///
    /// # Errors
    ///
    /// - [`DispatchError::MethodNotAllowed`] for anything but `POST`
    /// - [`DispatchError::BadRequest`] when the body cannot be decoded
    pub async fn handle(
        &self,
        method: &str,
        body: &[u8],
    ) -> Result<Option<ReplyEnvelope>, DispatchError> {
        if method != ACCEPTED_METHOD {
            return Err(DispatchError::MethodNotAllowed {
                method: method.to_string(),
            });
        }

        let envelope = EventEnvelope::decode(body)?;
        Ok(self.route(&envelope).await)
    }

    /// Produce the reply for a decoded envelope.
    pub async fn route(&self, envelope: &EventEnvelope) -> Option<ReplyEnvelope> {
        debug!(
            kind = %envelope.kind,
            conversation_id = %envelope.conversation_id,
            "Routing event"
        );

        match envelope.kind {
            EventKind::ParticipantAdded => self.greet(envelope),
            EventKind::MessageReceived => Some(self.answer_message(envelope).await),
            EventKind::Other(_) => {
                debug!(kind = %envelope.kind, "Ignoring unhandled event kind");
                None
            }
        }
    }

    fn greet(&self, envelope: &EventEnvelope) -> Option<ReplyEnvelope> {
        match envelope.conversation_kind {
            ConversationKind::Room => Some(ReplyEnvelope::text(&self.config.greeting)),
            ConversationKind::Direct | ConversationKind::Unknown => {
                self.config.direct_greeting.as_deref().map(ReplyEnvelope::text)
            }
        }
    }

    async fn answer_message(&self, envelope: &EventEnvelope) -> ReplyEnvelope {
        match &self.config.message_policy {
            MessagePolicy::DeferredReply => self.schedule_follow_up(envelope),
            MessagePolicy::Echo { prefix } => {
                ReplyEnvelope::text(format!("{}{}", prefix, envelope.text))
            }
            MessagePolicy::KeywordLookup {
                keyword,
                prompt,
                apology,
            } => {
                self.keyword_lookup(envelope, keyword, prompt.as_deref(), apology)
                    .await
            }
        }
    }

    fn schedule_follow_up(&self, envelope: &EventEnvelope) -> ReplyEnvelope {
        let delay = match parse_duration(&envelope.text) {
            Ok(delay) => delay,
            Err(e) => {
                debug!(
                    conversation_id = %envelope.conversation_id,
                    error = %e,
                    "Message is not a delay"
                );
                return ReplyEnvelope::text(format!(
                    "I only deal in durations like 10s, 5m or 1h30m: {}",
                    e
                ));
            }
        };

        self.scheduler.schedule(DeferredTask::new(
            delay,
            envelope.conversation_id.clone(),
            move || follow_up_reply(delay),
        ));

        info!(
            conversation_id = %envelope.conversation_id,
            delay = %format_duration(delay),
            "Scheduled deferred reply"
        );

        ReplyEnvelope::text(format!(
            "I will try and message you in {}",
            format_duration(delay)
        ))
    }

    async fn keyword_lookup(
        &self,
        envelope: &EventEnvelope,
        keyword: &str,
        prompt: Option<&str>,
        apology: &str,
    ) -> ReplyEnvelope {
        let query = envelope.command_text();
        if !query.to_lowercase().contains(&keyword.to_lowercase()) {
            return match prompt {
                Some(prompt) => ReplyEnvelope::text(prompt),
                None => ReplyEnvelope::text(format!("Try keyword {}", keyword)),
            };
        }

        let Some(lookup) = &self.lookup else {
            warn!(keyword = %keyword, "Keyword matched but no external lookup is configured");
            return ReplyEnvelope::text(apology);
        };

        match lookup.lookup(query.trim()).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!(
                    conversation_id = %envelope.conversation_id,
                    error = %e,
                    transient = e.is_transient(),
                    "External lookup failed"
                );
                ReplyEnvelope::text(apology)
            }
        }
    }
}

/// Reply delivered when a deferred task for `delay` fires.
pub fn follow_up_reply(delay: Duration) -> ReplyEnvelope {
    ReplyEnvelope::text(format!("message after {}", format_duration(delay)))
}

// ============================================================================
// Errors
// ============================================================================

/// Request-level failures, each mapped to an HTTP status by the API layer.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Maps to: `405 Method Not Allowed`
    #[error("Method {method} not allowed, use POST")]
    MethodNotAllowed { method: String },

    /// Maps to: `400 Bad Request`
    #[error("Malformed event: {0}")]
    BadRequest(#[from] DecodeError),
}

#[cfg(test)]
#[path = "dispatch_tests.rs"]
mod tests;
