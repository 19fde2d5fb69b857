//! Configuration types for the HTTP service

use chat_relay_core::{DispatcherConfig, MessagePolicy};
use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Paths served by the service itself, which the webhook endpoint may not shadow.
const RESERVED_PATHS: [&str; 3] = ["/health", "/ready", "/metrics"];

/// Service configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings
    pub server: ServerConfig,

    /// Webhook endpoint settings
    pub webhooks: WebhookConfig,

    /// Reply behaviour
    pub bot: DispatcherConfig,

    /// Chat platform API used for deferred replies
    pub chat_api: ChatApiConfig,

    /// External lookup used by the keyword policy
    pub lookup: LookupConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl ServiceConfig {
    /// Check the configuration for values the service cannot run with.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` describing the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(invalid("server.port must be non-zero"));
        }

        if self.server.max_body_size == 0 {
            return Err(invalid("server.max_body_size must be non-zero"));
        }

        let endpoint = &self.webhooks.endpoint_path;
        if !endpoint.starts_with('/') {
            return Err(invalid(format!(
                "webhooks.endpoint_path must start with '/', got '{}'",
                endpoint
            )));
        }
        if RESERVED_PATHS.contains(&endpoint.as_str()) {
            return Err(invalid(format!(
                "webhooks.endpoint_path '{}' collides with a built-in route",
                endpoint
            )));
        }

        if let Err(e) = Url::parse(&self.chat_api.url) {
            return Err(invalid(format!(
                "chat_api.url '{}' is not a valid URL: {}",
                self.chat_api.url, e
            )));
        }
        if self.chat_api.timeout_seconds == 0 {
            return Err(invalid("chat_api.timeout_seconds must be non-zero"));
        }

        if let MessagePolicy::KeywordLookup { keyword, .. } = &self.bot.message_policy {
            if keyword.trim().is_empty() {
                return Err(invalid("bot.message_policy.keyword must not be empty"));
            }
            if let Err(e) = Url::parse(&self.lookup.url) {
                return Err(invalid(format!(
                    "lookup.url '{}' is not a valid URL: {}",
                    self.lookup.url, e
                )));
            }
            if self.lookup.timeout_seconds == 0 {
                return Err(invalid("lookup.timeout_seconds must be non-zero"));
            }
        }

        Ok(())
    }

    /// Resolve the chat API token, preferring the configured value over
    /// `env_token`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Missing` when neither source holds a non-empty token.
    pub fn chat_api_token(&self, env_token: Option<String>) -> Result<String, ConfigError> {
        self.chat_api
            .token
            .clone()
            .filter(|t| !t.is_empty())
            .or_else(|| env_token.filter(|t| !t.is_empty()))
            .ok_or_else(|| ConfigError::Missing {
                key: "chat_api.token".to_string(),
            })
    }

    /// Whether the configured reply policy sends deferred messages.
    pub fn uses_deferred_replies(&self) -> bool {
        matches!(self.bot.message_policy, MessagePolicy::DeferredReply)
    }

    /// Whether the configured reply policy consults the external lookup.
    pub fn uses_lookup(&self) -> bool {
        matches!(
            self.bot.message_policy,
            MessagePolicy::KeywordLookup { .. }
        )
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid {
        message: message.into(),
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout_seconds: u64,

    /// Maximum request size in bytes
    pub max_body_size: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            shutdown_timeout_seconds: 30,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

/// Webhook endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WebhookConfig {
    /// Path the chat platform posts events to
    pub endpoint_path: String,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            endpoint_path: "/".to_string(),
        }
    }
}

/// Chat platform API configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatApiConfig {
    /// Base URL of the chat platform API
    pub url: String,

    /// Bearer token; falls back to the `CHAT_RELAY_API_TOKEN` environment variable
    pub token: Option<String>,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for ChatApiConfig {
    fn default() -> Self {
        Self {
            url: "https://chat.googleapis.com".to_string(),
            token: None,
            timeout_seconds: 30,
        }
    }
}

impl fmt::Debug for ChatApiConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatApiConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<REDACTED>"))
            .field("timeout_seconds", &self.timeout_seconds)
            .finish()
    }
}

/// External lookup configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Endpoint returning a random recipe
    pub url: String,

    /// Site the recipe card links into
    pub link_base_url: String,

    /// Recipe card title
    pub card_title: String,

    /// Request timeout in seconds
    pub timeout_seconds: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            url: "http://taco-randomizer.herokuapp.com/random/?full-taco=true".to_string(),
            link_base_url: "http://taco-randomizer.herokuapp.com/".to_string(),
            card_title: "Taco of the Day".to_string(),
            timeout_seconds: 10,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is not set
    pub level: String,

    /// Enable JSON structured logging
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "chat_relay_service=info,chat_relay_api=info,chat_relay_core=info,tower_http=debug"
                .to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration: {message}")]
    Invalid { message: String },

    #[error("Missing required configuration: {key}")]
    Missing { key: String },
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
