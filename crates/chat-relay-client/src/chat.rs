//! Chat platform message client.
//!
//! Implements [`OutboundClient`] by creating a message in the target space:
//!
//! ```text
//! POST {api_url}/v1/{conversation_id}/messages
//! Authorization: Bearer <token>
//! Content-Type: application/json
//!
//! {"text": "message after 2s"}
//! ```

use crate::auth::TokenProvider;
use crate::error::ApiError;
use async_trait::async_trait;
use chat_relay_core::{ConversationId, OutboundClient, OutboundError, ReplyEnvelope};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Default chat platform API endpoint.
pub const DEFAULT_CHAT_API_URL: &str = "https://chat.googleapis.com";

/// Configuration for [`ChatClient`].
///
/// # Examples
///
/// ```
/// use chat_relay_client::ChatClientConfig;
/// use std::time::Duration;
///
/// let config = ChatClientConfig::default()
///     .with_api_url("http://localhost:9000")
///     .with_timeout(Duration::from_secs(5));
/// assert_eq!(config.timeout, Duration::from_secs(5));
/// ```
#[derive(Debug, Clone)]
pub struct ChatClientConfig {
    /// Base URL of the chat platform API
    pub api_url: String,
    /// User agent string for API requests
    pub user_agent: String,
    /// Request timeout duration
    pub timeout: Duration,
}

impl Default for ChatClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_CHAT_API_URL.to_string(),
            user_agent: concat!("chat-relay/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

impl ChatClientConfig {
    /// Set the API base URL.
    pub fn with_api_url(mut self, url: impl Into<String>) -> Self {
        self.api_url = url.into();
        self
    }

    /// Set the user agent string.
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client that posts messages into chat platform conversations.
///
/// Cheap to clone and safe to share between concurrently firing timers;
/// the underlying `reqwest::Client` pools connections.
#[derive(Clone)]
pub struct ChatClient {
    http_client: reqwest::Client,
    base_url: Url,
    tokens: Arc<dyn TokenProvider>,
}

impl ChatClient {
    /// Build a client from `config`, authenticating with `tokens`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the base URL is invalid or the
    /// HTTP client cannot be created.
    pub fn new(
        config: ChatClientConfig,
        tokens: Arc<dyn TokenProvider>,
    ) -> Result<Self, ApiError> {
        let base_url = Url::parse(&config.api_url).map_err(|e| ApiError::Configuration {
            message: format!("Invalid chat API URL '{}': {}", config.api_url, e),
        })?;

        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            base_url,
            tokens,
        })
    }

    /// Create a message in `conversation_id`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` if no token is available, the request fails, or
    /// the platform answers with a non-2xx status.
    pub async fn create_message(
        &self,
        conversation_id: &ConversationId,
        reply: &ReplyEnvelope,
    ) -> Result<(), ApiError> {
        let token = self.tokens.bearer_token().await?;
        let url = self.messages_url(conversation_id);

        debug!(conversation_id = %conversation_id, url = %url, "Creating chat message");

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(token)
            .json(reply)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unable to read error body".to_string());
            warn!(
                conversation_id = %conversation_id,
                status = status.as_u16(),
                "Chat platform rejected message"
            );
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message,
            });
        }

        Ok(())
    }

    fn messages_url(&self, conversation_id: &ConversationId) -> String {
        format!(
            "{}/v1/{}/messages",
            self.base_url.as_str().trim_end_matches('/'),
            conversation_id.as_str().trim_start_matches('/')
        )
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("base_url", &self.base_url.as_str())
            .field("tokens", &"<TokenProvider>")
            .finish()
    }
}

#[async_trait]
impl OutboundClient for ChatClient {
    async fn send(
        &self,
        conversation_id: &ConversationId,
        reply: &ReplyEnvelope,
    ) -> Result<(), OutboundError> {
        self.create_message(conversation_id, reply)
            .await
            .map_err(OutboundError::from)
    }
}

#[cfg(test)]
#[path = "chat_tests.rs"]
mod tests;
