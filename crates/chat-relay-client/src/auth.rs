//! Credentials for the chat platform API.
//!
//! Acquiring credentials (service-account key exchange, token refresh) is
//! left to whatever implements [`TokenProvider`]. The bundled
//! [`StaticTokenProvider`] serves a bearer token supplied by configuration.

use crate::error::ApiError;
use async_trait::async_trait;
use std::fmt;

/// Supplies the bearer token attached to outbound chat API requests.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    /// Current bearer token
    async fn bearer_token(&self) -> Result<String, ApiError>;
}

/// Token provider returning a fixed token.
#[derive(Clone)]
pub struct StaticTokenProvider {
    token: String,
}

impl StaticTokenProvider {
    /// Create a provider for `token`
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
        }
    }
}

impl fmt::Debug for StaticTokenProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticTokenProvider")
            .field("token", &"<REDACTED>")
            .finish()
    }
}

#[async_trait]
impl TokenProvider for StaticTokenProvider {
    async fn bearer_token(&self) -> Result<String, ApiError> {
        if self.token.is_empty() {
            return Err(ApiError::AuthenticationFailed {
                message: "no chat API token configured".to_string(),
            });
        }
        Ok(self.token.clone())
    }
}
