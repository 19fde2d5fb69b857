//! Error types for the chat platform and recipe API clients.

use chat_relay_core::{FetchError, OutboundError};
use thiserror::Error;

/// Errors from remote API calls, classified for logging and retry decisions.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Non-2xx HTTP response.
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },

    /// The request did not complete within the configured timeout.
    #[error("Request timeout")]
    Timeout,

    /// Network or TLS failure before a response was received.
    #[error("Transport error: {message}")]
    Transport { message: String },

    /// The response body could not be decoded.
    #[error("Failed to decode response: {message}")]
    InvalidResponse { message: String },

    /// No usable credentials for the request.
    #[error("Authentication failed: {message}")]
    AuthenticationFailed { message: String },

    /// The client could not be built from its configuration.
    #[error("Invalid client configuration: {message}")]
    Configuration { message: String },
}

impl ApiError {
    /// Check if this error represents a transient condition that may succeed if retried.
    ///
    /// Transient conditions include:
    /// - Server errors (5xx)
    /// - Rate limiting (429)
    /// - Request timeouts
    /// - Network/transport errors
    pub fn is_transient(&self) -> bool {
        match self {
            Self::HttpError { status, .. } => *status >= 500 || *status == 429,
            Self::Timeout => true,
            Self::Transport { .. } => true,
            Self::InvalidResponse { .. } => false,
            Self::AuthenticationFailed { .. } => false,
            Self::Configuration { .. } => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_decode() {
            Self::InvalidResponse {
                message: e.to_string(),
            }
        } else {
            Self::Transport {
                message: e.to_string(),
            }
        }
    }
}

impl From<ApiError> for OutboundError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::HttpError { status, message } => Self::Rejected { status, message },
            ApiError::AuthenticationFailed { message } => Self::Unauthorized { message },
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

impl From<ApiError> for FetchError {
    fn from(e: ApiError) -> Self {
        match e {
            ApiError::HttpError { status, .. } => Self::Status { status },
            ApiError::InvalidResponse { message } => Self::InvalidPayload { message },
            other => Self::Transport {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
