//! Error types for the HTTP service

use crate::config::ConfigError;
use axum::{
    extract::rejection::BytesRejection,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Json, Response},
};
use chat_relay_core::{DecodeError, DispatchError};
use tracing::warn;

/// Webhook handler errors with HTTP status code mapping
///
/// - `405 Method Not Allowed`: the request used anything but `POST`
/// - `400 Bad Request`: the body is not a decodable platform event
/// - `413 Payload Too Large` and friends: the body could not be buffered
///
/// All are permanent; the platform should not redeliver the request.
#[derive(Debug, thiserror::Error)]
pub enum WebhookHandlerError {
    /// Maps to: `405 Method Not Allowed`, with an `Allow: POST` header
    #[error("Method {method} not allowed, use POST")]
    MethodNotAllowed { method: String },

    /// Maps to: `400 Bad Request`
    #[error("Malformed event: {0}")]
    InvalidPayload(#[from] DecodeError),

    /// Maps to the rejection's own status, usually `413 Payload Too Large`
    #[error("Unreadable request body: {0}")]
    UnreadableBody(#[from] BytesRejection),
}

impl From<DispatchError> for WebhookHandlerError {
    fn from(err: DispatchError) -> Self {
        match err {
            DispatchError::MethodNotAllowed { method } => Self::MethodNotAllowed { method },
            DispatchError::BadRequest(e) => Self::InvalidPayload(e),
        }
    }
}

impl WebhookHandlerError {
    /// Label used for the `outcome` dimension of the request counter
    pub fn outcome(&self) -> &'static str {
        match self {
            Self::MethodNotAllowed { .. } => "method_not_allowed",
            Self::InvalidPayload(_) => "bad_request",
            Self::UnreadableBody(_) => "unreadable_body",
        }
    }
}

impl IntoResponse for WebhookHandlerError {
    fn into_response(self) -> Response {
        let status = match &self {
            Self::MethodNotAllowed { method } => {
                warn!(method = %method, "Rejected webhook request method");
                StatusCode::METHOD_NOT_ALLOWED
            }
            Self::InvalidPayload(e) => {
                warn!(error = %e, "Rejected malformed webhook payload");
                StatusCode::BAD_REQUEST
            }
            Self::UnreadableBody(e) => {
                warn!(error = %e, "Rejected unreadable webhook body");
                e.status()
            }
        };

        let body = serde_json::json!({
            "error": self.to_string(),
            "status": status.as_u16(),
            "timestamp": chrono::Utc::now().to_rfc3339(),
        });

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::METHOD_NOT_ALLOWED {
            response
                .headers_mut()
                .insert(header::ALLOW, HeaderValue::from_static("POST"));
        }

        response
    }
}

/// Service-level errors
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("Failed to bind to address {address}: {message}")]
    BindFailed { address: String, message: String },

    #[error("Server failed: {message}")]
    ServerFailed { message: String },

    #[error("Configuration error: {0}")]
    Configuration(#[from] ConfigError),
}

impl ServiceError {
    /// Process exit code reported by the service binary
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::BindFailed { .. } => 1,
            Self::ServerFailed { .. } => 2,
            Self::Configuration(_) => 3,
        }
    }
}

#[cfg(test)]
#[path = "errors_tests.rs"]
mod tests;
