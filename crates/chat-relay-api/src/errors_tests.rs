//! Tests for error-to-response mapping.

use super::*;

async fn json_body(response: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

/// Verify a disallowed method maps to 405 with an Allow header and JSON body.
#[tokio::test]
async fn test_method_not_allowed_response() {
    let err = WebhookHandlerError::MethodNotAllowed {
        method: "GET".to_string(),
    };

    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    assert_eq!(response.headers().get(header::ALLOW).unwrap(), "POST");

    let body = json_body(response).await;
    assert_eq!(body["status"], 405);
    assert_eq!(body["error"], "Method GET not allowed, use POST");
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn test_invalid_payload_response() {
    let err = WebhookHandlerError::InvalidPayload(DecodeError::MissingField {
        field: "space.name".to_string(),
    });

    let response = err.into_response();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert!(response.headers().get(header::ALLOW).is_none());

    let body = json_body(response).await;
    assert_eq!(body["status"], 400);
    assert!(body["error"].as_str().unwrap().contains("space.name"));
}

#[test]
fn test_dispatch_errors_convert_by_kind() {
    let err: WebhookHandlerError = DispatchError::MethodNotAllowed {
        method: "PUT".to_string(),
    }
    .into();
    assert_eq!(err.outcome(), "method_not_allowed");

    let err: WebhookHandlerError = DispatchError::BadRequest(DecodeError::NotAnObject).into();
    assert_eq!(err.outcome(), "bad_request");
}

#[test]
fn test_service_error_exit_codes() {
    let bind = ServiceError::BindFailed {
        address: "0.0.0.0:80".to_string(),
        message: "permission denied".to_string(),
    };
    let server = ServiceError::ServerFailed {
        message: "io".to_string(),
    };
    let config = ServiceError::Configuration(ConfigError::Missing {
        key: "chat_api.token".to_string(),
    });

    assert_eq!(bind.exit_code(), 1);
    assert_eq!(server.exit_code(), 2);
    assert_eq!(config.exit_code(), 3);
}
