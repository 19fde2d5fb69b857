//! Tests for ChatClient.

use super::*;
use crate::auth::StaticTokenProvider;
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer, token: &str) -> ChatClient {
    let config = ChatClientConfig::default()
        .with_api_url(server.uri())
        .with_timeout(Duration::from_secs(2));
    ChatClient::new(config, Arc::new(StaticTokenProvider::new(token))).unwrap()
}

fn conversation(name: &str) -> ConversationId {
    ConversationId::new(name).unwrap()
}

/// Verify a reply is posted to the space's messages collection with the
/// bearer token and the reply as JSON body.
#[tokio::test]
async fn test_send_posts_message_to_space() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/spaces/X/messages"))
        .and(header("authorization", "Bearer test-token"))
        .and(body_json(json!({ "text": "message after 2s" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "name": "spaces/X/messages/1" })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "test-token");

    let result = client
        .send(&conversation("spaces/X"), &ReplyEnvelope::text("message after 2s"))
        .await;

    assert!(result.is_ok(), "unexpected error: {:?}", result);
}

#[tokio::test]
async fn test_cards_are_forwarded() {
    let server = MockServer::start().await;
    let card = json!({ "header": { "title": "Recipe" } });
    Mock::given(method("POST"))
        .and(path("/v1/spaces/C/messages"))
        .and(body_json(json!({ "text": "t", "cards": [card.clone()] })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "token");

    client
        .send(
            &conversation("spaces/C"),
            &ReplyEnvelope::with_cards("t", vec![card]),
        )
        .await
        .unwrap();
}

/// Verify a non-2xx answer becomes a rejection carrying status and body.
#[tokio::test]
async fn test_rejection_maps_to_outbound_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(403).set_body_string("caller lacks permission"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server, "token");

    let err = client
        .send(&conversation("spaces/X"), &ReplyEnvelope::text("hi"))
        .await
        .unwrap_err();

    match err {
        OutboundError::Rejected { status, message } => {
            assert_eq!(status, 403);
            assert_eq!(message, "caller lacks permission");
        }
        other => panic!("expected Rejected, got {:?}", other),
    }
}

#[tokio::test]
async fn test_server_error_is_transient() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let client = client_for(&server, "token");

    let err = client
        .create_message(&conversation("spaces/X"), &ReplyEnvelope::text("hi"))
        .await
        .unwrap_err();

    assert!(err.is_transient());
}

/// Verify no request is made without a token.
#[tokio::test]
async fn test_missing_token_is_unauthorized() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let client = client_for(&server, "");

    let err = client
        .send(&conversation("spaces/X"), &ReplyEnvelope::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, OutboundError::Unauthorized { .. }));
}

#[tokio::test]
async fn test_timeout_is_reported_as_transport_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
        .mount(&server)
        .await;

    let config = ChatClientConfig::default()
        .with_api_url(server.uri())
        .with_timeout(Duration::from_millis(100));
    let client = ChatClient::new(config, Arc::new(StaticTokenProvider::new("token"))).unwrap();

    let err = client
        .create_message(&conversation("spaces/X"), &ReplyEnvelope::text("hi"))
        .await
        .unwrap_err();

    assert!(matches!(err, ApiError::Timeout), "got {:?}", err);
}

#[test]
fn test_invalid_base_url_is_rejected() {
    let config = ChatClientConfig::default().with_api_url("not a url");
    let result = ChatClient::new(config, Arc::new(StaticTokenProvider::new("token")));
    assert!(matches!(result, Err(ApiError::Configuration { .. })));
}

#[test]
fn test_messages_url_handles_trailing_slash() {
    let config = ChatClientConfig::default().with_api_url("https://chat.example.com/");
    let client = ChatClient::new(config, Arc::new(StaticTokenProvider::new("token"))).unwrap();

    assert_eq!(
        client.messages_url(&conversation("spaces/AAA")),
        "https://chat.example.com/v1/spaces/AAA/messages"
    );
}

#[test]
fn test_debug_does_not_leak_token() {
    let provider = StaticTokenProvider::new("very-secret-token");
    let debug = format!("{:?}", provider);
    assert!(!debug.contains("very-secret-token"));
    assert!(debug.contains("REDACTED"));
}
