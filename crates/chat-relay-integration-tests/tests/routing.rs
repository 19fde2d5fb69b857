//! Integration tests for request routing and event handling
//!
//! These tests drive full requests through the router and check the status
//! and body the chat platform would see.

mod common;

use axum::http::StatusCode;
use chat_relay_api::ServiceConfig;
use chat_relay_core::MessagePolicy;
use common::{
    added_event, create_test_app_state, message_event, post_event, send_request,
    RecordingOutbound,
};

fn default_state() -> chat_relay_api::AppState {
    create_test_app_state(ServiceConfig::default(), RecordingOutbound::new(), None)
}

// ============================================================================
// Endpoints
// ============================================================================

#[tokio::test]
async fn test_router_has_service_endpoints() {
    let state = default_state();

    for path in ["/health", "/ready", "/metrics"] {
        let (status, _) = send_request(&state, "GET", path, "").await;
        assert_eq!(status, StatusCode::OK, "{} should be served", path);
    }
}

#[tokio::test]
async fn test_unknown_path_is_not_found() {
    let state = default_state();

    let (status, _) = send_request(
        &state,
        "POST",
        "/elsewhere",
        message_event("spaces/X", "2s"),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Verify every non-POST method on the endpoint is rejected with a JSON error.
#[tokio::test]
async fn test_non_post_methods_are_rejected() {
    let state = default_state();

    for method in ["GET", "PUT", "DELETE", "PATCH"] {
        let (status, body) = send_request(&state, method, "/", "").await;
        assert_eq!(status, StatusCode::METHOD_NOT_ALLOWED, "{}", method);

        let body: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(body["status"], 405);
    }
    assert_eq!(state.notifier.pending_tasks(), 0);
}

#[tokio::test]
async fn test_malformed_bodies_are_bad_requests() {
    let state = default_state();

    for body in [
        "",
        "not json",
        "[1, 2, 3]",
        r#"{"space":{"name":"spaces/X"}}"#,
        r#"{"type":"MESSAGE"}"#,
    ] {
        let (status, _) = send_request(&state, "POST", "/", body).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "body: {}", body);
    }
}

/// Verify an unparseable timestamp does not stop the event being answered.
#[tokio::test]
async fn test_unparseable_event_time_is_tolerated() {
    let outbound = RecordingOutbound::new();
    let state = create_test_app_state(ServiceConfig::default(), outbound, None);

    let body = serde_json::json!({
        "type": "MESSAGE",
        "eventTime": "yesterday",
        "message": { "text": "5m" },
        "space": { "name": "spaces/X", "type": "ROOM" }
    })
    .to_string();
    let (status, reply) = post_event(&state, body).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["text"], "I will try and message you in 5m0s");
    assert_eq!(state.notifier.pending_tasks(), 1);
}

// ============================================================================
// Event handling
// ============================================================================

#[tokio::test]
async fn test_bot_added_to_room_greets() {
    let state = default_state();

    let (status, reply) = post_event(&state, added_event("spaces/R", "ROOM")).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply, serde_json::json!({ "text": "thanks for adding me." }));
}

#[tokio::test]
async fn test_bot_added_to_direct_message_is_silent_by_default() {
    let state = default_state();

    let (status, reply) = post_event(&state, added_event("spaces/D", "DM")).await;

    assert_eq!(status, StatusCode::OK);
    assert!(reply.is_null());
}

#[tokio::test]
async fn test_configured_direct_greeting() {
    let mut config = ServiceConfig::default();
    config.bot.direct_greeting = Some("hi there".to_string());
    let state = create_test_app_state(config, RecordingOutbound::new(), None);

    let (_, reply) = post_event(&state, added_event("spaces/D", "DM")).await;

    assert_eq!(reply, serde_json::json!({ "text": "hi there" }));
}

#[tokio::test]
async fn test_other_events_produce_no_reply() {
    let state = default_state();

    let body = serde_json::json!({
        "type": "REMOVED_FROM_SPACE",
        "space": { "name": "spaces/R", "type": "ROOM" }
    })
    .to_string();
    let (status, reply) = post_event(&state, body).await;

    assert_eq!(status, StatusCode::OK);
    assert!(reply.is_null());
}

#[tokio::test]
async fn test_echo_policy_repeats_message() {
    let mut config = ServiceConfig::default();
    config.bot.message_policy = MessagePolicy::Echo {
        prefix: "you said ".to_string(),
    };
    let state = create_test_app_state(config, RecordingOutbound::new(), None);

    let (_, reply) = post_event(&state, message_event("spaces/X", "hello")).await;

    assert_eq!(reply, serde_json::json!({ "text": "you said hello" }));
    assert_eq!(state.notifier.pending_tasks(), 0);
}

/// Verify the request counter separates outcomes.
#[tokio::test]
async fn test_metrics_count_outcomes() {
    let state = default_state();

    post_event(&state, message_event("spaces/X", "5m")).await;
    post_event(&state, added_event("spaces/D", "DM")).await;
    send_request(&state, "POST", "/", "nope").await;

    let counter = &state.metrics.webhook_requests_total;
    assert_eq!(counter.with_label_values(&["reply"]).get(), 1);
    assert_eq!(counter.with_label_values(&["no_reply"]).get(), 1);
    assert_eq!(counter.with_label_values(&["bad_request"]).get(), 1);
    assert_eq!(state.metrics.deferred_tasks_scheduled_total.get(), 1);
}
