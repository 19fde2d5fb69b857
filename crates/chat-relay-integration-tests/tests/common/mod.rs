//! Common test utilities for chat-relay integration tests
//!
//! This module provides:
//! - Test doubles for the outbound chat client
//! - Builders for application state and event payloads
//! - A helper driving one request through the router

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{Request, StatusCode};
use chat_relay_api::{AppState, ServiceConfig, ServiceMetrics};
use chat_relay_core::{
    ConversationId, ExternalLookup, OutboundClient, OutboundError, ReplyEnvelope,
};
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tower::ServiceExt;

// ============================================================================
// Outbound test doubles
// ============================================================================

/// One delivery seen by [`RecordingOutbound`]
#[derive(Debug, Clone)]
#[allow(dead_code)]
pub struct Delivery {
    pub conversation_id: String,
    pub reply: ReplyEnvelope,
    pub at: Instant,
}

/// Outbound client recording every delivery, optionally failing some.
#[derive(Default)]
#[allow(dead_code)]
pub struct RecordingOutbound {
    deliveries: Mutex<Vec<Delivery>>,
    fail_conversations: Mutex<Vec<String>>,
}

impl RecordingOutbound {
    #[allow(dead_code)]
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Reject every delivery into `conversation_id` with a 403.
    #[allow(dead_code)]
    pub fn fail_for(&self, conversation_id: &str) {
        self.fail_conversations
            .lock()
            .unwrap()
            .push(conversation_id.to_string());
    }

    #[allow(dead_code)]
    pub fn deliveries(&self) -> Vec<Delivery> {
        self.deliveries.lock().unwrap().clone()
    }

    #[allow(dead_code)]
    pub fn delivered_texts(&self) -> Vec<(String, String)> {
        self.deliveries()
            .into_iter()
            .map(|d| (d.conversation_id, d.reply.text))
            .collect()
    }
}

#[async_trait]
impl OutboundClient for RecordingOutbound {
    async fn send(
        &self,
        conversation_id: &ConversationId,
        reply: &ReplyEnvelope,
    ) -> Result<(), OutboundError> {
        let failing = self
            .fail_conversations
            .lock()
            .unwrap()
            .iter()
            .any(|c| c == conversation_id.as_str());

        if failing {
            return Err(OutboundError::Rejected {
                status: 403,
                message: "caller lacks permission".to_string(),
            });
        }

        self.deliveries.lock().unwrap().push(Delivery {
            conversation_id: conversation_id.to_string(),
            reply: reply.clone(),
            at: Instant::now(),
        });
        Ok(())
    }
}

// ============================================================================
// State and request helpers
// ============================================================================

/// Build application state around the given clients.
#[allow(dead_code)]
pub fn create_test_app_state(
    config: ServiceConfig,
    outbound: Arc<dyn OutboundClient>,
    lookup: Option<Arc<dyn ExternalLookup>>,
) -> AppState {
    AppState::with_clients(
        config,
        outbound,
        lookup,
        ServiceMetrics::new().expect("metrics must initialize"),
    )
}

/// JSON for a `MESSAGE` event with `text` posted in `space`.
#[allow(dead_code)]
pub fn message_event(space: &str, text: &str) -> String {
    serde_json::json!({
        "type": "MESSAGE",
        "eventTime": "2017-03-02T19:02:59.910959Z",
        "message": {
            "name": format!("{}/messages/1", space),
            "sender": { "name": "users/12345678901234567890", "displayName": "Chris Bacon" },
            "text": text,
            "argumentText": text,
        },
        "space": { "name": space, "type": "ROOM" },
        "user": { "name": "users/12345678901234567890", "displayName": "Chris Bacon" }
    })
    .to_string()
}

/// JSON for an `ADDED_TO_SPACE` event.
#[allow(dead_code)]
pub fn added_event(space: &str, space_type: &str) -> String {
    serde_json::json!({
        "type": "ADDED_TO_SPACE",
        "space": { "name": space, "type": space_type },
        "user": { "name": "users/1", "displayName": "Chris Bacon" }
    })
    .to_string()
}

/// Send one request through a fresh router and return status and body.
#[allow(dead_code)]
pub async fn send_request(
    state: &AppState,
    method: &str,
    path: &str,
    body: impl Into<Body>,
) -> (StatusCode, Vec<u8>) {
    let app = chat_relay_api::create_router(state.clone());
    let request = Request::builder()
        .method(method)
        .uri(path)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

/// POST `body` to the default endpoint and decode the JSON reply.
#[allow(dead_code)]
pub async fn post_event(state: &AppState, body: String) -> (StatusCode, serde_json::Value) {
    let (status, bytes) = send_request(state, "POST", "/", body).await;
    let value = if bytes.is_empty() {
        serde_json::Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}
