//! # Chat Relay Client
//!
//! HTTP clients for the remote services the Chat Relay bot talks to.
//!
//! This crate provides:
//! - [`ChatClient`], the [`chat_relay_core::OutboundClient`] that posts
//!   follow-up messages into chat platform conversations
//! - [`RecipeClient`], an [`chat_relay_core::ExternalLookup`] that fetches a
//!   random recipe and renders it as a card
//! - [`ApiError`], shared by both and mapped onto the core error types
//!
//! # Examples
//!
//! ```rust,no_run
//! use chat_relay_client::{ChatClient, ChatClientConfig, StaticTokenProvider};
//! use chat_relay_core::{ConversationId, OutboundClient, ReplyEnvelope};
//! use std::sync::Arc;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ChatClient::new(
//!     ChatClientConfig::default(),
//!     Arc::new(StaticTokenProvider::new("token")),
//! )?;
//!
//! let space = ConversationId::new("spaces/AAAA")?;
//! client.send(&space, &ReplyEnvelope::text("hello")).await?;
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod chat;
pub mod error;
pub mod recipe;

pub use auth::{StaticTokenProvider, TokenProvider};
pub use chat::{ChatClient, ChatClientConfig, DEFAULT_CHAT_API_URL};
pub use error::ApiError;
pub use recipe::{
    recipe_link, render_recipe, RecipeClient, RecipeClientConfig, RecipeComponent, RecipePayload,
    DEFAULT_LINK_BASE_URL, DEFAULT_RECIPE_URL,
};
