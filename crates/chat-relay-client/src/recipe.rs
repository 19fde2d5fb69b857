//! Random recipe lookup rendered as a chat card.
//!
//! The recipe API answers an unauthenticated `GET` with a full recipe: a
//! name, the combined recipe text and five components (base layer,
//! seasoning, condiment, mixin and shell), each with its own name, slug and
//! URL. [`render_recipe`] turns that into a reply whose text is the recipe
//! in a code block and whose card lists the components.

use crate::error::ApiError;
use async_trait::async_trait;
use chat_relay_core::{ExternalLookup, FetchError, ReplyEnvelope};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

/// Default endpoint returning one random full recipe.
pub const DEFAULT_RECIPE_URL: &str = "http://taco-randomizer.herokuapp.com/random/?full-taco=true";

/// Default site the "Go Now!" button links into.
pub const DEFAULT_LINK_BASE_URL: &str = "http://taco-randomizer.herokuapp.com/";

// ============================================================================
// Payload
// ============================================================================

/// Recipe as returned by the recipe API.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipePayload {
    pub name: String,
    pub recipe: String,
    pub base_layer: RecipeComponent,
    pub base_layer_url: String,
    pub seasoning: RecipeComponent,
    pub seasoning_url: String,
    pub condiment: RecipeComponent,
    pub condiment_url: String,
    pub mixin: RecipeComponent,
    pub mixin_url: String,
    pub shell: RecipeComponent,
    pub shell_url: String,
}

/// One component of a recipe.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecipeComponent {
    pub name: String,
    pub slug: String,
    pub url: String,
    pub recipe: String,
}

impl RecipePayload {
    fn has_all_component_urls(&self) -> bool {
        [
            &self.base_layer_url,
            &self.seasoning_url,
            &self.condiment_url,
            &self.mixin_url,
            &self.shell_url,
        ]
        .iter()
        .all(|url| !url.is_empty())
    }
}

// ============================================================================
// Rendering
// ============================================================================

/// Link to the recipe on the recipe site, built from the slugs of every
/// component that has a URL.
pub fn recipe_link(recipe: &RecipePayload, link_base_url: &str) -> String {
    let components = [
        (&recipe.base_layer_url, &recipe.base_layer),
        (&recipe.mixin_url, &recipe.mixin),
        (&recipe.condiment_url, &recipe.condiment),
        (&recipe.seasoning_url, &recipe.seasoning),
        (&recipe.shell_url, &recipe.shell),
    ];

    let slugs: String = components
        .iter()
        .filter(|(url, _)| !url.is_empty())
        .map(|(_, component)| format!("{}/", component.slug))
        .collect();

    format!("{}/{}", link_base_url.trim_end_matches('/'), slugs)
}

/// Render a recipe as a reply with one card.
///
/// The card carries a header (`title`, recipe name), one paragraph per
/// component and, when every component has a URL, a button linking to the
/// recipe page.
pub fn render_recipe(recipe: &RecipePayload, title: &str, link_base_url: &str) -> ReplyEnvelope {
    let paragraph = |text: &str| json!({ "textParagraph": { "text": text } });

    let mut widgets: Vec<Value> = vec![
        paragraph(&recipe.base_layer.name),
        paragraph(&recipe.seasoning.name),
        paragraph(&recipe.condiment.name),
        paragraph(&recipe.mixin.name),
        paragraph(&recipe.shell.name),
    ];

    if recipe.has_all_component_urls() {
        widgets.push(json!({
            "buttons": [{
                "textButton": {
                    "text": "Go Now!",
                    "onClick": { "openLink": { "url": recipe_link(recipe, link_base_url) } }
                }
            }]
        }));
    }

    let card = json!({
        "header": { "title": title, "subtitle": recipe.name },
        "sections": [{ "widgets": widgets }]
    });

    ReplyEnvelope::with_cards(format!("```{}```", recipe.recipe), vec![card])
}

// ============================================================================
// Client
// ============================================================================

/// Configuration for [`RecipeClient`].
#[derive(Debug, Clone)]
pub struct RecipeClientConfig {
    /// Endpoint returning a random recipe
    pub url: String,
    /// Site the card's button links into
    pub link_base_url: String,
    /// Card header title
    pub card_title: String,
    /// Request timeout duration
    pub timeout: Duration,
    /// User agent string for API requests
    pub user_agent: String,
}

impl Default for RecipeClientConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_RECIPE_URL.to_string(),
            link_base_url: DEFAULT_LINK_BASE_URL.to_string(),
            card_title: "Taco of the Day".to_string(),
            timeout: Duration::from_secs(10),
            user_agent: concat!("chat-relay/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

impl RecipeClientConfig {
    /// Set the recipe endpoint.
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Set the card header title.
    pub fn with_card_title(mut self, title: impl Into<String>) -> Self {
        self.card_title = title.into();
        self
    }

    /// Set the request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// [`ExternalLookup`] backed by the recipe API.
#[derive(Debug, Clone)]
pub struct RecipeClient {
    http_client: reqwest::Client,
    config: RecipeClientConfig,
}

impl RecipeClient {
    /// Build a client from `config`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Configuration` if the HTTP client cannot be created.
    pub fn new(config: RecipeClientConfig) -> Result<Self, ApiError> {
        let http_client = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| ApiError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            config,
        })
    }

    /// Fetch one random recipe.
    pub async fn fetch(&self) -> Result<RecipePayload, ApiError> {
        debug!(url = %self.config.url, "Fetching recipe");

        let response = self.http_client.get(&self.config.url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::HttpError {
                status: status.as_u16(),
                message: format!("Recipe API returned {}", status),
            });
        }

        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|e| ApiError::InvalidResponse {
            message: e.to_string(),
        })
    }
}

#[async_trait]
impl ExternalLookup for RecipeClient {
    async fn lookup(&self, _query: &str) -> Result<ReplyEnvelope, FetchError> {
        let recipe = self.fetch().await?;
        Ok(render_recipe(
            &recipe,
            &self.config.card_title,
            &self.config.link_base_url,
        ))
    }
}

#[cfg(test)]
#[path = "recipe_tests.rs"]
mod tests;
