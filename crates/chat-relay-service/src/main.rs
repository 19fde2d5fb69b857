//! # Chat Relay Service
//!
//! Binary entry point for the Chat Relay webhook bot.
//!
//! This executable:
//! - Loads configuration from files and environment
//! - Initializes logging
//! - Builds the chat platform and lookup clients
//! - Starts the HTTP server from chat-relay-api

use anyhow::Context;
use chat_relay_api::{start_server, LoggingConfig, ServiceConfig};
use chat_relay_client::{
    ChatClient, ChatClientConfig, RecipeClient, RecipeClientConfig, StaticTokenProvider,
};
use chat_relay_core::{ExternalLookup, OutboundClient};
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Environment variable holding the chat API token when the config has none
const TOKEN_ENV_VAR: &str = "CHAT_RELAY_API_TOKEN";

/// Environment variable naming an extra configuration file
const CONFIG_FILE_ENV_VAR: &str = "CHAT_RELAY_CONFIG_FILE";

#[tokio::main]
async fn main() {
    // Logging settings live in the configuration, so load it before the
    // subscriber exists and report failures once logging is up.
    let loaded = load_config();
    let logging = loaded
        .as_ref()
        .map(|c| c.logging.clone())
        .unwrap_or_default();
    init_tracing(&logging);

    let service_config = match loaded {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration; aborting");
            std::process::exit(3);
        }
    };

    info!("Starting Chat Relay Service");

    if let Err(e) = service_config.validate() {
        error!(error = %e, "Service configuration is invalid; aborting");
        std::process::exit(3);
    }

    let (outbound, lookup) =
        match build_clients(&service_config, std::env::var(TOKEN_ENV_VAR).ok()) {
            Ok(clients) => clients,
            Err(e) => {
                error!(error = ?e, "Failed to build API clients; aborting");
                std::process::exit(3);
            }
        };

    info!(
        host = %service_config.server.host,
        port = service_config.server.port,
        endpoint = %service_config.webhooks.endpoint_path,
        "Starting HTTP server"
    );

    if let Err(e) = start_server(service_config, outbound, lookup).await {
        error!(error = %e, "Server terminated with an error");
        std::process::exit(e.exit_code());
    }
}

// ============================================================================
// Private helpers
// ============================================================================

/// Install the global subscriber.
///
/// `RUST_LOG` wins over `logging.level`.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json_format {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Load the service configuration.
///
/// Sources, later ones overriding earlier ones:
///  1. `/etc/chat-relay/service.yaml`
///  2. `./config/service.yaml`
///  3. the file named by `CHAT_RELAY_CONFIG_FILE`, which must exist when set
///  4. `CHAT_RELAY__*` environment variables, e.g. `CHAT_RELAY__SERVER__PORT=9090`
///
/// Every field has a default, so no files and no variables still yields a
/// complete configuration.
fn load_config() -> Result<ServiceConfig, config::ConfigError> {
    let mut builder = config::Config::builder()
        .add_source(
            config::File::with_name("/etc/chat-relay/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        )
        .add_source(
            config::File::with_name("config/service")
                .required(false)
                .format(config::FileFormat::Yaml),
        );

    if let Ok(explicit_path) = std::env::var(CONFIG_FILE_ENV_VAR) {
        if !explicit_path.is_empty() {
            builder = builder.add_source(
                config::File::with_name(&explicit_path)
                    .required(true)
                    .format(config::FileFormat::Yaml),
            );
        }
    }

    builder
        .add_source(
            config::Environment::with_prefix("CHAT_RELAY")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()
}

/// Build the outbound chat client and, for the keyword policy, the lookup.
///
/// A missing token is fatal only when the policy sends deferred replies;
/// otherwise the chat client is never called.
fn build_clients(
    config: &ServiceConfig,
    env_token: Option<String>,
) -> anyhow::Result<(Arc<dyn OutboundClient>, Option<Arc<dyn ExternalLookup>>)> {
    let token = match config.chat_api_token(env_token) {
        Ok(token) => token,
        Err(e) if config.uses_deferred_replies() => {
            return Err(e).context(format!("set chat_api.token or {}", TOKEN_ENV_VAR));
        }
        Err(_) => {
            warn!("No chat API token configured; deferred replies are disabled");
            String::new()
        }
    };

    let chat_config = ChatClientConfig::default()
        .with_api_url(&config.chat_api.url)
        .with_timeout(Duration::from_secs(config.chat_api.timeout_seconds));
    let chat_client = ChatClient::new(chat_config, Arc::new(StaticTokenProvider::new(token)))
        .context("building chat API client")?;

    let lookup: Option<Arc<dyn ExternalLookup>> = if config.uses_lookup() {
        let recipe_config = RecipeClientConfig {
            url: config.lookup.url.clone(),
            link_base_url: config.lookup.link_base_url.clone(),
            card_title: config.lookup.card_title.clone(),
            timeout: Duration::from_secs(config.lookup.timeout_seconds),
            ..RecipeClientConfig::default()
        };
        let recipe_client = RecipeClient::new(recipe_config).context("building lookup client")?;
        info!(url = %config.lookup.url, "External lookup enabled");
        let lookup: Arc<dyn ExternalLookup> = Arc::new(recipe_client);
        Some(lookup)
    } else {
        None
    };

    let outbound: Arc<dyn OutboundClient> = Arc::new(chat_client);
    Ok((outbound, lookup))
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
