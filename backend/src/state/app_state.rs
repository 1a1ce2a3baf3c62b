//! Application state
//!
//! Shared, read-only state handed to every request handler: configuration,
//! the tenant resolver and the run orchestrator.

use crate::assistant::{AssistantApi, OpenAiClient};
use crate::config::Config;
use crate::orchestrator::{PollPolicy, RunOrchestrator};
use crate::registry::{FileSource, RegistryResolver, TenantResolver};
use std::sync::Arc;
use std::time::Duration;
use tracing::warn;

/// State shared by all handlers
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Tenant lookups
    pub resolver: Arc<dyn TenantResolver>,
    /// `None` when no upstream API key is configured
    pub orchestrator: Option<RunOrchestrator>,
}

impl AppState {
    /// Assemble state from explicit parts (used by tests to inject fakes)
    pub fn new(
        config: Config,
        resolver: Arc<dyn TenantResolver>,
        api: Option<Arc<dyn AssistantApi>>,
    ) -> Self {
        let policy = PollPolicy::from(&config.polling);
        Self {
            orchestrator: api.map(|api| RunOrchestrator::new(api, policy)),
            config: Arc::new(config),
            resolver,
        }
    }

    /// Build production state: file-backed registry and HTTPS client
    ///
    /// # Errors
    /// Returns an error if the HTTP client cannot be built.
    pub fn from_config(config: Config) -> anyhow::Result<Self> {
        let resolver: Arc<dyn TenantResolver> =
            Arc::new(RegistryResolver::new(FileSource::new(&config.registry.path)));

        let api: Option<Arc<dyn AssistantApi>> = match &config.upstream.api_key {
            Some(api_key) => {
                // Shared client so connections are pooled across requests.
                let client = reqwest::Client::builder()
                    .timeout(Duration::from_secs(config.upstream.request_timeout_secs))
                    .build()?;
                Some(Arc::new(OpenAiClient::new(
                    client,
                    api_key.clone(),
                    &config.upstream.base_url,
                )))
            }
            None => {
                warn!("OPENAI_API_KEY is not set, chat requests will fail");
                None
            }
        };

        Ok(Self::new(config, resolver, api))
    }

    /// The orchestrator, or a configuration error when credentials are missing
    pub fn orchestrator(&self) -> Result<&RunOrchestrator, crate::error::AppError> {
        self.orchestrator.as_ref().ok_or_else(|| {
            crate::error::AppError::Configuration("Missing OPENAI_API_KEY".to_string())
        })
    }
}
