//! Application state shared by the CLI and the HTTP handlers.

use std::path::Path;
use std::sync::Arc;

use parlor_core::agent::{AgentCatalog, OrchestratorSettings, TurnOrchestrator};
use parlor_core::llm::box_provider::BoxLlmProvider;
use parlor_core::memory::ConversationMemoryStore;
use parlor_infra::agents::build_catalog;
use parlor_infra::config::{load_config, resolve_api_key, resolve_config_path};
use parlor_infra::llm::build_provider;
use parlor_types::config::RuntimeConfig;

/// Cheap to clone; everything inside is shared.
#[derive(Clone)]
pub struct AppState {
    pub catalog: Arc<AgentCatalog>,
    pub orchestrator: TurnOrchestrator,
    pub config: Arc<RuntimeConfig>,
}

impl AppState {
    /// Load configuration, build the completion provider and the persona
    /// catalog.
    pub async fn init(config_path: Option<&Path>) -> anyhow::Result<Self> {
        let path = resolve_config_path(config_path);
        let config = load_config(path.as_deref()).await;

        let api_key = resolve_api_key(&config.provider);
        let provider = build_provider(&config.provider, api_key)?;
        let catalog = build_catalog(&config)?;

        Ok(Self::new(config, provider, catalog))
    }

    /// Wire state from already-built parts, with a fresh memory store.
    pub fn new(config: RuntimeConfig, provider: BoxLlmProvider, catalog: AgentCatalog) -> Self {
        let orchestrator = TurnOrchestrator::new(
            Arc::new(provider),
            Arc::new(ConversationMemoryStore::new()),
            OrchestratorSettings::from_config(&config),
        );
        Self {
            catalog: Arc::new(catalog),
            orchestrator,
            config: Arc::new(config),
        }
    }
}
