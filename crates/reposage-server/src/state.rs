//! Shared application state.

use std::sync::Arc;

use reposage_chat::{AnswerGenerator, LLMStatus};
use reposage_core::{RepoSageConfig, Result};
use reposage_infer::EmbedderBackend;
use reposage_runtime::Orchestrator;
use reposage_store::VectorIndex;

use crate::registry::RepoRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: RepoSageConfig,
    pub orchestrator: Orchestrator,
    pub registry: RepoRegistry,
    /// Provider status captured at startup; keys are never exposed.
    pub llm_status: LLMStatus,
}

impl AppState {
    pub fn new(
        config: RepoSageConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbedderBackend>,
        generator: Arc<dyn AnswerGenerator>,
        llm_status: LLMStatus,
    ) -> Result<Self> {
        let orchestrator = Orchestrator::new(&config, index, embedder, generator)?;
        let registry = RepoRegistry::load(&config.data_paths.repositories_file);

        Ok(Self {
            config,
            orchestrator,
            registry,
            llm_status,
        })
    }
}
