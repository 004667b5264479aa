//! Runtime types.

use serde::Serialize;

use reposage_core::FanoutMode;
use reposage_store::IndexStats;

/// Answer to a query over a set of repositories.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    /// Repositories that contributed at least one passage, in request order.
    pub contributing: Vec<String>,
    /// Number of passages handed to the generator.
    pub passages: usize,
}

/// Runtime status information.
#[derive(Debug, Clone, Serialize)]
pub struct RuntimeStatus {
    pub index: IndexStats,
    pub embedder_model: String,
    pub generator: String,
    pub fanout: FanoutMode,
    pub per_collection_limit: usize,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
}
