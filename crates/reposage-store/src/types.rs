//! Data types exchanged with vector index backends.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use reposage_core::Chunk;

/// A chunk paired with its embedding, ready for insertion.
#[derive(Debug, Clone)]
pub struct EmbeddedChunk {
    pub chunk: Chunk,
    pub embedding: Array1<f32>,
}

/// One nearest-neighbor hit.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk: Chunk,
    /// Cosine similarity to the query vector.
    pub score: f32,
}

/// Summary of one collection.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CollectionInfo {
    pub name: String,
    pub chunks: usize,
    pub created_at: i64,
}

/// Index-level statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexStats {
    pub backend: String,
    pub collections: usize,
    pub chunks: usize,
    pub embedding_dimension: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub db_size_mb: Option<f64>,
}
