//! Embedding engine trait.
//!
//! Implementations:
//! - `HashingEmbedder`: deterministic feature hashing, no model files needed
//! - `OnnxEmbedder`: ONNX Runtime sentence-transformer (requires the `onnx` feature)
//! - `CachedEmbedder`: wraps any backend with an LRU query cache

use ndarray::Array1;
use reposage_core::Result;

/// Result of an embedding operation.
#[derive(Debug, Clone)]
pub struct EmbeddingResult {
    /// Float32 embedding vector of `dimension()` entries.
    pub embedding: Array1<f32>,
    /// Whether this was served from cache.
    pub cached: bool,
}

/// Trait for embedding backends.
///
/// The same backend must embed both the chunks of a collection and the queries
/// issued against it.
pub trait EmbedderBackend: Send + Sync {
    /// Generate an embedding for a text string.
    fn embed(&self, text: &str) -> Result<EmbeddingResult>;

    /// Generate embeddings for a batch of texts. Fails as a whole.
    fn embed_batch(&self, texts: &[&str]) -> Result<Vec<EmbeddingResult>> {
        texts.iter().map(|t| self.embed(t)).collect()
    }

    /// Get the embedding dimension.
    fn dimension(&self) -> usize;

    /// Identifier of the model behind this backend.
    fn model_id(&self) -> &str;
}
