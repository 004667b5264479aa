//! RepoSage Infer: embedding engines and query cache.
//!
//! Provides the `EmbedderBackend` trait used for both chunk and query
//! embedding. When the `onnx` feature is enabled and model files are present,
//! `OnnxEmbedder` is used; otherwise the deterministic `HashingEmbedder`.

pub mod cache;
pub mod embedder;
pub mod hashing;
pub mod onnx_embedder;

pub use cache::{CacheStats, CachedEmbedder, QueryCache};
pub use embedder::{EmbedderBackend, EmbeddingResult};
pub use hashing::HashingEmbedder;

#[cfg(feature = "onnx")]
pub use onnx_embedder::OnnxEmbedder;

use std::path::Path;
use std::sync::Arc;

/// Create the best available embedder, wrapped in a query cache.
///
/// Tries ONNX first (if feature enabled and model files present), falls back
/// to feature hashing with `fallback_dim` buckets.
pub fn create_embedder(model_dir: &Path, fallback_dim: usize) -> Arc<dyn EmbedderBackend> {
    #[cfg(feature = "onnx")]
    {
        match OnnxEmbedder::load(model_dir) {
            Ok(embedder) => {
                tracing::info!("Using ONNX embedder (dim={})", embedder.dimension());
                return Arc::new(CachedEmbedder::new(embedder, QueryCache::default_cache()));
            }
            Err(e) => {
                tracing::warn!("ONNX embedder unavailable: {}. Falling back to feature hashing.", e);
            }
        }
    }

    #[cfg(not(feature = "onnx"))]
    {
        tracing::info!(
            "ONNX feature disabled, ignoring {}. Using feature-hashing embedder.",
            model_dir.display()
        );
    }

    Arc::new(CachedEmbedder::new(
        HashingEmbedder::new(fallback_dim),
        QueryCache::default_cache(),
    ))
}
