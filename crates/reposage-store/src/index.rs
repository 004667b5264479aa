//! The vector index seam.

use ndarray::Array1;
use serde::Serialize;

use crate::types::{CollectionInfo, EmbeddedChunk, IndexStats, SearchHit};
use reposage_core::Result;

/// Resolved reference to one isolated collection.
///
/// Only the `CollectionRouter` constructs handles outside of tests, so a
/// handle always names a collection that existed when it was resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct CollectionHandle {
    name: String,
    repository_id: String,
}

impl CollectionHandle {
    pub fn new(name: impl Into<String>, repository_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            repository_id: repository_id.into(),
        }
    }

    /// Backend-level collection name.
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn repository_id(&self) -> &str {
        &self.repository_id
    }
}

/// Storage engine holding named collections of embedded chunks.
///
/// Implementations serialize their own writes; callers never hold a lock
/// across calls. Every failure is reported as `Error::CollectionUnavailable`
/// except vector width mismatches, which are `Error::Embedding`.
pub trait VectorIndex: Send + Sync {
    /// Short backend name for logs and stats.
    fn backend(&self) -> &'static str;

    /// Vector width accepted by `insert` and `query`.
    fn dimension(&self) -> usize;

    /// Create an empty collection unless one already exists. Returns `true`
    /// when it was created by this call.
    fn create_if_absent(&self, name: &str) -> Result<bool>;

    /// Insert all chunks or none of them.
    fn insert(&self, collection: &CollectionHandle, chunks: &[EmbeddedChunk]) -> Result<usize>;

    /// Up to `k` hits, nearest first.
    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &Array1<f32>,
        k: usize,
    ) -> Result<Vec<SearchHit>>;

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize>;

    /// All collections, ordered by name.
    fn list_collections(&self) -> Result<Vec<CollectionInfo>>;

    fn stats(&self) -> Result<IndexStats>;
}
