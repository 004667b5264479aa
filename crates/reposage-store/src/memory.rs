//! In-memory `VectorIndex` for tests and ephemeral deployments.
//!
//! Collections live in a `DashMap`, each behind its own `RwLock`, so inserts
//! into one repository never block queries against another. Vectors are kept
//! normalized in float32 and searched by brute-force cosine similarity.

use std::sync::Arc;

use dashmap::DashMap;
use ndarray::Array1;
use parking_lot::RwLock;

use crate::embedding::{l2_normalize, top_k};
use crate::index::{CollectionHandle, VectorIndex};
use crate::types::{CollectionInfo, EmbeddedChunk, IndexStats, SearchHit};
use reposage_core::{Chunk, Error, Result};

struct StoredChunk {
    chunk: Chunk,
    /// `None` for zero vectors, which can never match.
    unit: Option<Array1<f32>>,
}

struct MemoryCollection {
    created_at: i64,
    chunks: Vec<StoredChunk>,
}

pub struct InMemoryIndex {
    dim: usize,
    collections: DashMap<String, Arc<RwLock<MemoryCollection>>>,
}

impl InMemoryIndex {
    pub fn new(dim: usize) -> Self {
        Self {
            dim,
            collections: DashMap::new(),
        }
    }

    /// Remove a collection outright. Returns whether it existed.
    pub fn drop_collection(&self, name: &str) -> bool {
        self.collections.remove(name).is_some()
    }

    fn collection(&self, handle: &CollectionHandle) -> Result<Arc<RwLock<MemoryCollection>>> {
        self.collections
            .get(handle.name())
            .map(|entry| entry.value().clone())
            .ok_or_else(|| {
                Error::CollectionUnavailable(format!("collection {} does not exist", handle.name()))
            })
    }

    fn check_width(&self, vector: &Array1<f32>) -> Result<()> {
        if vector.len() != self.dim {
            return Err(Error::Embedding(format!(
                "vector has {} dimensions, index expects {}",
                vector.len(),
                self.dim
            )));
        }
        Ok(())
    }
}

impl VectorIndex for InMemoryIndex {
    fn backend(&self) -> &'static str {
        "memory"
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn create_if_absent(&self, name: &str) -> Result<bool> {
        let mut created = false;
        self.collections.entry(name.to_string()).or_insert_with(|| {
            created = true;
            Arc::new(RwLock::new(MemoryCollection {
                created_at: chrono::Utc::now().timestamp_millis(),
                chunks: Vec::new(),
            }))
        });
        Ok(created)
    }

    fn insert(&self, collection: &CollectionHandle, chunks: &[EmbeddedChunk]) -> Result<usize> {
        // Validate the whole batch before touching the collection.
        for item in chunks {
            self.check_width(&item.embedding)?;
        }
        let target = self.collection(collection)?;

        let mut guard = target.write();
        guard.chunks.extend(chunks.iter().map(|item| StoredChunk {
            chunk: item.chunk.clone(),
            unit: l2_normalize(&item.embedding),
        }));
        Ok(chunks.len())
    }

    fn query(
        &self,
        collection: &CollectionHandle,
        vector: &Array1<f32>,
        k: usize,
    ) -> Result<Vec<SearchHit>> {
        self.check_width(vector)?;
        let target = self.collection(collection)?;
        let Some(query) = l2_normalize(vector) else {
            return Ok(Vec::new());
        };

        let guard = target.read();
        let candidates: Vec<&StoredChunk> =
            guard.chunks.iter().filter(|c| c.unit.is_some()).collect();
        let scores: Vec<f32> = candidates
            .iter()
            .filter_map(|c| c.unit.as_ref().map(|u| u.dot(&query)))
            .collect();

        Ok(top_k(&scores, k)
            .into_iter()
            .map(|(i, score)| SearchHit {
                chunk: candidates[i].chunk.clone(),
                score,
            })
            .collect())
    }

    fn collection_size(&self, collection: &CollectionHandle) -> Result<usize> {
        Ok(self.collection(collection)?.read().chunks.len())
    }

    fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
        let mut infos: Vec<CollectionInfo> = self
            .collections
            .iter()
            .map(|entry| {
                let c = entry.value().read();
                CollectionInfo {
                    name: entry.key().clone(),
                    chunks: c.chunks.len(),
                    created_at: c.created_at,
                }
            })
            .collect();
        infos.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(infos)
    }

    fn stats(&self) -> Result<IndexStats> {
        let collections = self.list_collections()?;
        Ok(IndexStats {
            backend: self.backend().to_string(),
            collections: collections.len(),
            chunks: collections.iter().map(|c| c.chunks).sum(),
            embedding_dimension: self.dim,
            db_path: None,
            db_size_mb: None,
        })
    }
}
