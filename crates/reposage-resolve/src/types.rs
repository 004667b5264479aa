//! Retrieval types.

use serde::Serialize;

use reposage_core::Chunk;

/// A chunk returned by the fan-out, tagged with the repository it came from.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub repository_id: String,
    pub chunk: Chunk,
    /// Cosine similarity to the query within its own collection.
    pub score: f32,
}

/// Aggregated result of one fan-out.
///
/// `chunks` are grouped by repository in candidate order, nearest first
/// within each group. `contributing` lists the repositories that produced at
/// least one chunk, in the same order.
#[derive(Debug, Clone, Default, Serialize)]
pub struct RetrievalResult {
    pub chunks: Vec<RetrievedChunk>,
    pub contributing: Vec<String>,
}

impl RetrievalResult {
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Chunk texts in emission order.
    pub fn passages(&self) -> impl Iterator<Item = &str> {
        self.chunks.iter().map(|c| c.chunk.text.as_str())
    }

    pub fn from_repository<'a>(&'a self, repository_id: &'a str) -> impl Iterator<Item = &'a RetrievedChunk> {
        self.chunks
            .iter()
            .filter(move |c| c.repository_id == repository_id)
    }
}
