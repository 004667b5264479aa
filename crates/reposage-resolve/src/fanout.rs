//! Retrieval fan-out across repository collections.
//!
//! The query is embedded once and searched independently in every candidate
//! collection. Collections with no hits are dropped; nothing is re-ranked
//! across collections. Any failure fails the whole call.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use ndarray::Array1;
use tracing::{debug, info};

use crate::types::{RetrievalResult, RetrievedChunk};
use reposage_core::{Error, FanoutMode, Result};
use reposage_infer::EmbedderBackend;
use reposage_store::{CollectionRouter, SearchHit};

pub struct Retriever {
    router: CollectionRouter,
    embedder: Arc<dyn EmbedderBackend>,
    mode: FanoutMode,
}

impl Retriever {
    pub fn new(router: CollectionRouter, embedder: Arc<dyn EmbedderBackend>) -> Self {
        Self {
            router,
            embedder,
            mode: FanoutMode::Concurrent,
        }
    }

    pub fn with_mode(mut self, mode: FanoutMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn mode(&self) -> FanoutMode {
        self.mode
    }

    /// Search every candidate repository for `query`, up to `limit` hits each.
    pub async fn retrieve(
        &self,
        query: &str,
        candidates: &[String],
        limit: usize,
    ) -> Result<RetrievalResult> {
        if limit == 0 {
            return Err(Error::InvalidRequest(
                "per-collection limit must be positive".into(),
            ));
        }

        let mut seen = HashSet::new();
        let ids: Vec<String> = candidates
            .iter()
            .filter(|id| seen.insert(id.as_str()))
            .cloned()
            .collect();
        if ids.is_empty() {
            return Ok(RetrievalResult::default());
        }

        let vector = self.embed_query(query).await?;
        let searched = match self.mode {
            FanoutMode::Concurrent => self.search_concurrent(&ids, vector, limit).await?,
            FanoutMode::Sequential => ids
                .iter()
                .map(|id| Ok((id.clone(), search_one(&self.router, id, &vector, limit)?)))
                .collect::<Result<Vec<_>>>()?,
        };

        let result = aggregate(searched);
        info!(
            "Retrieved {} chunks from {}/{} repositories ({:?})",
            result.chunks.len(),
            result.contributing.len(),
            ids.len(),
            self.mode
        );
        Ok(result)
    }

    async fn embed_query(&self, query: &str) -> Result<Array1<f32>> {
        let embedder = self.embedder.clone();
        let query = query.to_string();
        let embedded = tokio::task::spawn_blocking(move || embedder.embed(&query))
            .await
            .map_err(|e| Error::Internal(format!("query embedding task failed: {e}")))??;
        Ok(embedded.embedding)
    }

    async fn search_concurrent(
        &self,
        ids: &[String],
        vector: Array1<f32>,
        limit: usize,
    ) -> Result<Vec<(String, Vec<SearchHit>)>> {
        let vector = Arc::new(vector);
        let tasks = ids.iter().map(|id| {
            let router = self.router.clone();
            let vector = vector.clone();
            let id = id.clone();
            tokio::task::spawn_blocking(move || search_one(&router, &id, &vector, limit))
        });
        let outcomes = join_all(tasks).await;

        // First error in candidate order wins.
        let mut searched = Vec::with_capacity(ids.len());
        for (id, outcome) in ids.iter().zip(outcomes) {
            let hits = outcome
                .map_err(|e| Error::Internal(format!("search task for {id} failed: {e}")))??;
            searched.push((id.clone(), hits));
        }
        Ok(searched)
    }
}

fn search_one(
    router: &CollectionRouter,
    repository_id: &str,
    vector: &Array1<f32>,
    limit: usize,
) -> Result<Vec<SearchHit>> {
    let handle = router.resolve(repository_id)?;
    let hits = router.index().query(&handle, vector, limit)?;
    debug!("{} hits in {}", hits.len(), handle.name());
    Ok(hits)
}

fn aggregate(searched: Vec<(String, Vec<SearchHit>)>) -> RetrievalResult {
    let mut result = RetrievalResult::default();
    for (repository_id, hits) in searched {
        if hits.is_empty() {
            continue;
        }
        result.chunks.extend(hits.into_iter().map(|hit| RetrievedChunk {
            repository_id: repository_id.clone(),
            chunk: hit.chunk,
            score: hit.score,
        }));
        result.contributing.push(repository_id);
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use reposage_core::{Chunk, DocumentMetadata, FormatTag};
    use reposage_infer::HashingEmbedder;
    use reposage_store::{
        CollectionHandle, CollectionInfo, EmbeddedChunk, InMemoryIndex, IndexStats, VectorIndex,
    };

    const DIM: usize = 64;

    /// Delegates to an in-memory index but fails every query on one collection.
    struct FlakyIndex {
        inner: InMemoryIndex,
        broken: String,
    }

    impl VectorIndex for FlakyIndex {
        fn backend(&self) -> &'static str {
            "flaky"
        }
        fn dimension(&self) -> usize {
            self.inner.dimension()
        }
        fn create_if_absent(&self, name: &str) -> Result<bool> {
            self.inner.create_if_absent(name)
        }
        fn insert(&self, c: &CollectionHandle, chunks: &[EmbeddedChunk]) -> Result<usize> {
            self.inner.insert(c, chunks)
        }
        fn query(&self, c: &CollectionHandle, v: &Array1<f32>, k: usize) -> Result<Vec<SearchHit>> {
            if c.name() == self.broken {
                return Err(Error::CollectionUnavailable(format!("{} is offline", c.name())));
            }
            self.inner.query(c, v, k)
        }
        fn collection_size(&self, c: &CollectionHandle) -> Result<usize> {
            self.inner.collection_size(c)
        }
        fn list_collections(&self) -> Result<Vec<CollectionInfo>> {
            self.inner.list_collections()
        }
        fn stats(&self) -> Result<IndexStats> {
            self.inner.stats()
        }
    }

    fn embedder() -> Arc<dyn EmbedderBackend> {
        Arc::new(HashingEmbedder::new(DIM))
    }

    fn seed(router: &CollectionRouter, repo: &str, texts: &[&str]) {
        let handle = router.resolve(repo).unwrap();
        let embedder = HashingEmbedder::new(DIM);
        let batch: Vec<EmbeddedChunk> = texts
            .iter()
            .enumerate()
            .map(|(ordinal, text)| EmbeddedChunk {
                chunk: Chunk {
                    text: text.to_string(),
                    ordinal,
                    format: FormatTag::PlainText,
                    metadata: DocumentMetadata::new(repo, "notes.txt"),
                },
                embedding: embedder.embed(text).unwrap().embedding,
            })
            .collect();
        router.index().insert(&handle, &batch).unwrap();
    }

    fn seeded_router() -> CollectionRouter {
        let router = CollectionRouter::new(Arc::new(InMemoryIndex::new(DIM)));
        seed(&router, "repo_a", &["budget review for march", "budget owners list"]);
        router.resolve("repo_b").unwrap();
        seed(&router, "repo_c", &["travel budget policy"]);
        router
    }

    fn ids(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_empty_collections_dropped_in_candidate_order() {
        for mode in [FanoutMode::Concurrent, FanoutMode::Sequential] {
            let retriever = Retriever::new(seeded_router(), embedder()).with_mode(mode);
            let result = retriever
                .retrieve("budget", &ids(&["repo_c", "repo_b", "repo_a"]), 3)
                .await
                .unwrap();

            assert_eq!(result.contributing, ids(&["repo_c", "repo_a"]));
            let owners: Vec<&str> = result.chunks.iter().map(|c| c.repository_id.as_str()).collect();
            assert_eq!(owners, vec!["repo_c", "repo_a", "repo_a"]);
        }
    }

    #[tokio::test]
    async fn test_limit_caps_each_collection() {
        let retriever = Retriever::new(seeded_router(), embedder());
        let result = retriever
            .retrieve("budget review", &ids(&["repo_a", "repo_c"]), 1)
            .await
            .unwrap();

        assert_eq!(result.chunks.len(), 2);
        assert_eq!(result.chunks[0].chunk.text, "budget review for march");
        assert_eq!(result.from_repository("repo_c").count(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_candidates_collapsed() {
        let retriever = Retriever::new(seeded_router(), embedder());
        let result = retriever
            .retrieve("travel", &ids(&["repo_c", "repo_c"]), 3)
            .await
            .unwrap();
        assert_eq!(result.contributing, ids(&["repo_c"]));
        assert_eq!(result.chunks.len(), 1);
    }

    #[tokio::test]
    async fn test_unknown_repository_is_provisioned_empty() {
        let router = seeded_router();
        let retriever = Retriever::new(router.clone(), embedder());
        let result = retriever
            .retrieve("budget", &ids(&["repo_new"]), 3)
            .await
            .unwrap();
        assert!(result.is_empty());
        assert!(result.contributing.is_empty());

        let handle = router.resolve("repo_new").unwrap();
        assert_eq!(router.index().collection_size(&handle).unwrap(), 0);
    }

    #[tokio::test]
    async fn test_one_failing_collection_fails_everything() {
        for mode in [FanoutMode::Concurrent, FanoutMode::Sequential] {
            let index = Arc::new(FlakyIndex {
                inner: InMemoryIndex::new(DIM),
                broken: CollectionRouter::collection_name("repo_b").unwrap(),
            });
            let router = CollectionRouter::new(index);
            seed(&router, "repo_a", &["budget review"]);
            seed(&router, "repo_b", &["budget broken"]);

            let retriever = Retriever::new(router, embedder()).with_mode(mode);
            let result = retriever
                .retrieve("budget", &ids(&["repo_a", "repo_b"]), 3)
                .await;
            assert!(matches!(result, Err(Error::CollectionUnavailable(_))));
        }
    }

    #[tokio::test]
    async fn test_zero_limit_rejected() {
        let retriever = Retriever::new(seeded_router(), embedder());
        let result = retriever.retrieve("budget", &ids(&["repo_a"]), 0).await;
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[tokio::test]
    async fn test_no_candidates_is_empty() {
        let retriever = Retriever::new(seeded_router(), embedder());
        let result = retriever.retrieve("budget", &[], 3).await.unwrap();
        assert!(result.is_empty());
    }
}
