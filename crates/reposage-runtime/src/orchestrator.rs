//! Orchestrator: the caller-facing ingest and answer operations.

use std::sync::Arc;

use tracing::info;

use crate::types::*;
use reposage_chat::AnswerGenerator;
use reposage_core::{Document, DocumentMetadata, Error, FormatTag, RepoSageConfig, Result};
use reposage_infer::EmbedderBackend;
use reposage_ingest::{ExtractorRegistry, IngestReport, Ingester, RecursiveChunker};
use reposage_resolve::{ContextAssembler, Retriever};
use reposage_store::{CollectionHandle, CollectionRouter, VectorIndex};

/// Wires ingestion, retrieval, context assembly and answer generation
/// around one vector index.
pub struct Orchestrator {
    ingester: Ingester,
    retriever: Retriever,
    assembler: ContextAssembler,
    generator: Arc<dyn AnswerGenerator>,
    router: CollectionRouter,
    embedder: Arc<dyn EmbedderBackend>,
    per_collection_limit: usize,
}

impl Orchestrator {
    pub fn new(
        config: &RepoSageConfig,
        index: Arc<dyn VectorIndex>,
        embedder: Arc<dyn EmbedderBackend>,
        generator: Arc<dyn AnswerGenerator>,
    ) -> Result<Self> {
        if embedder.dimension() != index.dimension() {
            return Err(Error::Config(format!(
                "embedder {} produces {} dimensions but the {} index stores {}",
                embedder.model_id(),
                embedder.dimension(),
                index.backend(),
                index.dimension()
            )));
        }

        let router = CollectionRouter::new(index);
        let ingester = Ingester::new(
            ExtractorRegistry::with_defaults(),
            RecursiveChunker::from_config(&config.chunking)?,
            embedder.clone(),
            router.clone(),
        );
        let retriever =
            Retriever::new(router.clone(), embedder.clone()).with_mode(config.retrieval.fanout);

        info!(
            "Orchestrator initialized: index={}, embedder={}, generator={}, k={}",
            router.index().backend(),
            embedder.model_id(),
            generator.name(),
            config.retrieval.per_collection_limit
        );

        Ok(Self {
            ingester,
            retriever,
            assembler: ContextAssembler::from_config(&config.retrieval),
            generator,
            router,
            embedder,
            per_collection_limit: config.retrieval.per_collection_limit,
        })
    }

    pub fn router(&self) -> &CollectionRouter {
        &self.router
    }

    /// Create the repository's collection if it does not exist yet.
    pub fn provision_repository(&self, repository_id: &str) -> Result<CollectionHandle> {
        self.router.resolve(repository_id)
    }

    /// Ingest a fully formed document. Blocking.
    pub fn ingest(&self, document: &Document) -> Result<IngestReport> {
        self.ingester.ingest(document)
    }

    /// Ingest raw bytes under a format tag. Returns the inserted chunk count.
    ///
    /// The tag is checked before anything else; `repository_id` overrides
    /// whatever the metadata carries.
    pub fn ingest_document(
        &self,
        bytes: Vec<u8>,
        format: &str,
        repository_id: &str,
        mut metadata: DocumentMetadata,
    ) -> Result<usize> {
        let format: FormatTag = format.parse()?;
        metadata.repository_id = repository_id.to_string();
        let report = self.ingest(&Document::new(bytes, format, metadata))?;
        Ok(report.chunks)
    }

    /// Retrieve from every repository in `repository_ids`, assemble the
    /// context and generate an answer. The generator runs even when nothing
    /// was retrieved.
    pub async fn answer_query(&self, query: &str, repository_ids: &[String]) -> Result<Answer> {
        if query.trim().is_empty() {
            return Err(Error::InvalidRequest("query must not be empty".into()));
        }

        let retrieved = self
            .retriever
            .retrieve(query, repository_ids, self.per_collection_limit)
            .await?;
        let context = self.assembler.assemble(&retrieved);
        let text = self.generator.generate(query, &context).await?;

        Ok(Answer {
            text,
            passages: retrieved.chunks.len(),
            contributing: retrieved.contributing,
        })
    }

    pub fn status(&self) -> Result<RuntimeStatus> {
        Ok(RuntimeStatus {
            index: self.router.index().stats()?,
            embedder_model: self.embedder.model_id().to_string(),
            generator: self.generator.name().to_string(),
            fanout: self.retriever.mode(),
            per_collection_limit: self.per_collection_limit,
            chunk_size: self.ingester.chunker().max_size(),
            chunk_overlap: self.ingester.chunker().overlap(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use parking_lot::Mutex;
    use reposage_infer::HashingEmbedder;
    use reposage_store::InMemoryIndex;

    const DIM: usize = 64;

    /// Records the context it was called with and echoes it back.
    #[derive(Default)]
    struct EchoGenerator {
        seen: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl AnswerGenerator for EchoGenerator {
        async fn generate(&self, query: &str, context: &str) -> Result<String> {
            self.seen.lock().push(context.to_string());
            if self.fail {
                return Err(Error::GenerationFailure("provider down".into()));
            }
            Ok(format!("{query} => {} chars", context.len()))
        }

        fn name(&self) -> &str {
            "echo"
        }
    }

    fn setup(generator: Arc<EchoGenerator>) -> (Orchestrator, tempfile::TempDir) {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoSageConfig::from_lookup(dir.path(), |_| None).unwrap();
        let orchestrator = Orchestrator::new(
            &config,
            Arc::new(InMemoryIndex::new(DIM)),
            Arc::new(HashingEmbedder::new(DIM)),
            generator,
        )
        .unwrap();
        (orchestrator, dir)
    }

    fn meta() -> DocumentMetadata {
        DocumentMetadata::new("ignored", "doc.txt").with_user("u1")
    }

    #[test]
    fn test_two_thousand_chars_make_three_chunks() {
        let (orch, _dir) = setup(Arc::default());
        let text = "abcdefghij".repeat(200);
        let count = orch
            .ingest_document(text.into_bytes(), "plain-text", "repo_a", meta())
            .unwrap();
        assert_eq!(count, 3);

        let handle = orch.provision_repository("repo_a").unwrap();
        assert_eq!(orch.router().index().collection_size(&handle).unwrap(), 3);
    }

    #[test]
    fn test_unknown_tag_rejected_before_anything() {
        let (orch, _dir) = setup(Arc::default());
        let result = orch.ingest_document(b"hello".to_vec(), "docx", "repo_a", meta());
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
        assert!(orch.router().index().list_collections().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_answer_uses_contributing_repositories() {
        let generator = Arc::new(EchoGenerator::default());
        let (orch, _dir) = setup(generator.clone());
        orch.ingest_document(b"shipping takes five days".to_vec(), "plain-text", "repo_a", meta())
            .unwrap();
        orch.provision_repository("repo_b").unwrap();
        orch.ingest_document(b"carrier,days\nacme,5".to_vec(), "tabular", "repo_c", meta())
            .unwrap();

        let ids: Vec<String> = ["repo_a", "repo_b", "repo_c"].iter().map(|s| s.to_string()).collect();
        let answer = orch.answer_query("how many days", &ids).await.unwrap();

        assert_eq!(answer.contributing, vec!["repo_a".to_string(), "repo_c".to_string()]);
        assert_eq!(answer.passages, 2);
        assert_eq!(
            generator.seen.lock()[0],
            "shipping takes five days\n\ncarrier,days\nacme,5"
        );
    }

    #[tokio::test]
    async fn test_generator_called_with_empty_context() {
        let generator = Arc::new(EchoGenerator::default());
        let (orch, _dir) = setup(generator.clone());

        let answer = orch
            .answer_query("anything", &["repo_empty".to_string()])
            .await
            .unwrap();
        assert!(answer.contributing.is_empty());
        assert_eq!(answer.text, "anything => 0 chars");
        assert_eq!(generator.seen.lock().as_slice(), &[String::new()]);
    }

    #[tokio::test]
    async fn test_blank_query_and_generator_failure() {
        let generator = Arc::new(EchoGenerator {
            fail: true,
            ..Default::default()
        });
        let (orch, _dir) = setup(generator);

        assert!(matches!(
            orch.answer_query("   ", &[]).await,
            Err(Error::InvalidRequest(_))
        ));
        assert!(matches!(
            orch.answer_query("why?", &[]).await,
            Err(Error::GenerationFailure(_))
        ));
    }

    #[test]
    fn test_dimension_mismatch_is_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let config = RepoSageConfig::from_lookup(dir.path(), |_| None).unwrap();
        let result = Orchestrator::new(
            &config,
            Arc::new(InMemoryIndex::new(DIM)),
            Arc::new(HashingEmbedder::new(DIM * 2)),
            Arc::new(EchoGenerator::default()),
        );
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_status() {
        let (orch, _dir) = setup(Arc::default());
        orch.provision_repository("repo_a").unwrap();
        let status = orch.status().unwrap();
        assert_eq!(status.index.backend, "memory");
        assert_eq!(status.index.collections, 1);
        assert_eq!(status.generator, "echo");
        assert_eq!(status.per_collection_limit, 3);
        assert_eq!(status.chunk_size, 800);
    }
}
