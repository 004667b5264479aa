//! Document ingestion pipeline: bytes → text → chunks → embeddings → collection.

use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info};

use crate::chunking::RecursiveChunker;
use crate::extract::ExtractorRegistry;
use reposage_core::{Chunk, Document, Error, Result};
use reposage_infer::EmbedderBackend;
use reposage_store::{CollectionRouter, EmbeddedChunk};

/// Outcome of ingesting one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IngestReport {
    /// Chunks inserted into the collection.
    pub chunks: usize,
    pub collection: String,
    /// Length of the extracted text in chars.
    pub extracted_chars: usize,
}

/// Handles document ingestion: extraction, chunking, embedding and storage.
pub struct Ingester {
    extractors: ExtractorRegistry,
    chunker: RecursiveChunker,
    embedder: Arc<dyn EmbedderBackend>,
    router: CollectionRouter,
}

impl Ingester {
    pub fn new(
        extractors: ExtractorRegistry,
        chunker: RecursiveChunker,
        embedder: Arc<dyn EmbedderBackend>,
        router: CollectionRouter,
    ) -> Self {
        Self {
            extractors,
            chunker,
            embedder,
            router,
        }
    }

    pub fn extractors(&self) -> &ExtractorRegistry {
        &self.extractors
    }

    pub fn chunker(&self) -> &RecursiveChunker {
        &self.chunker
    }

    pub fn router(&self) -> &CollectionRouter {
        &self.router
    }

    /// Ingest one document, all or nothing.
    ///
    /// Everything that can fail on the document itself runs before the
    /// collection is resolved, so a rejected document never provisions or
    /// touches a collection.
    pub fn ingest(&self, document: &Document) -> Result<IngestReport> {
        let repository_id = document.repository_id();
        if repository_id.is_empty() {
            return Err(Error::InvalidRequest("document has no repository id".into()));
        }
        if !self.extractors.supports(document.format) {
            return Err(Error::UnsupportedFormat(format!(
                "no handler registered for {}",
                document.format
            )));
        }

        let text = self.extractors.extract(document.format, &document.content)?;
        let pieces = self.chunker.chunk(&text)?;
        debug!(
            "Extracted {} chars from {} into {} chunks",
            text.chars().count(),
            document.metadata.source_name,
            pieces.len()
        );

        let texts: Vec<&str> = pieces.iter().map(|p| p.text.as_str()).collect();
        let embeddings = self.embedder.embed_batch(&texts)?;
        if embeddings.len() != pieces.len() {
            return Err(Error::Embedding(format!(
                "embedder returned {} vectors for {} chunks",
                embeddings.len(),
                pieces.len()
            )));
        }

        let batch: Vec<EmbeddedChunk> = pieces
            .into_iter()
            .zip(embeddings)
            .map(|(piece, embedded)| EmbeddedChunk {
                chunk: Chunk {
                    text: piece.text,
                    ordinal: piece.chunk_index,
                    format: document.format,
                    metadata: document.metadata.clone(),
                },
                embedding: embedded.embedding,
            })
            .collect();

        let handle = self.router.resolve(repository_id)?;
        let inserted = self.router.index().insert(&handle, &batch)?;

        info!(
            "Ingested {} ({}) into {}: {} chunks",
            document.metadata.source_name,
            document.format,
            handle.name(),
            inserted
        );

        Ok(IngestReport {
            chunks: inserted,
            collection: handle.name().to_string(),
            extracted_chars: text.chars().count(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extract::paginated::tests::build_pdf;
    use reposage_core::{DocumentMetadata, FormatTag};
    use reposage_infer::HashingEmbedder;
    use reposage_store::{InMemoryIndex, VectorIndex};

    const DIM: usize = 64;

    fn ingester_with(extractors: ExtractorRegistry) -> (Ingester, Arc<InMemoryIndex>) {
        let index = Arc::new(InMemoryIndex::new(DIM));
        let ingester = Ingester::new(
            extractors,
            RecursiveChunker::new(200, 40).unwrap(),
            Arc::new(HashingEmbedder::new(DIM)),
            CollectionRouter::new(index.clone()),
        );
        (ingester, index)
    }

    fn ingester() -> (Ingester, Arc<InMemoryIndex>) {
        ingester_with(ExtractorRegistry::with_defaults())
    }

    fn doc(repo: &str, format: FormatTag, content: &[u8]) -> Document {
        Document::new(
            content.to_vec(),
            format,
            DocumentMetadata::new(repo, format!("upload.{}", format.extension()))
                .with_user("user-7")
                .with_extra("uploaded_by", "test"),
        )
    }

    #[test]
    fn test_plain_text_chunks_tagged_and_stored() {
        let (ingester, index) = ingester();
        let body = "Invoices are due within thirty days of receipt. ".repeat(20);

        let report = ingester.ingest(&doc("repo_a", FormatTag::PlainText, body.as_bytes())).unwrap();
        assert!(report.chunks > 1);
        assert_eq!(report.collection, "rs_repo_a");

        let handle = ingester.router().resolve("repo_a").unwrap();
        assert_eq!(index.collection_size(&handle).unwrap(), report.chunks);

        let query = HashingEmbedder::new(DIM).embed("invoices due").unwrap().embedding;
        let hits = index.query(&handle, &query, 50).unwrap();
        assert_eq!(hits.len(), report.chunks);
        for hit in &hits {
            assert_eq!(hit.chunk.format, FormatTag::PlainText);
            assert_eq!(hit.chunk.metadata.repository_id, "repo_a");
            assert_eq!(hit.chunk.metadata.user_id, "user-7");
            assert_eq!(hit.chunk.metadata.source_name, "upload.txt");
            assert_eq!(hit.chunk.metadata.extra["uploaded_by"], "test");
        }
        let mut ordinals: Vec<usize> = hits.iter().map(|h| h.chunk.ordinal).collect();
        ordinals.sort();
        assert_eq!(ordinals, (0..report.chunks).collect::<Vec<_>>());
    }

    #[test]
    fn test_csv_and_pdf_documents() {
        let (ingester, _index) = ingester();

        let csv = ingester
            .ingest(&doc("repo_b", FormatTag::Tabular, b"sku,qty\nA-1,4\n"))
            .unwrap();
        assert_eq!(csv.chunks, 1);
        assert_eq!(csv.extracted_chars, "sku,qty\nA-1,4".len());

        let pdf = build_pdf(&[Some("Warehouse audit notes")]);
        let report = ingester
            .ingest(&doc("repo_b", FormatTag::PaginatedDocument, &pdf))
            .unwrap();
        assert_eq!(report.chunks, 1);
    }

    #[test]
    fn test_rejected_documents_leave_no_collection() {
        let (ingester, index) = ingester();

        let blank = ingester.ingest(&doc("repo_c", FormatTag::PlainText, b"   \n"));
        assert!(matches!(blank, Err(Error::EmptyContent(_))));

        let invalid = ingester.ingest(&doc("repo_c", FormatTag::PlainText, &[0xff, 0xfe]));
        assert!(matches!(invalid, Err(Error::Decode(_))));

        let empty_csv = ingester.ingest(&doc("repo_c", FormatTag::Tabular, b""));
        assert!(matches!(empty_csv, Err(Error::EmptyContent(_))));

        assert!(index.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_unregistered_format_is_unsupported() {
        let (ingester, index) = ingester_with(ExtractorRegistry::empty());
        let result = ingester.ingest(&doc("repo_d", FormatTag::PlainText, b"hello"));
        assert!(matches!(result, Err(Error::UnsupportedFormat(_))));
        assert!(index.list_collections().unwrap().is_empty());
    }

    #[test]
    fn test_missing_repository_id() {
        let (ingester, _index) = ingester();
        let result = ingester.ingest(&doc("", FormatTag::PlainText, b"hello"));
        assert!(matches!(result, Err(Error::InvalidRequest(_))));
    }

    #[test]
    fn test_repositories_stay_isolated() {
        let (ingester, index) = ingester();
        ingester
            .ingest(&doc("repo_x", FormatTag::PlainText, b"alpha facts"))
            .unwrap();
        ingester
            .ingest(&doc("repo_y", FormatTag::PlainText, b"beta facts"))
            .unwrap();

        let x = ingester.router().resolve("repo_x").unwrap();
        let query = HashingEmbedder::new(DIM).embed("facts").unwrap().embedding;
        let hits = index.query(&x, &query, 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk.text, "alpha facts");
    }
}
