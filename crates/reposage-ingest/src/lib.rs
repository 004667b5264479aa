//! RepoSage Ingest: turns uploaded documents into embedded chunks.

pub mod chunking;
pub mod extract;
pub mod ingest;

pub use chunking::{RecursiveChunker, TextChunk};
pub use extract::{ExtractorRegistry, FormatHandler};
pub use ingest::{IngestReport, Ingester};
