//! RepoSage Core: shared error taxonomy, configuration and the document model.

pub mod config;
pub mod error;
pub mod types;

pub use config::{ChunkingConfig, DataPaths, FanoutMode, IndexBackend, RepoSageConfig, RetrievalConfig};
pub use error::{Error, Result};
pub use types::{Chunk, Document, DocumentMetadata, FormatTag};
