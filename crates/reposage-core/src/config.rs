//! Configuration and data directory management.

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};

/// Default maximum chunk length, in characters.
pub const DEFAULT_CHUNK_SIZE: usize = 800;
/// Default overlap between consecutive chunks, in characters.
pub const DEFAULT_CHUNK_OVERLAP: usize = 150;
/// Default number of passages taken from each collection.
pub const DEFAULT_PER_COLLECTION_LIMIT: usize = 3;
/// Default embedding dimension (all-MiniLM family).
pub const DEFAULT_EMBEDDING_DIM: usize = 384;

/// Paths to all RepoSage data files and directories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataPaths {
    /// Root data directory (e.g., `data/`).
    pub root: PathBuf,
    /// Vector index directory (`data/vectordb/`).
    pub vectordb: PathBuf,
    /// ONNX model directory (`data/models/`).
    pub models: PathBuf,
    /// LLM configuration (`data/llm-config.json`).
    pub llm_config_file: PathBuf,
    /// Repository registry (`data/repositories.json`).
    pub repositories_file: PathBuf,
}

impl DataPaths {
    /// Create data paths from a root directory. Creates directories if needed.
    pub fn new(root: impl AsRef<Path>) -> std::io::Result<Self> {
        let root = root.as_ref().to_path_buf();
        let paths = Self {
            vectordb: root.join("vectordb"),
            models: root.join("models"),
            llm_config_file: root.join("llm-config.json"),
            repositories_file: root.join("repositories.json"),
            root,
        };
        std::fs::create_dir_all(&paths.vectordb)?;
        std::fs::create_dir_all(&paths.models)?;
        Ok(paths)
    }
}

/// Chunker settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    pub max_size: usize,
    pub overlap: usize,
    /// Separators in priority order; `""` means character-level splitting.
    pub separators: Vec<String>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            max_size: DEFAULT_CHUNK_SIZE,
            overlap: DEFAULT_CHUNK_OVERLAP,
            separators: ["\n\n", "\n", ". ", " ", ""]
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

impl ChunkingConfig {
    pub fn validate(&self) -> Result<()> {
        if self.max_size == 0 {
            return Err(Error::Config("chunk size must be positive".into()));
        }
        if self.overlap >= self.max_size {
            return Err(Error::Config(format!(
                "chunk overlap ({}) must be smaller than chunk size ({})",
                self.overlap, self.max_size
            )));
        }
        Ok(())
    }
}

/// How the retrieval fan-out dispatches per-collection searches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FanoutMode {
    Concurrent,
    Sequential,
}

impl FromStr for FanoutMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "concurrent" | "parallel" => Ok(Self::Concurrent),
            "sequential" => Ok(Self::Sequential),
            other => Err(Error::Config(format!("unknown fan-out mode: {other}"))),
        }
    }
}

/// Retrieval settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrievalConfig {
    pub per_collection_limit: usize,
    pub fanout: FanoutMode,
    /// Separator placed between passages in the assembled context.
    pub context_separator: String,
    /// Character budget for the assembled context; unbounded when `None`.
    #[serde(default)]
    pub max_context_chars: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            per_collection_limit: DEFAULT_PER_COLLECTION_LIMIT,
            fanout: FanoutMode::Concurrent,
            context_separator: "\n\n".into(),
            max_context_chars: None,
        }
    }
}

/// Which vector index backend to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexBackend {
    Sqlite,
    Memory,
}

impl FromStr for IndexBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::Config(format!("unknown index backend: {other}"))),
        }
    }
}

/// Top-level RepoSage configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoSageConfig {
    /// HTTP server port.
    pub port: u16,
    /// Data directory paths.
    pub data_paths: DataPaths,
    pub index_backend: IndexBackend,
    /// Dimension of the hashing embedder (the ONNX model fixes its own).
    pub embedding_dim: usize,
    pub chunking: ChunkingConfig,
    pub retrieval: RetrievalConfig,
}

impl RepoSageConfig {
    /// Create configuration from environment and defaults.
    pub fn from_env(data_dir: impl AsRef<Path>) -> Result<Self> {
        Self::from_lookup(data_dir, |key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup.
    pub fn from_lookup(
        data_dir: impl AsRef<Path>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let port = parse_var(&lookup, "PORT")?.unwrap_or(3003);
        let index_backend = parse_var(&lookup, "REPOSAGE_INDEX")?.unwrap_or(IndexBackend::Sqlite);
        let embedding_dim =
            parse_var(&lookup, "REPOSAGE_EMBEDDING_DIM")?.unwrap_or(DEFAULT_EMBEDDING_DIM);
        if embedding_dim == 0 {
            return Err(Error::Config("embedding dimension must be positive".into()));
        }

        let mut chunking = ChunkingConfig::default();
        if let Some(size) = parse_var(&lookup, "REPOSAGE_CHUNK_SIZE")? {
            chunking.max_size = size;
        }
        if let Some(overlap) = parse_var(&lookup, "REPOSAGE_CHUNK_OVERLAP")? {
            chunking.overlap = overlap;
        }
        chunking.validate()?;

        let mut retrieval = RetrievalConfig::default();
        if let Some(k) = parse_var(&lookup, "REPOSAGE_RETRIEVAL_K")? {
            if k == 0 {
                return Err(Error::Config("REPOSAGE_RETRIEVAL_K must be positive".into()));
            }
            retrieval.per_collection_limit = k;
        }
        if let Some(mode) = parse_var(&lookup, "REPOSAGE_FANOUT")? {
            retrieval.fanout = mode;
        }
        retrieval.max_context_chars = parse_var(&lookup, "REPOSAGE_MAX_CONTEXT_CHARS")?;

        let data_paths = DataPaths::new(data_dir)?;
        debug!(
            "Config: port={}, index={:?}, chunk={}/{}, k={}, fanout={:?}",
            port,
            index_backend,
            chunking.max_size,
            chunking.overlap,
            retrieval.per_collection_limit,
            retrieval.fanout
        );

        Ok(Self {
            port,
            data_paths,
            index_backend,
            embedding_dim,
            chunking,
            retrieval,
        })
    }
}

fn parse_var<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| Error::Config(format!("{key}={raw:?}: {e}"))),
        _ => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_with(vars: &[(&str, &str)]) -> Result<(RepoSageConfig, tempfile::TempDir)> {
        let dir = tempfile::tempdir().unwrap();
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        let config = RepoSageConfig::from_lookup(dir.path(), |k| vars.get(k).cloned())?;
        Ok((config, dir))
    }

    #[test]
    fn test_defaults() {
        let (config, dir) = config_with(&[]).unwrap();
        assert_eq!(config.port, 3003);
        assert_eq!(config.index_backend, IndexBackend::Sqlite);
        assert_eq!(config.chunking.max_size, 800);
        assert_eq!(config.chunking.overlap, 150);
        assert_eq!(config.chunking.separators.last().map(String::as_str), Some(""));
        assert_eq!(config.retrieval.per_collection_limit, 3);
        assert_eq!(config.retrieval.fanout, FanoutMode::Concurrent);
        assert!(dir.path().join("vectordb").is_dir());
        assert!(dir.path().join("models").is_dir());
    }

    #[test]
    fn test_overrides() {
        let (config, _dir) = config_with(&[
            ("PORT", "8080"),
            ("REPOSAGE_INDEX", "memory"),
            ("REPOSAGE_CHUNK_SIZE", "400"),
            ("REPOSAGE_CHUNK_OVERLAP", "40"),
            ("REPOSAGE_RETRIEVAL_K", "5"),
            ("REPOSAGE_FANOUT", "sequential"),
            ("REPOSAGE_MAX_CONTEXT_CHARS", "4000"),
        ])
        .unwrap();
        assert_eq!(config.port, 8080);
        assert_eq!(config.index_backend, IndexBackend::Memory);
        assert_eq!(config.chunking.max_size, 400);
        assert_eq!(config.chunking.overlap, 40);
        assert_eq!(config.retrieval.per_collection_limit, 5);
        assert_eq!(config.retrieval.fanout, FanoutMode::Sequential);
        assert_eq!(config.retrieval.max_context_chars, Some(4000));
    }

    #[test]
    fn test_invalid_values_are_config_errors() {
        assert!(matches!(
            config_with(&[("PORT", "not-a-port")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_with(&[("REPOSAGE_CHUNK_SIZE", "100"), ("REPOSAGE_CHUNK_OVERLAP", "100")]),
            Err(Error::Config(_))
        ));
        assert!(matches!(
            config_with(&[("REPOSAGE_FANOUT", "sideways")]),
            Err(Error::Config(_))
        ));
    }
}
