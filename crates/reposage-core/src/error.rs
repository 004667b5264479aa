//! Error types for RepoSage.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Format tag or file extension outside the accepted set.
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    /// Nothing extractable after decoding and stripping whitespace.
    #[error("Empty content: {0}")]
    EmptyContent(String),

    /// Payload is not valid for its declared format.
    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    /// Resolve, insert or query against the vector index failed.
    #[error("Collection unavailable: {0}")]
    CollectionUnavailable(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    /// The answer generator call failed.
    #[error("Generation failure: {0}")]
    GenerationFailure(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Stable machine-readable kind, used in API error bodies and logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Error::UnsupportedFormat(_) => "unsupported_format",
            Error::EmptyContent(_) => "empty_content",
            Error::Decode(_) => "decode_error",
            Error::InvalidRequest(_) => "invalid_request",
            Error::NotFound(_) => "not_found",
            Error::CollectionUnavailable(_) => "collection_unavailable",
            Error::Embedding(_) => "embedding_failure",
            Error::GenerationFailure(_) => "generation_failure",
            Error::Config(_) => "config_error",
            Error::Io(_) => "io_error",
            Error::Json(_) => "json_error",
            Error::Internal(_) => "internal_error",
        }
    }

    /// True for errors caused by the caller's input rather than a dependency.
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Error::UnsupportedFormat(_)
                | Error::EmptyContent(_)
                | Error::Decode(_)
                | Error::InvalidRequest(_)
                | Error::NotFound(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_input_errors_are_client_errors() {
        assert!(Error::UnsupportedFormat("docx".into()).is_client_error());
        assert!(Error::EmptyContent("blank".into()).is_client_error());
        assert!(Error::Decode("bad utf-8".into()).is_client_error());
    }

    #[test]
    fn test_dependency_errors_are_not_client_errors() {
        assert!(!Error::CollectionUnavailable("db locked".into()).is_client_error());
        assert!(!Error::GenerationFailure("timeout".into()).is_client_error());
        assert!(!Error::Embedding("model".into()).is_client_error());
    }

    #[test]
    fn test_kinds_are_distinct() {
        let errors = [
            Error::UnsupportedFormat(String::new()),
            Error::EmptyContent(String::new()),
            Error::Decode(String::new()),
            Error::CollectionUnavailable(String::new()),
            Error::GenerationFailure(String::new()),
        ];
        let mut kinds: Vec<_> = errors.iter().map(|e| e.kind()).collect();
        kinds.sort();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }
}
