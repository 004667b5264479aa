//! Document and chunk model shared by ingestion, storage and retrieval.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Closed set of document formats the pipeline accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FormatTag {
    PlainText,
    Tabular,
    PaginatedDocument,
}

impl FormatTag {
    pub const ALL: [FormatTag; 3] = [
        FormatTag::PlainText,
        FormatTag::Tabular,
        FormatTag::PaginatedDocument,
    ];

    /// Canonical tag string.
    pub fn as_str(&self) -> &'static str {
        match self {
            FormatTag::PlainText => "plain-text",
            FormatTag::Tabular => "tabular",
            FormatTag::PaginatedDocument => "paginated-document",
        }
    }

    /// File extension used for uploads of this format.
    pub fn extension(&self) -> &'static str {
        match self {
            FormatTag::PlainText => "txt",
            FormatTag::Tabular => "csv",
            FormatTag::PaginatedDocument => "pdf",
        }
    }

    /// Map an upload extension (case-insensitive, no dot) to a format.
    pub fn from_extension(ext: &str) -> Result<Self> {
        let ext = ext.trim_start_matches('.').to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|f| f.extension() == ext)
            .ok_or_else(|| {
                Error::UnsupportedFormat(format!(
                    "'.{ext}' files are not supported; only txt, pdf and csv are accepted"
                ))
            })
    }

    /// Map a filename to a format by its last extension.
    pub fn from_filename(name: &str) -> Result<Self> {
        match name.rsplit_once('.') {
            Some((_, ext)) => Self::from_extension(ext),
            None => Err(Error::UnsupportedFormat(format!(
                "'{name}' has no file extension; only txt, pdf and csv are accepted"
            ))),
        }
    }
}

impl fmt::Display for FormatTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for FormatTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|f| f.as_str() == s)
            .ok_or_else(|| Error::UnsupportedFormat(format!("unknown format tag '{s}'")))
    }
}

/// Metadata carried by a document and copied onto each of its chunks.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMetadata {
    pub repository_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_name: Option<String>,
    /// Where the document came from, typically the uploaded filename.
    #[serde(default)]
    pub source_name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra: BTreeMap<String, String>,
}

impl DocumentMetadata {
    pub fn new(repository_id: impl Into<String>, source_name: impl Into<String>) -> Self {
        Self {
            repository_id: repository_id.into(),
            source_name: source_name.into(),
            ..Default::default()
        }
    }

    pub fn with_user(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = user_id.into();
        self
    }

    pub fn with_repository_name(mut self, name: impl Into<String>) -> Self {
        self.repository_name = Some(name.into());
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }
}

/// A document submitted for ingestion. Consumed by the pipeline, never stored.
#[derive(Debug, Clone)]
pub struct Document {
    pub content: Vec<u8>,
    pub format: FormatTag,
    pub metadata: DocumentMetadata,
}

impl Document {
    pub fn new(content: impl Into<Vec<u8>>, format: FormatTag, metadata: DocumentMetadata) -> Self {
        Self {
            content: content.into(),
            format,
            metadata,
        }
    }

    pub fn repository_id(&self) -> &str {
        &self.metadata.repository_id
    }
}

/// A bounded text segment derived from a document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub text: String,
    /// Position within the source document.
    pub ordinal: usize,
    pub format: FormatTag,
    pub metadata: DocumentMetadata,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_tag_roundtrip_strings() {
        for tag in FormatTag::ALL {
            assert_eq!(tag.as_str().parse::<FormatTag>().unwrap(), tag);
        }
        assert_eq!(
            serde_json::to_string(&FormatTag::PaginatedDocument).unwrap(),
            "\"paginated-document\""
        );
    }

    #[test]
    fn test_unknown_tag_is_unsupported() {
        let err = "spreadsheet".parse::<FormatTag>().unwrap_err();
        assert!(matches!(err, Error::UnsupportedFormat(_)));
    }

    #[test]
    fn test_from_filename() {
        assert_eq!(FormatTag::from_filename("notes.TXT").unwrap(), FormatTag::PlainText);
        assert_eq!(FormatTag::from_filename("data.v2.csv").unwrap(), FormatTag::Tabular);
        assert_eq!(
            FormatTag::from_filename("paper.pdf").unwrap(),
            FormatTag::PaginatedDocument
        );
        assert!(matches!(
            FormatTag::from_filename("report.docx"),
            Err(Error::UnsupportedFormat(_))
        ));
        assert!(matches!(
            FormatTag::from_filename("README"),
            Err(Error::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_metadata_serialization_skips_empty() {
        let meta = DocumentMetadata::new("repo_1", "a.txt").with_user("u1");
        let json = serde_json::to_value(&meta).unwrap();
        assert_eq!(json["repository_id"], "repo_1");
        assert!(json.get("extra").is_none());
        assert!(json.get("repository_name").is_none());

        let back: DocumentMetadata = serde_json::from_value(json).unwrap();
        assert_eq!(back, meta);
    }
}
