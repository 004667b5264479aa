//! Format handlers: raw upload bytes → one UTF-8 text blob.
//!
//! Each supported `FormatTag` has a `FormatHandler`; the `ExtractorRegistry`
//! dispatches on the tag and applies the blank-content check uniformly.

pub mod paginated;
pub mod tabular;
pub mod text;

use std::collections::HashMap;

use reposage_core::{Error, FormatTag, Result};

pub use paginated::PaginatedHandler;
pub use tabular::TabularHandler;
pub use text::PlainTextHandler;

/// Converts the bytes of one document format into text.
///
/// Implementations are pure: no I/O beyond the given buffer.
pub trait FormatHandler: Send + Sync {
    fn format(&self) -> FormatTag;

    fn extract(&self, bytes: &[u8]) -> Result<String>;
}

/// Format tag → handler.
pub struct ExtractorRegistry {
    handlers: HashMap<FormatTag, Box<dyn FormatHandler>>,
}

impl ExtractorRegistry {
    /// Registry with no handlers.
    pub fn empty() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Registry with plain-text, tabular and paginated handlers.
    pub fn with_defaults() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(PlainTextHandler));
        registry.register(Box::new(TabularHandler));
        registry.register(Box::new(PaginatedHandler));
        registry
    }

    /// Register a handler, replacing any previous one for its format.
    pub fn register(&mut self, handler: Box<dyn FormatHandler>) -> Option<Box<dyn FormatHandler>> {
        self.handlers.insert(handler.format(), handler)
    }

    pub fn supports(&self, format: FormatTag) -> bool {
        self.handlers.contains_key(&format)
    }

    /// Supported formats in canonical order.
    pub fn formats(&self) -> Vec<FormatTag> {
        let mut formats: Vec<FormatTag> = self.handlers.keys().copied().collect();
        formats.sort();
        formats
    }

    pub fn extract(&self, format: FormatTag, bytes: &[u8]) -> Result<String> {
        let handler = self.handlers.get(&format).ok_or_else(|| {
            Error::UnsupportedFormat(format!("no handler registered for {format}"))
        })?;

        let text = handler.extract(bytes)?;
        if text.trim().is_empty() {
            return Err(Error::EmptyContent(format!("{format} document has no text")));
        }
        Ok(text)
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
