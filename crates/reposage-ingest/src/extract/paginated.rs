//! Paginated document (PDF) handler, page by page via `lopdf`.

use tracing::debug;

use super::FormatHandler;
use reposage_core::{Error, FormatTag, Result};

pub struct PaginatedHandler;

impl FormatHandler for PaginatedHandler {
    fn format(&self) -> FormatTag {
        FormatTag::PaginatedDocument
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let document = lopdf::Document::load_mem(bytes)
            .map_err(|e| Error::Decode(format!("unreadable PDF: {e}")))?;

        let mut pages = Vec::new();
        for page_number in document.get_pages().into_keys() {
            match document.extract_text(&[page_number]) {
                Ok(text) if !text.trim().is_empty() => pages.push(text.trim().to_string()),
                Ok(_) => debug!("PDF page {} has no text", page_number),
                Err(e) => debug!("Skipping PDF page {}: {}", page_number, e),
            }
        }

        if pages.is_empty() {
            return Err(Error::EmptyContent("no page of the PDF yields text".into()));
        }
        Ok(pages.join("\n"))
    }
}
