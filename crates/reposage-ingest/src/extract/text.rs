//! Plain-text handler.

use super::FormatHandler;
use reposage_core::{Error, FormatTag, Result};

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

pub struct PlainTextHandler;

impl FormatHandler for PlainTextHandler {
    fn format(&self) -> FormatTag {
        FormatTag::PlainText
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let bytes = bytes.strip_prefix(UTF8_BOM).unwrap_or(bytes);
        String::from_utf8(bytes.to_vec())
            .map_err(|e| Error::Decode(format!("text file is not valid UTF-8: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_utf8() {
        let text = PlainTextHandler.extract("naïve café\nline two".as_bytes()).unwrap();
        assert_eq!(text, "naïve café\nline two");
    }

    #[test]
    fn test_strips_bom() {
        let text = PlainTextHandler.extract(b"\xEF\xBB\xBFhello").unwrap();
        assert_eq!(text, "hello");
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        assert!(matches!(
            PlainTextHandler.extract(&[0x66, 0x6f, 0xff, 0xfe]),
            Err(Error::Decode(_))
        ));
    }
}
