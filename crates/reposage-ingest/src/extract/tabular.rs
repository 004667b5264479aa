//! Delimited (CSV) handler. Every row is content; there is no header row.
//! Rows are re-serialized as-is, blank fields included; the registry
//! applies the blank-text check to the joined result.

use super::FormatHandler;
use reposage_core::{Error, FormatTag, Result};

pub struct TabularHandler;

impl FormatHandler for TabularHandler {
    fn format(&self) -> FormatTag {
        FormatTag::Tabular
    }

    fn extract(&self, bytes: &[u8]) -> Result<String> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(bytes);

        let mut lines = Vec::new();
        for record in reader.records() {
            let record = record.map_err(|e| Error::Decode(format!("invalid CSV: {e}")))?;
            lines.push(record.iter().collect::<Vec<_>>().join(","));
        }

        if lines.is_empty() {
            return Err(Error::EmptyContent("CSV file has no rows".into()));
        }
        Ok(lines.join("\n"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_become_lines() {
        let csv = b"name,team\nada,platform\ngrace,compilers\n";
        let text = TabularHandler.extract(csv).unwrap();
        assert_eq!(text, "name,team\nada,platform\ngrace,compilers");
    }

    #[test]
    fn test_quoted_fields_are_unwrapped() {
        let csv = b"\"Smith, J\",42\n";
        assert_eq!(TabularHandler.extract(csv).unwrap(), "Smith, J,42");
    }

    #[test]
    fn test_ragged_rows_and_blank_fields_kept() {
        let csv = b"a,b,c\n,,\nd\n";
        assert_eq!(TabularHandler.extract(csv).unwrap(), "a,b,c\n,,\nd");
    }

    #[test]
    fn test_rows_of_blank_fields_are_still_serialized() {
        assert_eq!(TabularHandler.extract(b" , \n,\n").unwrap(), " , \n,");
    }

    #[test]
    fn test_no_rows_is_empty_content() {
        assert!(matches!(TabularHandler.extract(b""), Err(Error::EmptyContent(_))));
    }

    #[test]
    fn test_invalid_utf8_is_decode_error() {
        assert!(matches!(
            TabularHandler.extract(b"ok,\xff\xfe\n"),
            Err(Error::Decode(_))
        ));
    }
}
