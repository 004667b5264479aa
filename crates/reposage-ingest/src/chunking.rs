//! Recursive text chunking with overlap.
//!
//! Text is first cut into atoms on the highest-priority separator present,
//! recursing into oversize atoms with the remaining separators and falling
//! back to single characters. Atoms are then merged greedily into chunks of
//! at most `max_size` chars, each chunk restarting with up to `overlap` chars
//! of the previous one. Separators stay attached to the atom they end, so
//! every chunk is an exact slice of the input.

use std::collections::VecDeque;

use reposage_core::{ChunkingConfig, Error, Result};

/// A flat text chunk with position metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextChunk {
    pub text: String,
    pub chunk_index: usize,
    pub total_chunks: usize,
    /// Byte span of `text` in the source.
    pub start_byte: usize,
    pub end_byte: usize,
}

/// Contiguous byte range of the source with its length in chars.
#[derive(Debug, Clone, Copy)]
struct Atom {
    start: usize,
    end: usize,
    chars: usize,
}

/// Recursive chunker that respects document structure.
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    max_size: usize,
    overlap: usize,
    separators: Vec<String>,
}

impl RecursiveChunker {
    /// Chunker with the default separator priority.
    pub fn new(max_size: usize, overlap: usize) -> Result<Self> {
        Self::from_config(&ChunkingConfig {
            max_size,
            overlap,
            ..ChunkingConfig::default()
        })
    }

    pub fn from_config(config: &ChunkingConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            max_size: config.max_size,
            overlap: config.overlap,
            separators: config.separators.clone(),
        })
    }

    pub fn max_size(&self) -> usize {
        self.max_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    /// Split text into chunk strings.
    pub fn split(&self, text: &str) -> Result<Vec<String>> {
        Ok(self.chunk(text)?.into_iter().map(|c| c.text).collect())
    }

    /// Split text into chunks with their positions in the source.
    pub fn chunk(&self, text: &str) -> Result<Vec<TextChunk>> {
        if text.trim().is_empty() {
            return Err(Error::EmptyContent("no text to chunk".into()));
        }

        let mut atoms = Vec::new();
        self.atomize(text, 0, &self.separators, &mut atoms);

        let spans: Vec<(usize, usize)> = self
            .merge(&atoms)
            .into_iter()
            .filter(|&(start, end)| !text[start..end].trim().is_empty())
            .collect();

        let total_chunks = spans.len();
        Ok(spans
            .into_iter()
            .enumerate()
            .map(|(chunk_index, (start, end))| TextChunk {
                text: text[start..end].to_string(),
                chunk_index,
                total_chunks,
                start_byte: start,
                end_byte: end,
            })
            .collect())
    }

    fn atomize(&self, text: &str, offset: usize, separators: &[String], out: &mut Vec<Atom>) {
        let chars = text.chars().count();
        if chars <= self.max_size {
            out.push(Atom {
                start: offset,
                end: offset + text.len(),
                chars,
            });
            return;
        }

        let applicable = separators
            .iter()
            .position(|sep| sep.is_empty() || text.contains(sep.as_str()));

        match applicable {
            Some(i) if !separators[i].is_empty() => {
                let mut start = offset;
                for part in text.split_inclusive(separators[i].as_str()) {
                    self.atomize(part, start, &separators[i + 1..], out);
                    start += part.len();
                }
            }
            _ => {
                out.extend(text.char_indices().map(|(i, ch)| Atom {
                    start: offset + i,
                    end: offset + i + ch.len_utf8(),
                    chars: 1,
                }));
            }
        }
    }

    fn merge(&self, atoms: &[Atom]) -> Vec<(usize, usize)> {
        let mut spans = Vec::new();
        let mut window: VecDeque<Atom> = VecDeque::new();
        let mut total = 0usize;

        for atom in atoms {
            if total + atom.chars > self.max_size && !window.is_empty() {
                spans.push(span(&window));
                // Keep at most `overlap` chars, and room for the next atom.
                while total > self.overlap || (total > 0 && total + atom.chars > self.max_size) {
                    match window.pop_front() {
                        Some(dropped) => total -= dropped.chars,
                        None => break,
                    }
                }
            }
            window.push_back(*atom);
            total += atom.chars;
        }

        if !window.is_empty() {
            spans.push(span(&window));
        }
        spans
    }
}

fn span(window: &VecDeque<Atom>) -> (usize, usize) {
    match (window.front(), window.back()) {
        (Some(first), Some(last)) => (first.start, last.end),
        _ => (0, 0),
    }
}

/// Split `text` with an explicit size, overlap and separator priority.
pub fn split(text: &str, max_size: usize, overlap: usize, separators: &[&str]) -> Result<Vec<String>> {
    RecursiveChunker::from_config(&ChunkingConfig {
        max_size,
        overlap,
        separators: separators.iter().map(|s| s.to_string()).collect(),
    })?
    .split(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_chunker() -> RecursiveChunker {
        RecursiveChunker::from_config(&ChunkingConfig::default()).unwrap()
    }

    #[test]
    fn test_short_text_is_one_chunk() {
        let chunks = default_chunker().chunk("Hello, world!").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "Hello, world!");
        assert_eq!(chunks[0].total_chunks, 1);
    }

    #[test]
    fn test_unbroken_text_falls_back_to_characters() {
        let text = "abcdefghij".repeat(200);
        let chunks = default_chunker().chunk(&text).unwrap();

        let spans: Vec<(usize, usize)> = chunks.iter().map(|c| (c.start_byte, c.end_byte)).collect();
        assert_eq!(spans, vec![(0, 800), (650, 1450), (1300, 2000)]);
    }

    #[test]
    fn test_separator_stays_attached() {
        let chunks = split("alpha\n\nbeta", 8, 0, &["\n\n", ""]).unwrap();
        assert_eq!(chunks, vec!["alpha\n\n".to_string(), "beta".to_string()]);
    }

    #[test]
    fn test_paragraphs_bounded_overlapping_and_covering() {
        let paragraph = "The quarterly report covers revenue, churn and hiring. ".repeat(6);
        let text = vec![paragraph.trim_end(); 12].join("\n\n");
        let chunker = default_chunker();
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() > 1);
        assert_eq!(chunks[0].start_byte, 0);
        assert_eq!(chunks.last().unwrap().end_byte, text.len());
        for c in &chunks {
            assert!(c.text.chars().count() <= chunker.max_size());
            assert_eq!(c.text, &text[c.start_byte..c.end_byte]);
        }
        for pair in chunks.windows(2) {
            assert!(pair[1].start_byte > pair[0].start_byte);
            assert!(pair[1].start_byte <= pair[0].end_byte);
            let shared = text[pair[1].start_byte..pair[0].end_byte].chars().count();
            assert!(shared <= chunker.overlap());
        }
    }

    #[test]
    fn test_multibyte_text_never_split_mid_char() {
        let text = "日本語のテキスト。".repeat(30);
        let chunker = RecursiveChunker::new(10, 3).unwrap();
        let chunks = chunker.chunk(&text).unwrap();

        assert!(chunks.len() > 1);
        for c in &chunks {
            assert!(c.text.chars().count() <= 10);
            assert!(text.is_char_boundary(c.start_byte));
            assert!(text.is_char_boundary(c.end_byte));
        }
    }

    #[test]
    fn test_deterministic() {
        let text = "Line one.\nLine two is longer. It has sentences.\n\nNew paragraph here.".repeat(40);
        let chunker = RecursiveChunker::new(120, 30).unwrap();
        assert_eq!(chunker.chunk(&text).unwrap(), chunker.chunk(&text).unwrap());
    }

    #[test]
    fn test_blank_input_is_error() {
        assert!(matches!(default_chunker().chunk(""), Err(Error::EmptyContent(_))));
        assert!(matches!(default_chunker().chunk(" \n\t "), Err(Error::EmptyContent(_))));
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(RecursiveChunker::new(0, 0), Err(Error::Config(_))));
        assert!(matches!(RecursiveChunker::new(100, 100), Err(Error::Config(_))));
    }
}
