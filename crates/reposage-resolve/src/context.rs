//! Context assembly: retrieved passages → one prompt-ready string.

use reposage_core::RetrievalConfig;

use crate::types::RetrievalResult;

/// Joins passages in emission order with a fixed separator.
///
/// With a character budget, whole passages are appended while they fit and
/// assembly stops at the first one that does not. Passages are never cut or
/// reordered.
#[derive(Debug, Clone)]
pub struct ContextAssembler {
    separator: String,
    max_chars: Option<usize>,
}

impl ContextAssembler {
    pub fn new(separator: impl Into<String>) -> Self {
        Self {
            separator: separator.into(),
            max_chars: None,
        }
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self {
            separator: config.context_separator.clone(),
            max_chars: config.max_context_chars,
        }
    }

    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = Some(max_chars);
        self
    }

    pub fn assemble(&self, result: &RetrievalResult) -> String {
        let Some(budget) = self.max_chars else {
            return result.passages().collect::<Vec<_>>().join(&self.separator);
        };

        let separator_chars = self.separator.chars().count();
        let mut context = String::new();
        let mut used = 0usize;
        for (i, passage) in result.passages().enumerate() {
            let cost = passage.chars().count() + if i == 0 { 0 } else { separator_chars };
            if used + cost > budget {
                break;
            }
            if i > 0 {
                context.push_str(&self.separator);
            }
            context.push_str(passage);
            used += cost;
        }
        context
    }
}

impl Default for ContextAssembler {
    fn default() -> Self {
        Self::new("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::RetrievedChunk;
    use reposage_core::{Chunk, DocumentMetadata, FormatTag};

    fn result(texts: &[&str]) -> RetrievalResult {
        RetrievalResult {
            chunks: texts
                .iter()
                .enumerate()
                .map(|(i, text)| RetrievedChunk {
                    repository_id: "repo_a".into(),
                    chunk: Chunk {
                        text: text.to_string(),
                        ordinal: i,
                        format: FormatTag::PlainText,
                        metadata: DocumentMetadata::new("repo_a", "a.txt"),
                    },
                    score: 1.0,
                })
                .collect(),
            contributing: vec!["repo_a".into()],
        }
    }

    #[test]
    fn test_joins_with_separator() {
        let context = ContextAssembler::default().assemble(&result(&["foo", "bar"]));
        assert_eq!(context, "foo\n\nbar");
    }

    #[test]
    fn test_empty_result_is_empty_string() {
        assert_eq!(ContextAssembler::default().assemble(&RetrievalResult::default()), "");
    }

    #[test]
    fn test_custom_separator() {
        let context = ContextAssembler::new("\n---\n").assemble(&result(&["a", "b", "c"]));
        assert_eq!(context, "a\n---\nb\n---\nc");
    }

    #[test]
    fn test_budget_keeps_whole_passages_in_order() {
        let assembler = ContextAssembler::default().with_max_chars(10);
        // "alpha" (5) + "\n\n" (2) + "beta" (4) = 11 > 10
        assert_eq!(assembler.assemble(&result(&["alpha", "beta", "z"])), "alpha");

        let roomy = ContextAssembler::default().with_max_chars(11);
        assert_eq!(roomy.assemble(&result(&["alpha", "beta"])), "alpha\n\nbeta");
    }

    #[test]
    fn test_first_passage_over_budget_gives_empty() {
        let assembler = ContextAssembler::default().with_max_chars(3);
        assert_eq!(assembler.assemble(&result(&["too long"])), "");
    }
}
