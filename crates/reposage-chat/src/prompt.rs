//! Prompt construction for retrieval-augmented answers.

use crate::types::ChatMessage;

pub const NO_CONTEXT_ANSWER: &str =
    "I couldn't find relevant information in the selected repositories.";

const SYSTEM_PROMPT: &str = "You answer questions using only the document excerpts \
provided as context. Cite facts as they appear in the excerpts and do not invent details. \
If the context does not contain the answer, reply exactly: ";

/// System and user messages for `query` grounded on `context`.
pub fn build_messages(query: &str, context: &str) -> Vec<ChatMessage> {
    let context = if context.trim().is_empty() {
        "(no excerpts were retrieved)"
    } else {
        context
    };

    vec![
        ChatMessage::system(format!("{SYSTEM_PROMPT}\"{NO_CONTEXT_ANSWER}\"")),
        ChatMessage::user(format!(
            "Context:\n{context}\n\nQuestion: {}",
            query.trim()
        )),
    ]
}
