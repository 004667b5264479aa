//! Chat types matching the HTTP API surface.

use serde::{Deserialize, Serialize};

/// LLM provider identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LLMProvider {
    Gemini,
    OpenAI,
    Anthropic,
    Groq,
}

impl LLMProvider {
    /// Streaming chat endpoint. Everything except Anthropic speaks the
    /// OpenAI chat-completions dialect.
    pub fn endpoint(&self) -> &'static str {
        match self {
            LLMProvider::Gemini => {
                "https://generativelanguage.googleapis.com/v1beta/openai/chat/completions"
            }
            LLMProvider::OpenAI => "https://api.openai.com/v1/chat/completions",
            LLMProvider::Anthropic => "https://api.anthropic.com/v1/messages",
            LLMProvider::Groq => "https://api.groq.com/openai/v1/chat/completions",
        }
    }
}

impl std::fmt::Display for LLMProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LLMProvider::Gemini => write!(f, "gemini"),
            LLMProvider::OpenAI => write!(f, "openai"),
            LLMProvider::Anthropic => write!(f, "anthropic"),
            LLMProvider::Groq => write!(f, "groq"),
        }
    }
}

/// One message of a chat-completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".into(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".into(),
            content: content.into(),
        }
    }
}

/// Incoming chat request.
#[derive(Debug, Clone, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub user_id: String,
    pub query: String,
    #[serde(default)]
    pub repo_ids: Vec<String>,
    /// Display names paired positionally with `repo_ids`.
    #[serde(default)]
    pub repo_names: Vec<String>,
}

/// Chat response: the answer plus the repositories that contributed context.
#[derive(Debug, Clone, Serialize)]
pub struct ChatResponse {
    pub response: String,
    pub response_repo_ids: Vec<String>,
    pub response_repo_names: Vec<String>,
}

/// LLM status for the stats endpoint (keys never exposed).
#[derive(Debug, Clone, Serialize)]
pub struct LLMStatus {
    pub preferred_provider: String,
    pub active_provider: Option<String>,
    pub active_model: Option<String>,
    pub gemini_configured: bool,
    pub openai_configured: bool,
    pub anthropic_configured: bool,
    pub groq_configured: bool,
}
