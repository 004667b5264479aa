//! RepoSage Chat: answer generation with external LLM streaming
//! (Gemini/Anthropic/Groq/OpenAI).
//!
//! LLM calls go to external APIs; no local model required.

pub mod config;
pub mod generator;
pub mod prompt;
pub mod providers;
pub mod types;

pub use config::LLMConfig;
pub use generator::{AnswerGenerator, LlmAnswerGenerator};
pub use types::*;
