//! Answer generation seam and its LLM-backed implementation.

use async_trait::async_trait;
use reqwest::Client;
use tokio_stream::StreamExt;
use tracing::{debug, info};

use crate::config::LLMConfig;
use crate::prompt::build_messages;
use crate::providers::{stream_llm, StreamChunk};
use reposage_core::{Error, Result};

/// Produces a free-text answer from a query and its assembled context.
///
/// Called even when the context is empty.
#[async_trait]
pub trait AnswerGenerator: Send + Sync {
    async fn generate(&self, query: &str, context: &str) -> Result<String>;

    fn name(&self) -> &str;
}

/// Streams an answer from the configured external provider and collects it.
pub struct LlmAnswerGenerator {
    client: Client,
    config: LLMConfig,
}

impl LlmAnswerGenerator {
    pub fn new(config: LLMConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    pub fn config(&self) -> &LLMConfig {
        &self.config
    }
}

#[async_trait]
impl AnswerGenerator for LlmAnswerGenerator {
    async fn generate(&self, query: &str, context: &str) -> Result<String> {
        let (provider, model, api_key) = self.config.resolve_provider().ok_or_else(|| {
            Error::GenerationFailure(
                "no LLM provider configured; set GEMINI_API_KEY, ANTHROPIC_API_KEY, GROQ_API_KEY or OPENAI_API_KEY".into(),
            )
        })?;

        let mut stream = stream_llm(
            &self.client,
            provider,
            build_messages(query, context),
            &model,
            &api_key,
            self.config.temperature,
            self.config.max_tokens,
        );

        let mut answer = String::new();
        while let Some(chunk) = stream.next().await {
            match chunk {
                StreamChunk::Token(text) => answer.push_str(&text),
                StreamChunk::Done { tokens_used } => {
                    debug!("{} streamed {} deltas", provider, tokens_used);
                    break;
                }
                StreamChunk::Error(msg) => {
                    return Err(Error::GenerationFailure(format!("{provider}: {msg}")));
                }
            }
        }

        if answer.trim().is_empty() {
            return Err(Error::GenerationFailure(format!(
                "{provider} returned an empty answer"
            )));
        }
        info!("Generated {} chars with {} ({})", answer.len(), provider, model);
        Ok(answer)
    }

    fn name(&self) -> &str {
        "llm"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[tokio::test]
    async fn test_without_provider_is_generation_failure() {
        let config = LLMConfig::load_with(Path::new("/nonexistent/llm-config.json"), |_| None);
        let generator = LlmAnswerGenerator::new(config);
        let result = generator.generate("what?", "some context").await;
        assert!(matches!(result, Err(Error::GenerationFailure(_))));
    }
}
