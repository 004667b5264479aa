//! External LLM provider streaming implementations.
//!
//! Each provider streams tokens via SSE. Gemini, OpenAI and Groq share the
//! OpenAI chat-completions format; Anthropic uses its own event stream.

use std::pin::Pin;

use futures::Stream;
use reqwest::Client;
use serde_json::{json, Value};
use tokio_stream::StreamExt;
use tracing::{debug, error};

use crate::types::{ChatMessage, LLMProvider};

/// Boxed stream type for returning different stream implementations.
pub type BoxedStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// A single streamed token or error.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    Token(String),
    Done { tokens_used: usize },
    Error(String),
}

/// What one SSE `data:` payload means to the stream.
#[derive(Debug, PartialEq)]
enum SseEvent {
    Token(String),
    Done,
    Error(String),
    Ignore,
}

/// Stream tokens from the given provider.
pub fn stream_llm(
    client: &Client,
    provider: LLMProvider,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> BoxedStream {
    let request = match provider {
        LLMProvider::Anthropic => anthropic_request(client, messages, model, api_key, temperature, max_tokens),
        _ => openai_compat_request(client, provider, messages, model, api_key, temperature, max_tokens),
    };
    debug!("Streaming from {} with model {}", provider, model);

    let parse: fn(&str) -> SseEvent = match provider {
        LLMProvider::Anthropic => parse_anthropic_data,
        _ => parse_openai_data,
    };
    Box::pin(sse_stream(request, parse))
}

fn openai_compat_request(
    client: &Client,
    provider: LLMProvider,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> reqwest::RequestBuilder {
    let msgs: Vec<Value> = messages
        .iter()
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    client
        .post(provider.endpoint())
        .header("Authorization", format!("Bearer {}", api_key))
        .header("Content-Type", "application/json")
        .json(&json!({
            "model": model,
            "messages": msgs,
            "temperature": temperature,
            "max_tokens": max_tokens,
            "stream": true,
        }))
}

fn anthropic_request(
    client: &Client,
    messages: Vec<ChatMessage>,
    model: &str,
    api_key: &str,
    temperature: f64,
    max_tokens: usize,
) -> reqwest::RequestBuilder {
    // Separate system message from conversation
    let system_msg: Option<String> = messages
        .iter()
        .find(|m| m.role == "system")
        .map(|m| m.content.clone());

    let conv_msgs: Vec<Value> = messages
        .iter()
        .filter(|m| m.role != "system")
        .map(|m| json!({"role": m.role, "content": m.content}))
        .collect();

    let mut body = json!({
        "model": model,
        "messages": conv_msgs,
        "temperature": temperature,
        "max_tokens": max_tokens,
        "stream": true,
    });
    if let Some(sys) = system_msg {
        body["system"] = json!(sys);
    }

    client
        .post(LLMProvider::Anthropic.endpoint())
        .header("x-api-key", api_key)
        .header("anthropic-version", "2023-06-01")
        .header("Content-Type", "application/json")
        .json(&body)
}

/// Send the request and turn its SSE body into `StreamChunk`s.
fn sse_stream(
    request: reqwest::RequestBuilder,
    parse: fn(&str) -> SseEvent,
) -> impl Stream<Item = StreamChunk> + Send + 'static {
    async_stream::stream! {
        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                yield StreamChunk::Error(format!("Request failed: {}", e));
                return;
            }
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            yield StreamChunk::Error(format!("API error {}: {}", status, body));
            return;
        }

        let mut stream = response.bytes_stream();
        let mut buffer = String::new();
        let mut token_count = 0usize;

        while let Some(chunk) = stream.next().await {
            let bytes = match chunk {
                Ok(b) => b,
                Err(e) => {
                    yield StreamChunk::Error(format!("Stream read error: {}", e));
                    return;
                }
            };
            buffer.push_str(&String::from_utf8_lossy(&bytes));

            for data in drain_data_lines(&mut buffer) {
                match parse(&data) {
                    SseEvent::Token(text) => {
                        token_count += 1;
                        yield StreamChunk::Token(text);
                    }
                    SseEvent::Done => {
                        yield StreamChunk::Done { tokens_used: token_count };
                        return;
                    }
                    SseEvent::Error(msg) => {
                        error!("LLM stream error: {}", msg);
                        yield StreamChunk::Error(msg);
                        return;
                    }
                    SseEvent::Ignore => {}
                }
            }
        }

        yield StreamChunk::Done { tokens_used: token_count };
    }
}

/// Remove every complete line from `buffer`, returning the `data:` payloads.
/// A trailing partial line stays buffered.
fn drain_data_lines(buffer: &mut String) -> Vec<String> {
    let mut payloads = Vec::new();
    while let Some(line_end) = buffer.find('\n') {
        let line: String = buffer.drain(..=line_end).collect();
        let line = line.trim();
        if line.is_empty() || line.starts_with(':') {
            continue;
        }
        if let Some(data) = line.strip_prefix("data:") {
            payloads.push(data.trim_start().to_string());
        }
    }
    payloads
}

fn parse_openai_data(data: &str) -> SseEvent {
    if data.trim() == "[DONE]" {
        return SseEvent::Done;
    }
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Ignore;
    };
    if let Some(msg) = parsed["error"]["message"].as_str() {
        return SseEvent::Error(msg.to_string());
    }
    match parsed["choices"][0]["delta"]["content"].as_str() {
        Some(content) if !content.is_empty() => SseEvent::Token(content.to_string()),
        _ => SseEvent::Ignore,
    }
}

fn parse_anthropic_data(data: &str) -> SseEvent {
    let Ok(parsed) = serde_json::from_str::<Value>(data) else {
        return SseEvent::Ignore;
    };
    match parsed["type"].as_str() {
        Some("content_block_delta") => match parsed["delta"]["text"].as_str() {
            Some(text) if !text.is_empty() => SseEvent::Token(text.to_string()),
            _ => SseEvent::Ignore,
        },
        Some("message_stop") => SseEvent::Done,
        Some("error") => SseEvent::Error(
            parsed["error"]["message"]
                .as_str()
                .unwrap_or("Unknown error")
                .to_string(),
        ),
        _ => SseEvent::Ignore,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_drain_keeps_partial_line() {
        let mut buffer = String::from(": keep-alive\ndata: {\"a\":1}\n\nevent: ping\ndata: {\"b\"");
        let payloads = drain_data_lines(&mut buffer);
        assert_eq!(payloads, vec!["{\"a\":1}".to_string()]);
        assert_eq!(buffer, "data: {\"b\"");

        buffer.push_str(":2}\n");
        assert_eq!(drain_data_lines(&mut buffer), vec!["{\"b\":2}".to_string()]);
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_openai_deltas() {
        assert_eq!(
            parse_openai_data(r#"{"choices":[{"delta":{"content":"Hel"}}]}"#),
            SseEvent::Token("Hel".into())
        );
        assert_eq!(
            parse_openai_data(r#"{"choices":[{"delta":{"role":"assistant"}}]}"#),
            SseEvent::Ignore
        );
        assert_eq!(parse_openai_data("[DONE]"), SseEvent::Done);
        assert_eq!(
            parse_openai_data(r#"{"error":{"message":"quota exceeded"}}"#),
            SseEvent::Error("quota exceeded".into())
        );
    }

    #[test]
    fn test_anthropic_events() {
        assert_eq!(
            parse_anthropic_data(r#"{"type":"content_block_delta","delta":{"type":"text_delta","text":"Hi"}}"#),
            SseEvent::Token("Hi".into())
        );
        assert_eq!(parse_anthropic_data(r#"{"type":"message_start"}"#), SseEvent::Ignore);
        assert_eq!(parse_anthropic_data(r#"{"type":"message_stop"}"#), SseEvent::Done);
        assert_eq!(
            parse_anthropic_data(r#"{"type":"error","error":{"message":"overloaded"}}"#),
            SseEvent::Error("overloaded".into())
        );
    }
}
