//! HTTP streaming backends for the translation provider: a newline-delimited
//! JSON style (Ollama-compatible) and a server-sent-events style
//! (OpenAI-compatible), selected by provider configuration and unified
//! behind one `TranslationBackend` trait.

use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use classbridge_core::TranslationChunk;

use crate::error::TranslationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamingStyle {
    /// Ollama-style: one JSON object per line, `{"message":{"content":"..."},"done":bool}`.
    Ndjson,
    /// OpenAI-style: SSE frames `data: {...}` terminated by `data: [DONE]`.
    Sse,
}

#[derive(Debug, Clone)]
pub struct BackendConfig {
    pub endpoint: String,
    pub api_key: Option<String>,
    pub style: StreamingStyle,
    pub timeout: Duration,
}

/// A single streamed translation call: system prompt, user text, model,
/// yielding incremental chunks terminated by a final chunk.
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    async fn stream(
        &self,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, TranslationError>>, TranslationError>;
}

fn chat_messages(system_prompt: &str, user_text: &str) -> Vec<ChatMessage> {
    vec![
        ChatMessage {
            role: "system".to_string(),
            content: system_prompt.to_string(),
        },
        ChatMessage {
            role: "user".to_string(),
            content: user_text.to_string(),
        },
    ]
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama-compatible NDJSON streaming backend.
pub struct NdjsonBackend {
    client: Client,
    config: BackendConfig,
}

impl NdjsonBackend {
    pub fn new(config: BackendConfig) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranslationError::BadRequest(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[derive(Debug, Serialize)]
struct NdjsonRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct NdjsonChunk {
    message: NdjsonMessage,
    done: bool,
}

#[derive(Debug, Deserialize)]
struct NdjsonMessage {
    content: String,
}

#[async_trait]
impl TranslationBackend for NdjsonBackend {
    async fn stream(
        &self,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, TranslationError>>, TranslationError> {
        let request = NdjsonRequest {
            model: model.to_string(),
            messages: chat_messages(system_prompt, user_text),
            stream: true,
        };

        let response = self
            .client
            .post(format!("{}/api/chat", self.config.endpoint))
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                TranslationError::Transient(format!("{status}: {body}"))
            } else if status.as_u16() == 401 {
                TranslationError::Auth
            } else {
                TranslationError::BadRequest(format!("{status}: {body}"))
            });
        }

        let mut byte_stream = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(TranslationError::from(e));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer = buffer[newline + 1..].to_string();
                    if line.is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<NdjsonChunk>(&line) {
                        Ok(parsed) => {
                            yield Ok(TranslationChunk {
                                text_delta: parsed.message.content,
                                is_final: parsed.done,
                            });
                            if parsed.done {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(TranslationError::Format(e.to_string()));
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

/// OpenAI-compatible SSE streaming backend.
pub struct SseBackend {
    client: Client,
    config: BackendConfig,
}

impl SseBackend {
    pub fn new(config: BackendConfig) -> Result<Self, TranslationError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TranslationError::BadRequest(e.to_string()))?;
        Ok(Self { client, config })
    }

    fn auth_header(&self) -> Option<(&'static str, String)> {
        self.config.api_key.as_ref().map(|key| ("Authorization", format!("Bearer {key}")))
    }
}

#[derive(Debug, Serialize)]
struct SseRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct SseChunk {
    choices: Vec<SseChoice>,
}

#[derive(Debug, Deserialize)]
struct SseChoice {
    delta: SseDelta,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct SseDelta {
    content: Option<String>,
}

#[async_trait]
impl TranslationBackend for SseBackend {
    async fn stream(
        &self,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, TranslationError>>, TranslationError> {
        let request = SseRequest {
            model: model.to_string(),
            messages: chat_messages(system_prompt, user_text),
            stream: true,
        };

        let mut builder = self.client.post(format!("{}/chat/completions", self.config.endpoint)).json(&request);
        if let Some((name, value)) = self.auth_header() {
            builder = builder.header(name, value);
        }
        let response = builder.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(if status.is_server_error() || status.as_u16() == 429 {
                TranslationError::Transient(format!("{status}: {body}"))
            } else if status.as_u16() == 401 {
                TranslationError::Auth
            } else {
                TranslationError::BadRequest(format!("{status}: {body}"))
            });
        }

        let mut byte_stream = response.bytes_stream();
        let stream = async_stream::stream! {
            let mut buffer = String::new();
            while let Some(chunk) = byte_stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        yield Err(TranslationError::from(e));
                        return;
                    }
                };
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(newline) = buffer.find('\n') {
                    let line = buffer[..newline].trim().to_string();
                    buffer = buffer[newline + 1..].to_string();
                    if line.is_empty() {
                        continue;
                    }
                    let Some(payload) = line.strip_prefix("data: ") else { continue };
                    if payload == "[DONE]" {
                        yield Ok(TranslationChunk { text_delta: String::new(), is_final: true });
                        return;
                    }
                    match serde_json::from_str::<SseChunk>(payload) {
                        Ok(parsed) => {
                            let Some(choice) = parsed.choices.into_iter().next() else { continue };
                            let is_final = choice.finish_reason.is_some();
                            if let Some(content) = choice.delta.content {
                                yield Ok(TranslationChunk { text_delta: content, is_final });
                            }
                            if is_final {
                                return;
                            }
                        }
                        Err(e) => {
                            yield Err(TranslationError::Format(e.to_string()));
                            return;
                        }
                    }
                }
            }
        };

        Ok(Box::pin(stream))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_config_carries_style() {
        let cfg = BackendConfig {
            endpoint: "http://localhost:11434".into(),
            api_key: None,
            style: StreamingStyle::Ndjson,
            timeout: Duration::from_secs(5),
        };
        assert_eq!(cfg.style, StreamingStyle::Ndjson);
    }

    #[test]
    fn chat_messages_include_system_and_user() {
        let msgs = chat_messages("translate en to hi", "hello");
        assert_eq!(msgs.len(), 2);
        assert_eq!(msgs[0].role, "system");
        assert_eq!(msgs[1].content, "hello");
    }
}
