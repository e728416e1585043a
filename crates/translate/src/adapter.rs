//! Bridges the streaming `TranslationBackend` implementations to the
//! `classbridge_core::Translator`/`Summarizer` contracts the pipeline depends
//! on, selecting a model tier by request priority.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio::sync::mpsc;

use classbridge_config::TranslatorConfig;
use classbridge_core::{Error as CoreError, Priority, Summarizer, TranslationChunk, TranslationCompletion, Translator, VocabularyExtractor, VocabularyItem};

use crate::backend::{BackendConfig, SseBackend, StreamingStyle, TranslationBackend};
use crate::error::TranslationError;

const TRANSLATE_SYSTEM_PROMPT: &str = "Translate the given text. Output only the translation, with no commentary, preamble, or quotation marks.";
const SUMMARY_SYSTEM_PROMPT: &str =
    "Continue a running summary of a lecture given the prior source and summary text and newly transcribed source text. \
     Output only the appended summary continuation.";
const VOCABULARY_SYSTEM_PROMPT: &str = "Extract up to 10 key technical terms from the given lecture transcript. \
     Output only a JSON array of objects shaped {\"term\": string, \"definition\": string}, no commentary.";

/// Backoff schedule for retrying a retryable (429/5xx) backend failure
/// before falling back to an error/placeholder.
const RETRY_BACKOFF_MS: [u64; 2] = [250, 500];

#[derive(serde::Deserialize)]
struct VocabularyItemWire {
    term: String,
    definition: String,
}

pub struct TranslatorAdapter {
    backend: Arc<dyn TranslationBackend>,
    nano_model: String,
    mini_model: String,
    summary_model: String,
}

impl TranslatorAdapter {
    pub fn new(config: &TranslatorConfig, api_key: Option<String>) -> Result<Self, TranslationError> {
        let backend_config = BackendConfig {
            endpoint: config.endpoint.clone(),
            api_key,
            style: StreamingStyle::Sse,
            timeout: Duration::from_millis(config.timeout_max_ms),
        };
        let backend = Arc::new(SseBackend::new(backend_config)?);
        Ok(Self {
            backend,
            nano_model: config.nano_model.clone(),
            mini_model: config.mini_model.clone(),
            summary_model: config.summary_model.clone(),
        })
    }

    fn model_for(&self, priority: Priority) -> &str {
        match priority {
            Priority::Realtime => &self.nano_model,
            Priority::History => &self.mini_model,
        }
    }

    /// Opens a backend stream, retrying a retryable (429/5xx) failure with a
    /// 250ms/500ms backoff before giving up.
    async fn open_stream_with_retry(
        &self,
        system_prompt: &str,
        user_text: &str,
        model: &str,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, TranslationError>>, TranslationError> {
        let mut attempt = 0;
        loop {
            match self.backend.stream(system_prompt, user_text, model).await {
                Ok(stream) => return Ok(stream),
                Err(e) if e.is_retryable() && attempt < RETRY_BACKOFF_MS.len() => {
                    tokio::time::sleep(Duration::from_millis(RETRY_BACKOFF_MS[attempt])).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[async_trait]
impl Translator for TranslatorAdapter {
    async fn translate(&self, source_text: &str, priority: Priority) -> Result<TranslationCompletion, CoreError> {
        let mut stream = self
            .open_stream_with_retry(TRANSLATE_SYSTEM_PROMPT, source_text, self.model_for(priority))
            .await
            .map_err(CoreError::from)?;

        let mut translated_text = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CoreError::from)?;
            translated_text.push_str(&chunk.text_delta);
        }
        if translated_text.is_empty() {
            return Err(CoreError::Format("translator returned empty text".into()));
        }
        Ok(TranslationCompletion { translated_text })
    }

    async fn translate_stream(
        &self,
        source_text: &str,
        priority: Priority,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, CoreError>>, CoreError> {
        let mut upstream = self
            .open_stream_with_retry(TRANSLATE_SYSTEM_PROMPT, source_text, self.model_for(priority))
            .await
            .map_err(CoreError::from)?;

        let (tx, rx) = mpsc::channel(32);
        tokio::spawn(async move {
            while let Some(chunk) = upstream.next().await {
                let mapped = chunk.map_err(CoreError::from);
                if tx.send(mapped).await.is_err() {
                    return;
                }
            }
        });

        Ok(Box::pin(tokio_stream::wrappers::ReceiverStream::new(rx)))
    }
}

#[async_trait]
impl Summarizer for TranslatorAdapter {
    async fn summarize(&self, source_text_so_far: &str, target_text_so_far: &str, new_source_text: &str) -> Result<String, CoreError> {
        let prompt = format!(
            "Prior source:\n{source_text_so_far}\n\nPrior summary:\n{target_text_so_far}\n\nNew source:\n{new_source_text}"
        );
        let mut stream = self
            .backend
            .stream(SUMMARY_SYSTEM_PROMPT, &prompt, &self.summary_model)
            .await
            .map_err(CoreError::from)?;

        let mut summary = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CoreError::from)?;
            summary.push_str(&chunk.text_delta);
        }
        Ok(summary)
    }
}

#[async_trait]
impl VocabularyExtractor for TranslatorAdapter {
    async fn extract(&self, source_text: &str) -> Result<Vec<VocabularyItem>, CoreError> {
        let mut stream = self
            .backend
            .stream(VOCABULARY_SYSTEM_PROMPT, source_text, &self.summary_model)
            .await
            .map_err(CoreError::from)?;

        let mut raw = String::new();
        while let Some(chunk) = stream.next().await {
            let chunk = chunk.map_err(CoreError::from)?;
            raw.push_str(&chunk.text_delta);
        }

        let parsed: Vec<VocabularyItemWire> = serde_json::from_str(raw.trim())
            .map_err(|e| CoreError::Format(format!("vocabulary response was not the expected JSON array: {e}")))?;
        Ok(parsed.into_iter().map(|w| VocabularyItem { term: w.term, definition: w.definition }).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn model_selection_follows_priority() {
        let config = TranslatorConfig {
            endpoint: "https://translate.example.invalid/v1/chat/completions".into(),
            api_key_env: "X".into(),
            nano_model: "nano".into(),
            mini_model: "mini".into(),
            summary_model: "summary".into(),
            concurrency_cap: 3,
            queue_max_realtime: 64,
            queue_max_history: 128,
            timeout_ms: 7000,
            timeout_max_ms: 10000,
        };
        let adapter = TranslatorAdapter::new(&config, None).unwrap();
        assert_eq!(adapter.model_for(Priority::Realtime), "nano");
        assert_eq!(adapter.model_for(Priority::History), "mini");
    }
}
