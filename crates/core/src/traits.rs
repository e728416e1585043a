//! Capability-set traits implemented by the ASR, translation, and summary
//! backends, so the pipeline crate depends only on these contracts rather
//! than on concrete provider code.

use async_trait::async_trait;
use futures::stream::BoxStream;

use crate::error::Error;
use crate::model::{Priority, Segment};

/// A streamed ASR connection: frames in, segments out.
#[async_trait]
pub trait AsrSink: Send + Sync {
    /// Sends one audio frame. Errors are transient unless the connection is
    /// unrecoverable (mapped to `ErrorKind::Transient`).
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), Error>;

    /// The next segment update, or `None` once the stream has closed.
    async fn next_segment(&mut self) -> Option<Result<Segment, Error>>;

    async fn close(&mut self) -> Result<(), Error>;
}

/// One chunk of a streaming translation.
#[derive(Debug, Clone)]
pub struct TranslationChunk {
    pub text_delta: String,
    pub is_final: bool,
}

/// The result of a completed (non-streaming) translation call.
#[derive(Debug, Clone)]
pub struct TranslationCompletion {
    pub translated_text: String,
}

/// A text translation backend, used for both realtime and history-priority
/// requests. Implementors decide internally whether to stream.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translates `source_text`, returning the final text. Used for
    /// history-priority and paragraph/summary work where only the
    /// completed translation matters.
    async fn translate(&self, source_text: &str, priority: Priority) -> Result<TranslationCompletion, Error>;

    /// Translates `source_text` as a stream of incremental chunks. Used for
    /// realtime-priority segments so the first paint can happen before the
    /// full translation completes. The default implementation falls back to
    /// a single completed chunk.
    async fn translate_stream(
        &self,
        source_text: &str,
        priority: Priority,
    ) -> Result<BoxStream<'static, Result<TranslationChunk, Error>>, Error> {
        let completion = self.translate(source_text, priority).await?;
        Ok(Box::pin(futures::stream::once(async move {
            Ok(TranslationChunk {
                text_delta: completion.translated_text,
                is_final: true,
            })
        })))
    }
}

/// A progressive-summary backend: full transcript-so-far in, a summary
/// continuation out.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, source_text_so_far: &str, target_text_so_far: &str, new_source_text: &str) -> Result<String, Error>;
}

/// A sink for pipeline events (the WebSocket layer implements this to fan
/// events out to clients; tests implement it to assert on emitted events).
#[async_trait]
pub trait EventSink: Send + Sync {
    async fn emit(&self, event: crate::event::PipelineEvent);
}

/// Extracts key terms and definitions from accumulated source text, backing
/// the `generateVocabulary` command.
#[async_trait]
pub trait VocabularyExtractor: Send + Sync {
    async fn extract(&self, source_text: &str) -> Result<Vec<crate::model::VocabularyItem>, Error>;
}
