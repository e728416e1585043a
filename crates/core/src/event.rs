//! The event envelope pushed out over the session WebSocket: one variant
//! per observable pipeline transition, wrapped with a correlation id and a
//! pipeline-relative timestamp.

use serde::{Deserialize, Serialize};

use crate::model::{CombinedSentence, DisplayPair, HistoryBlock, Segment, Summary, Translation, VocabularyItem};

/// Tagged union of everything the pipeline can push to a client.
///
/// Internally tagged on `type` so the wire shape matches the command
/// envelope's `type` discriminant.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PipelineEvent {
    /// An interim or final ASR segment update.
    Segment { segment: Segment },

    /// A realtime or history-priority translation update (possibly partial).
    Translation { translation: Translation },

    /// A sentence boundary was reached; segments were combined.
    CombinedSentence { sentence: CombinedSentence },

    /// The rolling three-line display's current window changed.
    Display { pairs: Vec<DisplayPairWire> },

    /// A history block was appended or had its translation upgraded in place.
    History { block: HistoryBlock, upgraded: bool },

    /// A progressive summary threshold was crossed.
    Summary { summary: Summary },

    /// The full set of emitted history blocks, in response to `getHistory`.
    HistorySnapshot { blocks: Vec<HistoryBlock> },

    /// Extracted vocabulary terms, in response to `generateVocabulary`.
    Vocabulary { items: Vec<VocabularyItem> },

    /// A compiled end-of-lecture report, in response to `generateFinalReport`.
    FinalReport { report: String, total_word_count: u32 },

    /// A queued translation was dropped because its priority lane was at
    /// capacity.
    TranslationDropped { target_id: String },

    /// A non-fatal error: the pipeline continues, but this unit of work was
    /// degraded or dropped.
    Warning { message: String, source_id: Option<String> },

    /// A fatal error: the pipeline is stopping.
    Error { message: String },

    /// The session's lifecycle changed.
    Session { state: SessionState },
}

/// A `DisplayPair` projected for the wire (no `Instant`, which doesn't
/// serialize).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayPairWire {
    pub id: String,
    pub original_text: String,
    pub original_is_final: bool,
    pub translated_text: String,
    pub translation_is_complete: bool,
    pub position: crate::model::Position,
    pub opacity: f32,
}

impl From<&DisplayPair> for DisplayPairWire {
    fn from(pair: &DisplayPair) -> Self {
        Self {
            id: pair.id.clone(),
            original_text: pair.original.text.clone(),
            original_is_final: pair.original.is_final,
            translated_text: pair.translation.text.clone(),
            translation_is_complete: pair.translation.is_complete,
            position: pair.position,
            opacity: pair.effective_opacity(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Starting,
    Active,
    Paused,
    Stopping,
    Stopped,
}

/// The envelope every event is wrapped in before being written to the
/// WebSocket: a correlation id echoing the command that caused it (if any)
/// and a pipeline-relative timestamp in milliseconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: PipelineEvent,
    pub correlation_id: Option<String>,
    pub t_ms: u64,
}

impl EventEnvelope {
    pub fn new(event: PipelineEvent, t_ms: u64) -> Self {
        Self {
            event,
            correlation_id: None,
            t_ms,
        }
    }

    pub fn with_correlation(mut self, correlation_id: impl Into<String>) -> Self {
        self.correlation_id = Some(correlation_id.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn envelope_serializes_with_flattened_tag() {
        let env = EventEnvelope::new(PipelineEvent::Error { message: "boom".into() }, 1234);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["type"], "error");
        assert_eq!(json["message"], "boom");
        assert_eq!(json["t_ms"], 1234);
    }
}
