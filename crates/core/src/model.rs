//! The pipeline's data model: Frame, Segment, CombinedSentence, Translation,
//! DisplayPair, HistoryBlock, and Summary.
//!
//! Identifiers are opaque strings; timestamps are monotonic milliseconds from
//! pipeline start unless stated otherwise.

use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::Error;

pub type SegmentId = String;
pub type CombinedSentenceId = String;
pub type HistoryBlockId = String;
pub type SummaryId = String;
pub type CorrelationId = String;
pub type SessionId = String;

/// A 20 ms, 640-byte PCM16LE mono audio frame. Transient: owned by the
/// framer until sent to the ASR client, then dropped.
#[derive(Debug, Clone)]
pub struct Frame {
    pub bytes: Vec<u8>,
    pub seq: u64,
    pub t_ms: u64,
}

impl Frame {
    pub const SAMPLE_RATE_HZ: u32 = 16_000;
    pub const FRAME_MS: u32 = 20;
    pub const FRAME_BYTES: usize = 640;

    pub fn new(bytes: Vec<u8>, seq: u64, t_ms: u64) -> Self {
        Self { bytes, seq, t_ms }
    }
}

/// A contiguous ASR result with a stable id, repeatedly updated until final.
///
/// Invariant: `is_final` transitions false -> true at most once; once true,
/// `text` is immutable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Segment {
    pub id: SegmentId,
    pub text: String,
    pub confidence: f32,
    pub is_final: bool,
    pub start_ms: Option<u64>,
    pub end_ms: Option<u64>,
    pub lang: String,
    /// Set by SegmentCoalescer once debounce/forceCommit/final conditions are met.
    #[serde(default)]
    pub stable: bool,
}

impl Segment {
    pub fn new_interim(id: impl Into<String>, text: impl Into<String>, confidence: f32, lang: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            text: text.into(),
            confidence,
            is_final: false,
            start_ms: None,
            end_ms: None,
            lang: lang.into(),
            stable: false,
        }
    }

    /// Applies a final transcript, enforcing the false->true-once invariant.
    pub fn finalize(&mut self, text: impl Into<String>, confidence: f32, start_ms: u64, end_ms: u64) -> Result<(), Error> {
        if self.is_final {
            return Err(Error::Logic(format!(
                "segment {} already final; duplicate final is a no-op downstream",
                self.id
            )));
        }
        self.text = text.into();
        self.confidence = confidence;
        self.start_ms = Some(start_ms);
        self.end_ms = Some(end_ms);
        self.is_final = true;
        Ok(())
    }
}

/// One or more finals concatenated across a sentence boundary. Immutable
/// after emission.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinedSentence {
    pub id: CombinedSentenceId,
    pub segment_ids: Vec<SegmentId>,
    pub source_text: String,
    pub t_start_ms: u64,
    pub t_end_ms: u64,
    pub segment_count: usize,
}

impl CombinedSentence {
    pub fn new(id: impl Into<String>, segment_ids: Vec<SegmentId>, source_text: impl Into<String>, t_start_ms: u64, t_end_ms: u64) -> Self {
        let segment_count = segment_ids.len();
        Self {
            id: id.into(),
            segment_ids,
            source_text: source_text.into(),
            t_start_ms,
            t_end_ms,
            segment_count,
        }
    }

    pub fn word_count(&self) -> u32 {
        self.source_text.split_whitespace().count() as u32
    }
}

/// The two translation classes: realtime targets display latency, history
/// targets quality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Realtime,
    History,
}

/// Lifecycle of one translation request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum TranslationState {
    Queued,
    Inflight,
    Completed,
    Failed,
    TimedOut,
}

/// A translation of a segment, combined sentence, or paragraph.
///
/// `target_id` is either a bare segment id, `history_<combinedId>`, or
/// `paragraph_<paragraphId>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Translation {
    pub target_id: String,
    pub source_text: String,
    pub translated_text: String,
    pub is_final: bool,
    pub first_paint_ms: Option<u64>,
    pub complete_ms: Option<u64>,
    pub priority: Priority,
    pub attempts: u32,
    #[serde(skip)]
    pub state: TranslationState,
}

impl Translation {
    pub fn queued(target_id: impl Into<String>, source_text: impl Into<String>, priority: Priority) -> Self {
        Self {
            target_id: target_id.into(),
            source_text: source_text.into(),
            translated_text: String::new(),
            is_final: false,
            first_paint_ms: None,
            complete_ms: None,
            priority,
            attempts: 0,
            state: TranslationState::Queued,
        }
    }

    pub fn placeholder_text(lang_placeholder: &str) -> String {
        lang_placeholder.to_string()
    }
}

/// Where a DisplayPair sits in the rolling three-line window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Oldest,
    Older,
    Recent,
}

impl Position {
    /// Base opacity for this position, before the fading multiplier.
    pub fn base_opacity(&self) -> f32 {
        match self {
            Position::Recent => 1.0,
            Position::Older => 0.6,
            Position::Oldest => 0.3,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OriginalText {
    pub text: String,
    pub is_final: bool,
    pub t_ms: u64,
}

#[derive(Debug, Clone, Default)]
pub struct TranslatedText {
    pub text: String,
    pub is_complete: bool,
    pub t_ms: u64,
}

/// One of at most three concurrently active rolling-display entries.
///
/// Invariant: at most one pair per segment id exists; pairs are ordered by
/// creation time; retirement is monotonic.
#[derive(Debug, Clone)]
pub struct DisplayPair {
    pub id: SegmentId,
    pub original: OriginalText,
    pub translation: TranslatedText,
    pub position: Position,
    pub opacity: f32,
    pub height: f32,
    pub start_time: Instant,
    pub translation_complete_time: Option<Instant>,
    pub fading: bool,
}

impl DisplayPair {
    pub fn new(id: impl Into<String>, text: impl Into<String>, is_final: bool, t_ms: u64) -> Self {
        Self {
            id: id.into(),
            original: OriginalText {
                text: text.into(),
                is_final,
                t_ms,
            },
            translation: TranslatedText::default(),
            position: Position::Recent,
            opacity: Position::Recent.base_opacity(),
            height: 1.0,
            start_time: Instant::now(),
            translation_complete_time: None,
            fading: false,
        }
    }

    /// Opacity after accounting for the fading multiplier.
    pub fn effective_opacity(&self) -> f32 {
        let base = self.position.base_opacity();
        if self.fading {
            base * 0.6
        } else {
            base
        }
    }
}

/// A sentence projected into history; its `translation` field may be
/// upgraded in place by a later, higher-quality retranslation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySentence {
    pub combined_id: CombinedSentenceId,
    pub segment_ids: Vec<SegmentId>,
    pub source_text: String,
    pub t_start_ms: u64,
    pub t_end_ms: u64,
    pub translation: String,
    pub is_placeholder: bool,
}

/// A group of sentences (or, optionally, a paragraph) in the flowing history.
///
/// Invariant: within a block, sentence order equals emission order; a
/// sentence appears in exactly one block.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryBlock {
    pub id: HistoryBlockId,
    pub sentences: Vec<HistorySentence>,
    pub created_at_ms: u64,
    pub duration_ms: u64,
    pub is_paragraph: bool,
}

/// One extracted vocabulary term, surfaced by `generateVocabulary`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabularyItem {
    pub term: String,
    pub definition: String,
}

/// An append-only progressive summary at a crossed word-count threshold.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Summary {
    pub id: SummaryId,
    pub threshold: u32,
    pub source_text: String,
    pub target_text: String,
    pub word_count: u32,
    pub t_start_ms: u64,
    pub t_end_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn segment_finalize_is_one_shot() {
        let mut s = Segment::new_interim("s1", "Hello", 0.9, "en");
        assert!(s.finalize("Hello world.", 0.95, 0, 500).is_ok());
        assert!(s.is_final);
        assert_eq!(s.text, "Hello world.");
        assert!(s.finalize("again", 0.9, 0, 600).is_err());
        assert_eq!(s.text, "Hello world.");
    }

    #[test]
    fn combined_sentence_tracks_segment_count() {
        let c = CombinedSentence::new("c1", vec!["s1".into(), "s2".into()], "OK. Let's start.", 0, 900);
        assert_eq!(c.segment_count, 2);
        assert_eq!(c.word_count(), 3);
    }

    #[test]
    fn position_opacity_schedule() {
        assert_eq!(Position::Recent.base_opacity(), 1.0);
        assert_eq!(Position::Older.base_opacity(), 0.6);
        assert_eq!(Position::Oldest.base_opacity(), 0.3);
    }

    #[test]
    fn display_pair_fading_multiplies_opacity() {
        let mut pair = DisplayPair::new("s1", "hi", true, 0);
        pair.position = Position::Older;
        assert_eq!(pair.effective_opacity(), 0.6);
        pair.fading = true;
        assert!((pair.effective_opacity() - 0.36).abs() < 1e-6);
    }
}
