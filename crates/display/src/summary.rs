//! Cumulative word-count tracking that triggers progressive summaries at
//! `T(1) = first_threshold`, `T(n>=2) = first_threshold + subsequent_step *
//! (n-1)`.

use classbridge_core::{CombinedSentence, Summary};

/// A crossed threshold awaiting an LLM summarize + translate call.
#[derive(Debug, Clone)]
pub struct PendingSummaryRequest {
    pub threshold: u32,
    pub source_text: String,
    pub word_count: u32,
    pub t_start_ms: u64,
    pub t_end_ms: u64,
}

pub struct SummaryEngine {
    first_threshold: u32,
    subsequent_step: u32,
    cumulative_words: u32,
    next_threshold_index: u32,
    pending_source: String,
    t_start_ms: Option<u64>,
    next_id: u64,
}

impl SummaryEngine {
    pub fn new(first_threshold: u32, subsequent_step: u32) -> Self {
        Self {
            first_threshold,
            subsequent_step,
            cumulative_words: 0,
            next_threshold_index: 1,
            pending_source: String::new(),
            t_start_ms: None,
            next_id: 0,
        }
    }

    fn next_threshold(&self) -> u32 {
        self.first_threshold + self.subsequent_step * (self.next_threshold_index - 1)
    }

    pub fn cumulative_words(&self) -> u32 {
        self.cumulative_words
    }

    /// Feeds one `CombinedSentence`'s source text into the rolling counter.
    /// Returns a pending request once cumulative words cross the next
    /// threshold; the caller issues the summarize+translate call and
    /// completes it with `finish`.
    pub fn push_sentence(&mut self, combined: &CombinedSentence) -> Option<PendingSummaryRequest> {
        if self.pending_source.is_empty() {
            self.t_start_ms = Some(combined.t_start_ms);
        }
        self.cumulative_words += combined.word_count();
        if !self.pending_source.is_empty() {
            self.pending_source.push(' ');
        }
        self.pending_source.push_str(&combined.source_text);

        let threshold = self.next_threshold();
        if self.cumulative_words < threshold {
            return None;
        }

        let request = PendingSummaryRequest {
            threshold,
            source_text: std::mem::take(&mut self.pending_source),
            word_count: self.cumulative_words,
            t_start_ms: self.t_start_ms.take().unwrap_or(combined.t_end_ms),
            t_end_ms: combined.t_end_ms,
        };
        self.next_threshold_index += 1;
        Some(request)
    }

    /// Finalizes a crossed threshold into an append-only `Summary` once its
    /// LLM call has completed.
    pub fn finish(&mut self, request: PendingSummaryRequest, target_text: String) -> Summary {
        let id = format!("sum-{}", self.next_id);
        self.next_id += 1;
        Summary {
            id,
            threshold: request.threshold,
            source_text: request.source_text,
            target_text,
            word_count: request.word_count,
            t_start_ms: request.t_start_ms,
            t_end_ms: request.t_end_ms,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(id: &str, words: usize, start: u64, end: u64) -> CombinedSentence {
        let text = vec!["word"; words].join(" ");
        CombinedSentence {
            id: id.to_string(),
            segment_ids: vec![format!("{id}-seg")],
            source_text: text,
            t_start_ms: start,
            t_end_ms: end,
            segment_count: 1,
        }
    }

    #[test]
    fn crosses_first_threshold_at_400() {
        let mut engine = SummaryEngine::new(400, 800);
        assert!(engine.push_sentence(&sentence("cs1", 399, 0, 100)).is_none());
        let request = engine.push_sentence(&sentence("cs2", 1, 100, 200)).unwrap();
        assert_eq!(request.threshold, 400);
        assert_eq!(request.word_count, 400);
    }

    #[test]
    fn second_threshold_is_1200_not_800() {
        let mut engine = SummaryEngine::new(400, 800);
        engine.push_sentence(&sentence("cs1", 400, 0, 100)).unwrap();
        assert!(engine.push_sentence(&sentence("cs2", 799, 100, 200)).is_none());
        let request = engine.push_sentence(&sentence("cs3", 1, 200, 300)).unwrap();
        assert_eq!(request.threshold, 1200);
    }

    #[test]
    fn pending_source_resets_after_each_crossing() {
        let mut engine = SummaryEngine::new(400, 800);
        let first = engine.push_sentence(&sentence("cs1", 400, 0, 100)).unwrap();
        assert!(first.source_text.split_whitespace().count() == 400);
        engine.push_sentence(&sentence("cs2", 100, 100, 200));
        // not yet crossed 1200; internal buffer only has cs2's 100 words.
        assert!(engine.push_sentence(&sentence("cs3", 50, 200, 300)).is_none());
    }

    #[test]
    fn finish_produces_append_only_summary_record() {
        let mut engine = SummaryEngine::new(400, 800);
        let request = engine.push_sentence(&sentence("cs1", 400, 0, 100)).unwrap();
        let summary = engine.finish(request, "resumen".into());
        assert_eq!(summary.threshold, 400);
        assert_eq!(summary.target_text, "resumen");
    }
}
