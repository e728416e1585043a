//! Groups stable final segments into `CombinedSentence`s by end-of-sentence
//! heuristics, a segment-count cap, and an inactivity timeout.

use std::time::{Duration, Instant};

use classbridge_core::CombinedSentence;

const TERMINATORS: [char; 6] = ['.', '?', '!', '。', '？', '！'];
const CONTINUATION_SUFFIXES: [&str; 7] = [",", "、", " and", " but", " so", " because", " that"];

fn ends_sentence(text: &str) -> bool {
    let trimmed = text.trim_end();
    let Some(last) = trimmed.chars().last() else {
        return false;
    };
    if !TERMINATORS.contains(&last) {
        return false;
    }
    let without_terminator = &trimmed[..trimmed.len() - last.len_utf8()];
    !CONTINUATION_SUFFIXES.iter().any(|suffix| without_terminator.ends_with(suffix))
}

struct Buffered {
    segment_id: String,
    text: String,
}

pub struct SentenceCombiner {
    max_segments: usize,
    timeout: Duration,
    buffer: Vec<Buffered>,
    t_start_ms: Option<u64>,
    last_final_at: Option<Instant>,
    next_id: u64,
}

impl SentenceCombiner {
    pub fn new(max_segments: usize, timeout_ms: u64) -> Self {
        Self {
            max_segments,
            timeout: Duration::from_millis(timeout_ms),
            buffer: Vec::new(),
            t_start_ms: None,
            last_final_at: None,
            next_id: 0,
        }
    }

    /// Feeds one final segment. Returns an emitted `CombinedSentence` if the
    /// boundary condition fires: the segment cap is reached, or a second (or
    /// later) segment joins a buffer that now ends a sentence. A lone final
    /// that already ends in a terminator is held — it can't yet tell a
    /// genuine sentence boundary from a continuation split across a silence
    /// gap — and is left for `check_timeout` to flush.
    pub fn push_final(&mut self, segment_id: impl Into<String>, text: impl Into<String>, end_ms: u64) -> Option<CombinedSentence> {
        let segment_id = segment_id.into();
        let text = text.into();
        if self.buffer.is_empty() {
            self.t_start_ms = Some(end_ms);
        }
        self.buffer.push(Buffered { segment_id, text });
        self.last_final_at = Some(Instant::now());

        if self.buffer.len() >= self.max_segments {
            return Some(self.emit(end_ms));
        }
        if self.buffer.len() > 1 && ends_sentence(&self.combined_text()) {
            return Some(self.emit(end_ms));
        }
        None
    }

    /// Returns an emitted sentence if the inactivity timeout has elapsed
    /// since the last final was buffered. Callers should poll this on a
    /// timer tick.
    pub fn check_timeout(&mut self, now_ms: u64) -> Option<CombinedSentence> {
        if self.buffer.is_empty() {
            return None;
        }
        let elapsed = self.last_final_at.map(|t| t.elapsed()).unwrap_or_default();
        if elapsed >= self.timeout {
            return Some(self.emit(now_ms));
        }
        None
    }

    /// Flushes a non-empty buffer unconditionally. Used on pipeline stop.
    pub fn force_emit(&mut self, end_ms: u64) -> Option<CombinedSentence> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.emit(end_ms))
        }
    }

    fn combined_text(&self) -> String {
        self.buffer.iter().map(|b| b.text.as_str()).collect::<Vec<_>>().join(" ")
    }

    fn emit(&mut self, end_ms: u64) -> CombinedSentence {
        let id = format!("cs-{}", self.next_id);
        self.next_id += 1;
        let segment_ids = self.buffer.iter().map(|b| b.segment_id.clone()).collect();
        let source_text = self.combined_text();
        let segment_count = self.buffer.len();
        let t_start_ms = self.t_start_ms.take().unwrap_or(end_ms);
        self.buffer.clear();
        self.last_final_at = None;

        CombinedSentence {
            id,
            segment_ids,
            source_text,
            t_start_ms,
            t_end_ms: end_ms,
            segment_count,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lone_terminator_defers_to_timeout() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        assert!(combiner.push_final("s1", "Hello there.", 500).is_none());
    }

    #[test]
    fn following_segment_closes_a_terminator_ending_buffer() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        assert!(combiner.push_final("s1", "OK.", 100).is_none());
        let emitted = combiner.push_final("s2", "Let's start.", 600).unwrap();
        assert_eq!(emitted.source_text, "OK. Let's start.");
        assert_eq!(emitted.segment_ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn continuation_suffix_withholds_emission() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        assert!(combiner.push_final("s1", "I went home, and", 500).is_none());
    }

    #[test]
    fn two_finals_combine_into_one_sentence() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        assert!(combiner.push_final("s1", "Let's start", 200).is_none());
        let emitted = combiner.push_final("s2", "now.", 400).unwrap();
        assert_eq!(emitted.source_text, "Let's start now.");
        assert_eq!(emitted.segment_ids, vec!["s1".to_string(), "s2".to_string()]);
    }

    #[test]
    fn max_segments_forces_emission() {
        let mut combiner = SentenceCombiner::new(2, 2000);
        assert!(combiner.push_final("s1", "one", 100).is_none());
        let emitted = combiner.push_final("s2", "two", 200).unwrap();
        assert_eq!(emitted.segment_count, 2);
    }

    #[test]
    fn force_emit_flushes_nonempty_buffer() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        combiner.push_final("s1", "partial", 100);
        let emitted = combiner.force_emit(150).unwrap();
        assert_eq!(emitted.source_text, "partial");
        assert!(combiner.is_empty());
    }

    #[test]
    fn force_emit_on_empty_buffer_is_none() {
        let mut combiner = SentenceCombiner::new(10, 2000);
        assert!(combiner.force_emit(0).is_none());
    }
}
