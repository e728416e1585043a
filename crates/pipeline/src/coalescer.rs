//! Debounces interim ASR updates per segment id so downstream consumers see
//! bounded update churn instead of every interim token.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use classbridge_core::Segment;

struct CoalescerEntry {
    last_text: String,
    last_confidence: f32,
    first_seen: Instant,
    last_update: Instant,
    is_final: bool,
    lang: String,
}

pub struct SegmentCoalescer {
    debounce: Duration,
    force_commit: Duration,
    max_inactive: Duration,
    entries: HashMap<String, CoalescerEntry>,
}

impl SegmentCoalescer {
    pub fn new(debounce_ms: u64, force_commit_ms: u64, max_inactive_ms: u64) -> Self {
        Self {
            debounce: Duration::from_millis(debounce_ms),
            force_commit: Duration::from_millis(force_commit_ms),
            max_inactive: Duration::from_millis(max_inactive_ms),
            entries: HashMap::new(),
        }
    }

    /// Records an incoming segment update. Returns `true` if the buffered
    /// state for this segment id is now considered stable and should be
    /// emitted downstream (debounce elapsed, force-commit elapsed, or the
    /// segment is final).
    pub fn observe(&mut self, segment: &Segment) -> bool {
        let now = Instant::now();
        let entry = self.entries.entry(segment.id.clone()).or_insert_with(|| CoalescerEntry {
            last_text: String::new(),
            last_confidence: 0.0,
            first_seen: now,
            last_update: now,
            is_final: false,
            lang: segment.lang.clone(),
        });

        entry.last_text = segment.text.clone();
        entry.last_confidence = segment.confidence;
        entry.last_update = now;
        entry.is_final = segment.is_final;

        segment.is_final || now.duration_since(entry.first_seen) >= self.force_commit
    }

    /// Checks whether time alone (no new update) has made a buffered segment
    /// stable via the debounce window. Call this periodically for segments
    /// that stopped receiving updates without a final.
    pub fn is_stable_by_debounce(&self, segment_id: &str) -> bool {
        self.entries
            .get(segment_id)
            .map(|e| !e.is_final && Instant::now().duration_since(e.last_update) >= self.debounce)
            .unwrap_or(false)
    }

    /// Removes and returns the buffered state for a segment once it has been
    /// emitted downstream.
    pub fn take(&mut self, segment_id: &str) -> Option<(String, f32, String)> {
        self.entries.remove(segment_id).map(|e| (e.last_text, e.last_confidence, e.lang))
    }

    /// Drops coalescer entries that have received no update for longer than
    /// `max_inactive`. Returns the ids dropped, for logging.
    pub fn gc(&mut self) -> Vec<String> {
        let now = Instant::now();
        let max_inactive = self.max_inactive;
        let expired: Vec<String> = self
            .entries
            .iter()
            .filter(|(_, e)| now.duration_since(e.last_update) >= max_inactive)
            .map(|(id, _)| id.clone())
            .collect();
        for id in &expired {
            self.entries.remove(id);
        }
        expired
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(id: &str, text: &str, is_final: bool) -> Segment {
        if is_final {
            let mut s = Segment::new_interim(id.to_string(), String::new(), 0.9, "en");
            s.finalize(text.to_string(), 0.9, 0, 100).unwrap();
            s
        } else {
            Segment::new_interim(id.to_string(), text.to_string(), 0.9, "en")
        }
    }

    #[test]
    fn final_segment_is_immediately_stable() {
        let mut coalescer = SegmentCoalescer::new(160, 1100, 5000);
        let stable = coalescer.observe(&segment("s1", "hello", true));
        assert!(stable);
    }

    #[test]
    fn interim_segment_is_not_immediately_stable() {
        let mut coalescer = SegmentCoalescer::new(160, 1100, 5000);
        let stable = coalescer.observe(&segment("s1", "hel", false));
        assert!(!stable);
    }

    #[test]
    fn gc_drops_inactive_entries() {
        let mut coalescer = SegmentCoalescer::new(160, 1100, 0);
        coalescer.observe(&segment("s1", "hel", false));
        std::thread::sleep(Duration::from_millis(5));
        let dropped = coalescer.gc();
        assert_eq!(dropped, vec!["s1".to_string()]);
        assert!(coalescer.is_empty());
    }

    #[test]
    fn take_returns_and_clears_buffered_state() {
        let mut coalescer = SegmentCoalescer::new(160, 1100, 5000);
        coalescer.observe(&segment("s1", "hello", true));
        let (text, confidence, lang) = coalescer.take("s1").unwrap();
        assert_eq!(text, "hello");
        assert!(confidence > 0.0);
        assert_eq!(lang, "en");
        assert!(coalescer.take("s1").is_none());
    }
}
