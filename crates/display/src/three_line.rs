//! The rolling oldest/older/recent display window with synchronized fade.

use std::collections::VecDeque;
use std::time::{Duration, Instant};

use classbridge_core::{DisplayPair, Position};

const FADE_DELAY: Duration = Duration::from_millis(1500);
const RETIRE_DELAY: Duration = Duration::from_millis(1500);

/// At most three concurrently active `DisplayPair`s, ordered oldest-first.
/// Invariant: at most one pair per segment id; retirement is monotonic.
pub struct ThreeLineDisplay {
    pairs: VecDeque<DisplayPair>,
}

impl Default for ThreeLineDisplay {
    fn default() -> Self {
        Self::new()
    }
}

impl ThreeLineDisplay {
    pub fn new() -> Self {
        Self { pairs: VecDeque::new() }
    }

    /// Updates the matching recent pair in place, or promotes a new pair,
    /// shifting recent->older, older->oldest, retiring the current oldest.
    pub fn update_original(&mut self, segment_id: &str, text: &str, is_final: bool, t_ms: u64) {
        if let Some(pair) = self.pairs.back_mut().filter(|p| p.id == segment_id) {
            pair.original.text = text.to_string();
            pair.original.is_final = is_final;
            pair.original.t_ms = t_ms;
            return;
        }

        if self.pairs.len() >= 3 {
            self.pairs.pop_front();
        }
        self.pairs.push_back(DisplayPair::new(segment_id.to_string(), text.to_string(), is_final, t_ms));
        self.reposition();
    }

    /// Attaches streamed translation text to the matching pair. Marking
    /// `is_complete` starts the 1500 ms removal timer (idempotent).
    pub fn update_translation(&mut self, segment_id: &str, text: &str, is_complete: bool, t_ms: u64) {
        if let Some(pair) = self.pairs.iter_mut().find(|p| p.id == segment_id) {
            pair.translation.text = text.to_string();
            pair.translation.t_ms = t_ms;
            if is_complete && !pair.translation.is_complete {
                pair.translation.is_complete = true;
                pair.translation_complete_time = Some(Instant::now());
            }
        }
    }

    /// Marks a pair complete even if no further tokens arrive. Used by
    /// timeout handling.
    pub fn complete_translation(&mut self, segment_id: &str) {
        if let Some(pair) = self.pairs.iter_mut().find(|p| p.id == segment_id) {
            if !pair.translation.is_complete {
                pair.translation.is_complete = true;
                pair.translation_complete_time = Some(Instant::now());
            }
        }
    }

    /// Advances fading/retirement state. Returns the ids retired this call.
    pub fn tick(&mut self) -> Vec<String> {
        let now = Instant::now();
        let mut retired = Vec::new();
        self.pairs.retain(|pair| match pair.translation_complete_time {
            Some(complete_time) if now.duration_since(complete_time) >= FADE_DELAY + RETIRE_DELAY => {
                retired.push(pair.id.clone());
                false
            }
            _ => true,
        });
        for pair in self.pairs.iter_mut() {
            if let Some(complete_time) = pair.translation_complete_time {
                pair.fading = now.duration_since(complete_time) >= FADE_DELAY;
            }
        }
        self.reposition();
        retired
    }

    pub fn active_pairs(&self) -> impl Iterator<Item = &DisplayPair> {
        self.pairs.iter()
    }

    /// The overall display height: the max across the three pairs, for
    /// synchronized layout.
    pub fn height(&self) -> f32 {
        self.pairs.iter().map(|p| p.height).fold(0.0_f32, f32::max)
    }

    fn reposition(&mut self) {
        let len = self.pairs.len();
        for (i, pair) in self.pairs.iter_mut().enumerate() {
            pair.position = match len - i {
                1 => Position::Recent,
                2 => Position::Older,
                _ => Position::Oldest,
            };
            pair.opacity = pair.effective_opacity();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_segment_promotes_as_recent() {
        let mut display = ThreeLineDisplay::new();
        display.update_original("s1", "hello", false, 0);
        let pairs: Vec<_> = display.active_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].position, Position::Recent);
    }

    #[test]
    fn fourth_segment_retires_the_oldest() {
        let mut display = ThreeLineDisplay::new();
        display.update_original("s1", "one", true, 0);
        display.update_original("s2", "two", true, 100);
        display.update_original("s3", "three", true, 200);
        display.update_original("s4", "four", true, 300);
        let ids: Vec<_> = display.active_pairs().map(|p| p.id.clone()).collect();
        assert_eq!(ids, vec!["s2".to_string(), "s3".to_string(), "s4".to_string()]);
    }

    #[test]
    fn matching_recent_updates_in_place() {
        let mut display = ThreeLineDisplay::new();
        display.update_original("s1", "hel", false, 0);
        display.update_original("s1", "hello", true, 50);
        let pairs: Vec<_> = display.active_pairs().collect();
        assert_eq!(pairs.len(), 1);
        assert_eq!(pairs[0].original.text, "hello");
    }

    #[test]
    fn opacity_schedule_matches_position() {
        let mut display = ThreeLineDisplay::new();
        display.update_original("s1", "one", true, 0);
        display.update_original("s2", "two", true, 100);
        display.update_original("s3", "three", true, 200);
        let pairs: Vec<_> = display.active_pairs().collect();
        assert_eq!(pairs[0].opacity, 0.3);
        assert_eq!(pairs[1].opacity, 0.6);
        assert_eq!(pairs[2].opacity, 1.0);
    }

    #[test]
    fn complete_translation_starts_removal_timer() {
        let mut display = ThreeLineDisplay::new();
        display.update_original("s1", "hello", true, 0);
        display.complete_translation("s1");
        let pairs: Vec<_> = display.active_pairs().collect();
        assert!(pairs[0].translation.is_complete);
        assert!(pairs[0].translation_complete_time.is_some());
    }
}
