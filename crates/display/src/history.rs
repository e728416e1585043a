//! Groups `CombinedSentence`s into `HistoryBlock`s by sentence count, block
//! age, and silence gap, and merges later high-quality retranslations back
//! into already-emitted blocks.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use classbridge_core::{CombinedSentence, HistoryBlock, HistorySentence};

#[derive(Debug, Clone, Copy)]
enum Location {
    Open(usize),
    Closed { block_index: usize, sentence_index: usize },
}

struct OpenBlock {
    sentences: Vec<HistorySentence>,
    created_at_ms: u64,
    last_sentence_at: Instant,
}

pub struct HistoryGrouper {
    max_sentences_per_block: usize,
    max_block_age_ms: u64,
    silence_gap: Duration,
    open_block: Option<OpenBlock>,
    closed_blocks: Vec<HistoryBlock>,
    locations: HashMap<String, Location>,
    next_id: u64,
}

impl HistoryGrouper {
    pub fn new(max_sentences_per_block: usize, max_block_age_secs: u64, silence_gap_secs: u64) -> Self {
        Self {
            max_sentences_per_block,
            max_block_age_ms: max_block_age_secs * 1000,
            silence_gap: Duration::from_secs(silence_gap_secs),
            open_block: None,
            closed_blocks: Vec::new(),
            locations: HashMap::new(),
            next_id: 0,
        }
    }

    /// Appends a sentence to the open block, opening one if needed. Returns
    /// a closed `HistoryBlock` if the sentence-count or age bound fired.
    pub fn push_sentence(&mut self, combined: &CombinedSentence, translation: String, is_placeholder: bool, now_ms: u64) -> Option<HistoryBlock> {
        let block = self.open_block.get_or_insert_with(|| OpenBlock {
            sentences: Vec::new(),
            created_at_ms: now_ms,
            last_sentence_at: Instant::now(),
        });

        let index = block.sentences.len();
        block.sentences.push(HistorySentence {
            combined_id: combined.id.clone(),
            segment_ids: combined.segment_ids.clone(),
            source_text: combined.source_text.clone(),
            t_start_ms: combined.t_start_ms,
            t_end_ms: combined.t_end_ms,
            translation,
            is_placeholder,
        });
        block.last_sentence_at = Instant::now();
        self.locations.insert(combined.id.clone(), Location::Open(index));

        let should_close =
            block.sentences.len() >= self.max_sentences_per_block || now_ms.saturating_sub(block.created_at_ms) >= self.max_block_age_ms;
        if should_close {
            self.close_open_block(now_ms)
        } else {
            None
        }
    }

    /// Closes the open block if the silence gap since its last sentence has
    /// elapsed. Call this periodically on a timer tick.
    pub fn tick(&mut self, now_ms: u64) -> Option<HistoryBlock> {
        let expired = self
            .open_block
            .as_ref()
            .map(|b| Instant::now().duration_since(b.last_sentence_at) >= self.silence_gap)
            .unwrap_or(false);
        if expired {
            self.close_open_block(now_ms)
        } else {
            None
        }
    }

    /// Flushes a non-empty open block unconditionally (pipeline stop).
    pub fn force_emit(&mut self, now_ms: u64) -> Option<HistoryBlock> {
        self.close_open_block(now_ms)
    }

    /// Overwrites a sentence's translation by combined-sentence id. Returns
    /// the owning `HistoryBlock` only when it had already been emitted,
    /// so the caller can fire `history-block-updated`; an in-place update
    /// to a still-open block returns `None`.
    pub fn merge_retranslation(&mut self, combined_id: &str, translated_text: String) -> Option<HistoryBlock> {
        match self.locations.get(combined_id).copied()? {
            Location::Open(index) => {
                if let Some(block) = self.open_block.as_mut() {
                    if let Some(sentence) = block.sentences.get_mut(index) {
                        sentence.translation = translated_text;
                        sentence.is_placeholder = false;
                    }
                }
                None
            }
            Location::Closed { block_index, sentence_index } => {
                let block = self.closed_blocks.get_mut(block_index)?;
                if let Some(sentence) = block.sentences.get_mut(sentence_index) {
                    sentence.translation = translated_text;
                    sentence.is_placeholder = false;
                }
                Some(block.clone())
            }
        }
    }

    pub fn closed_blocks(&self) -> &[HistoryBlock] {
        &self.closed_blocks
    }

    pub fn has_open_block(&self) -> bool {
        self.open_block.is_some()
    }

    /// Discards all accumulated history, open or closed. Backs the
    /// `clearHistory` command.
    pub fn clear(&mut self) {
        self.open_block = None;
        self.closed_blocks.clear();
        self.locations.clear();
    }

    fn close_open_block(&mut self, now_ms: u64) -> Option<HistoryBlock> {
        let open = self.open_block.take()?;
        if open.sentences.is_empty() {
            return None;
        }
        let block_index = self.closed_blocks.len();
        for (i, sentence) in open.sentences.iter().enumerate() {
            self.locations.insert(sentence.combined_id.clone(), Location::Closed { block_index, sentence_index: i });
        }
        let block = HistoryBlock {
            id: format!("hb-{}", self.next_id),
            sentences: open.sentences,
            created_at_ms: open.created_at_ms,
            duration_ms: now_ms.saturating_sub(open.created_at_ms),
            is_paragraph: false,
        };
        self.next_id += 1;
        self.closed_blocks.push(block.clone());
        Some(block)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sentence(id: &str, text: &str, start: u64, end: u64) -> CombinedSentence {
        CombinedSentence {
            id: id.to_string(),
            segment_ids: vec![format!("{id}-seg")],
            source_text: text.to_string(),
            t_start_ms: start,
            t_end_ms: end,
            segment_count: 1,
        }
    }

    #[test]
    fn block_closes_at_max_sentences() {
        let mut grouper = HistoryGrouper::new(2, 60, 5);
        assert!(grouper.push_sentence(&sentence("cs1", "one", 0, 100), "uno".into(), false, 100).is_none());
        let closed = grouper.push_sentence(&sentence("cs2", "two", 100, 200), "dos".into(), false, 200).unwrap();
        assert_eq!(closed.sentences.len(), 2);
        assert!(!grouper.has_open_block());
    }

    #[test]
    fn block_closes_at_max_age() {
        let mut grouper = HistoryGrouper::new(100, 0, 5);
        let closed = grouper.push_sentence(&sentence("cs1", "one", 0, 100), "uno".into(), false, 100).unwrap();
        assert_eq!(closed.sentences.len(), 1);
    }

    #[test]
    fn retranslation_updates_open_block_in_place_without_event() {
        let mut grouper = HistoryGrouper::new(100, 60, 5);
        grouper.push_sentence(&sentence("cs1", "one", 0, 100), "[translation timeout]".into(), true, 100);
        let event = grouper.merge_retranslation("cs1", "uno".into());
        assert!(event.is_none());
        assert_eq!(grouper.closed_blocks().len(), 0);
    }

    #[test]
    fn retranslation_into_closed_block_emits_update() {
        let mut grouper = HistoryGrouper::new(1, 60, 5);
        grouper.push_sentence(&sentence("cs1", "one", 0, 100), "[translation timeout]".into(), true, 100);
        let updated = grouper.merge_retranslation("cs1", "uno".into()).unwrap();
        assert_eq!(updated.sentences[0].translation, "uno");
        assert!(!updated.sentences[0].is_placeholder);
    }

    #[test]
    fn force_emit_flushes_partial_block() {
        let mut grouper = HistoryGrouper::new(100, 60, 5);
        grouper.push_sentence(&sentence("cs1", "partial", 0, 100), "parcial".into(), false, 100);
        let closed = grouper.force_emit(150).unwrap();
        assert_eq!(closed.sentences.len(), 1);
    }

    #[test]
    fn clear_drops_open_and_closed_blocks() {
        let mut grouper = HistoryGrouper::new(1, 60, 5);
        grouper.push_sentence(&sentence("cs1", "one", 0, 100), "uno".into(), false, 100);
        grouper.push_sentence(&sentence("cs2", "two", 100, 200), "dos".into(), false, 200);
        grouper.clear();
        assert!(!grouper.has_open_block());
        assert!(grouper.closed_blocks().is_empty());
        assert!(grouper.merge_retranslation("cs1", "x".into()).is_none());
    }
}
