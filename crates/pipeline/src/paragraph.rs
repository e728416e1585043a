//! Optional grouping of sentences into paragraphs by word/time bounds.
//! Disabled by default (`PipelineConfig::paragraph_mode = false`); the
//! canonical history path groups sentences directly.

use classbridge_core::CombinedSentence;

pub struct ParagraphBuilder {
    max_words: usize,
    max_duration_ms: u64,
    buffer: Vec<CombinedSentence>,
    word_count: usize,
    t_start_ms: Option<u64>,
    next_id: u64,
}

pub struct Paragraph {
    pub id: String,
    pub sentences: Vec<CombinedSentence>,
    pub t_start_ms: u64,
    pub t_end_ms: u64,
}

impl ParagraphBuilder {
    pub fn new(max_words: usize, max_duration_ms: u64) -> Self {
        Self {
            max_words,
            max_duration_ms,
            buffer: Vec::new(),
            word_count: 0,
            t_start_ms: None,
            next_id: 0,
        }
    }

    pub fn push(&mut self, sentence: CombinedSentence) -> Option<Paragraph> {
        if self.buffer.is_empty() {
            self.t_start_ms = Some(sentence.t_start_ms);
        }
        self.word_count += sentence.word_count() as usize;
        let t_end_ms = sentence.t_end_ms;
        self.buffer.push(sentence);

        let duration_ms = t_end_ms.saturating_sub(self.t_start_ms.unwrap_or(t_end_ms));
        if self.word_count >= self.max_words || duration_ms >= self.max_duration_ms {
            return Some(self.emit(t_end_ms));
        }
        None
    }

    pub fn force_emit(&mut self, end_ms: u64) -> Option<Paragraph> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.emit(end_ms))
        }
    }

    fn emit(&mut self, end_ms: u64) -> Paragraph {
        let id = format!("para-{}", self.next_id);
        self.next_id += 1;
        let t_start_ms = self.t_start_ms.take().unwrap_or(end_ms);
        let sentences = std::mem::take(&mut self.buffer);
        self.word_count = 0;
        Paragraph {
            id,
            sentences,
            t_start_ms,
            t_end_ms: end_ms,
        }
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
    fn word_count_threshold_emits_paragraph() {
        let mut builder = ParagraphBuilder::new(3, 60_000);
        assert!(builder.push(sentence("cs1", "one two", 0, 100)).is_none());
        let emitted = builder.push(sentence("cs2", "three four", 100, 200)).unwrap();
        assert_eq!(emitted.sentences.len(), 2);
    }

    #[test]
    fn force_emit_flushes_partial_paragraph() {
        let mut builder = ParagraphBuilder::new(100, 60_000);
        builder.push(sentence("cs1", "partial", 0, 100));
        let emitted = builder.force_emit(150).unwrap();
        assert_eq!(emitted.t_end_ms, 150);
    }
}
