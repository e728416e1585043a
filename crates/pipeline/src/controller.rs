//! `PipelineController`: the single-owner lifecycle state machine that ties
//! the ASR stream, sentence formation, translation dispatch, and the three
//! presentation components together. All mutable pipeline state is owned
//! exclusively by the task running `run()`; every other component talks to
//! it only through `Command`s in and `PipelineEvent`s out.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::StreamExt;
use tokio::sync::mpsc;

use classbridge_config::PipelineConfig;
use classbridge_core::{
    AsrSink, CombinedSentence, Error as CoreError, EventSink, PipelineEvent, Priority, Segment, SessionState, Summarizer, Translator,
    VocabularyExtractor,
};
use classbridge_display::{HistoryGrouper, PendingSummaryRequest, SummaryEngine, ThreeLineDisplay};
use classbridge_translate::{QueuedTranslation, TimeoutRegistry, TranslationQueue};

use crate::coalescer::SegmentCoalescer;
use crate::combiner::SentenceCombiner;
use crate::error::PipelineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    Idle,
    Starting,
    Listening,
    Processing,
    Stopping,
    Stopped,
}

/// Commands the HTTP/WebSocket layer sends into a running pipeline task.
pub enum Command {
    Start { correlation_id: Option<String> },
    Stop { correlation_id: Option<String> },
    AudioFrame(Vec<u8>),
    GetHistory { correlation_id: Option<String> },
    ClearHistory { correlation_id: Option<String> },
    GenerateVocabulary { correlation_id: Option<String> },
    GenerateFinalReport { correlation_id: Option<String> },
}

const PLACEHOLDER: &str = "[translation timeout]";

enum Internal {
    TranslationChunk { target_id: String, chunk: Result<classbridge_core::TranslationChunk, CoreError> },
    TranslationDone { target_id: String, priority: Priority },
    TranslationTimedOut { target_id: String, priority: Priority },
    SummaryDone { request: PendingSummaryRequest, result: Result<String, CoreError> },
    VocabularyDone { result: Result<Vec<classbridge_core::VocabularyItem>, CoreError> },
}

pub struct PipelineController {
    state: ControllerState,
    asr: Box<dyn AsrSink>,
    translator: Arc<dyn Translator>,
    summarizer: Arc<dyn Summarizer>,
    vocabulary: Arc<dyn VocabularyExtractor>,
    events: Arc<dyn EventSink>,

    coalescer: SegmentCoalescer,
    combiner: SentenceCombiner,
    display: ThreeLineDisplay,
    history: HistoryGrouper,
    summary: SummaryEngine,
    queue: TranslationQueue,
    timeouts: TimeoutRegistry,

    history_translation_buffers: HashMap<String, String>,
    realtime_translation_buffers: HashMap<String, String>,

    summary_queue: VecDeque<PendingSummaryRequest>,
    summary_inflight: bool,
    summary_source_so_far: String,
    summary_target_so_far: String,

    started_at: Instant,
    correlation_id: Option<String>,
}

impl PipelineController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: &PipelineConfig,
        asr: Box<dyn AsrSink>,
        translator: Arc<dyn Translator>,
        summarizer: Arc<dyn Summarizer>,
        vocabulary: Arc<dyn VocabularyExtractor>,
        events: Arc<dyn EventSink>,
        concurrency_cap: usize,
        queue_max_realtime: usize,
        queue_max_history: usize,
        timeout_default_ms: u64,
        timeout_max_ms: u64,
    ) -> Self {
        Self {
            state: ControllerState::Idle,
            asr,
            translator,
            summarizer,
            vocabulary,
            events,
            coalescer: SegmentCoalescer::new(config.debounce_ms, config.force_commit_ms, config.coalescer_max_inactive_ms),
            combiner: SentenceCombiner::new(config.combiner_max_segments, config.combiner_timeout_ms),
            display: ThreeLineDisplay::new(),
            history: HistoryGrouper::new(
                config.history_max_sentences_per_block,
                config.history_max_block_age_secs,
                config.history_silence_gap_secs,
            ),
            summary: SummaryEngine::new(config.summary_first_threshold, config.summary_subsequent_step),
            queue: TranslationQueue::new(concurrency_cap, queue_max_realtime, queue_max_history),
            timeouts: TimeoutRegistry::new(timeout_default_ms, timeout_max_ms),
            history_translation_buffers: HashMap::new(),
            realtime_translation_buffers: HashMap::new(),
            summary_queue: VecDeque::new(),
            summary_inflight: false,
            summary_source_so_far: String::new(),
            summary_target_so_far: String::new(),
            started_at: Instant::now(),
            correlation_id: None,
        }
    }

    pub fn state(&self) -> ControllerState {
        self.state
    }

    fn now_ms(&self) -> u64 {
        self.started_at.elapsed().as_millis() as u64
    }

    async fn emit(&self, event: PipelineEvent) {
        self.events.emit(event).await;
    }

    async fn emit_session(&self, state: SessionState) {
        self.emit(PipelineEvent::Session { state }).await;
    }

    async fn emit_display(&mut self) {
        let pairs = self.display.active_pairs().map(classbridge_core::DisplayPairWire::from).collect();
        self.emit(PipelineEvent::Display { pairs }).await;
    }

    /// Drives the pipeline until the command channel closes or a `Stop`
    /// command fully settles.
    pub async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let (internal_tx, mut internal_rx) = mpsc::channel::<Internal>(256);
        let mut gc_timer = tokio::time::interval(Duration::from_millis(500));

        loop {
            tokio::select! {
                cmd = commands.recv() => {
                    match cmd {
                        Some(Command::Start { correlation_id }) => {
                            self.handle_start(correlation_id).await;
                        }
                        Some(Command::Stop { correlation_id }) => {
                            self.handle_stop(correlation_id).await;
                            if self.state == ControllerState::Stopped {
                                return;
                            }
                        }
                        Some(Command::AudioFrame(bytes)) => {
                            if matches!(self.state, ControllerState::Listening | ControllerState::Processing) {
                                let _ = self.asr.send_frame(bytes).await;
                            }
                        }
                        Some(Command::GetHistory { correlation_id }) => {
                            self.handle_get_history(correlation_id).await;
                        }
                        Some(Command::ClearHistory { correlation_id }) => {
                            self.handle_clear_history(correlation_id).await;
                        }
                        Some(Command::GenerateVocabulary { correlation_id }) => {
                            self.handle_generate_vocabulary(correlation_id, &internal_tx);
                        }
                        Some(Command::GenerateFinalReport { correlation_id }) => {
                            self.handle_generate_final_report(correlation_id).await;
                        }
                        None => return,
                    }
                }
                segment = self.asr.next_segment(), if matches!(self.state, ControllerState::Listening | ControllerState::Processing) => {
                    if let Some(result) = segment {
                        self.handle_asr_result(result, &internal_tx).await;
                    }
                }
                Some(event) = internal_rx.recv() => {
                    self.handle_internal(event, &internal_tx).await;
                }
                _ = gc_timer.tick(), if matches!(self.state, ControllerState::Listening | ControllerState::Processing) => {
                    self.handle_tick(&internal_tx).await;
                }
            }
        }
    }

    async fn handle_start(&mut self, correlation_id: Option<String>) {
        if !matches!(self.state, ControllerState::Idle | ControllerState::Stopped) {
            self.emit(PipelineEvent::Warning {
                message: PipelineError::AlreadyRunning.to_string(),
                source_id: None,
            })
            .await;
            return;
        }
        self.correlation_id = correlation_id;
        self.state = ControllerState::Starting;
        self.emit_session(SessionState::Starting).await;
        self.state = ControllerState::Listening;
        self.emit_session(SessionState::Active).await;
    }

    async fn handle_stop(&mut self, correlation_id: Option<String>) {
        if matches!(self.state, ControllerState::Idle | ControllerState::Stopped) {
            return;
        }
        self.state = ControllerState::Stopping;
        self.emit_session(SessionState::Stopping).await;

        if let Some(combined) = self.combiner.force_emit(self.now_ms()) {
            self.handle_combined_sentence(combined).await;
        }
        if let Some(block) = self.history.force_emit(self.now_ms()) {
            self.emit(PipelineEvent::History { block, upgraded: false }).await;
        }

        let _ = tokio::time::timeout(Duration::from_secs(5), async {
            while self.queue.inflight_total() > 0 || self.summary_inflight {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        })
        .await;

        let _ = self.asr.close().await;
        self.state = ControllerState::Stopped;
        self.emit_session(SessionState::Stopped).await;
        let _ = correlation_id;
    }

    async fn handle_asr_result(&mut self, result: Result<Segment, CoreError>, internal_tx: &mpsc::Sender<Internal>) {
        match result {
            Ok(segment) => {
                self.display.update_original(&segment.id, &segment.text, segment.is_final, self.now_ms());
                self.emit(PipelineEvent::Segment { segment: segment.clone() }).await;
                self.emit_display().await;

                let stable = self.coalescer.observe(&segment);
                if stable && segment.is_final {
                    if let Some((text, _confidence, _lang)) = self.coalescer.take(&segment.id) {
                        self.enqueue_realtime(segment.id.clone(), text.clone());
                        let end_ms = segment.end_ms.unwrap_or_else(|| self.now_ms());
                        if let Some(combined) = self.combiner.push_final(segment.id.clone(), text, end_ms) {
                            self.handle_combined_sentence(combined).await;
                        }
                    }
                }
                self.drain_queue(internal_tx);
            }
            Err(e) => {
                let fatal = e.kind().is_fatal();
                self.emit(PipelineEvent::Error { message: e.to_string() }).await;
                if fatal {
                    self.handle_stop(self.correlation_id.clone()).await;
                }
            }
        }
    }

    async fn handle_combined_sentence(&mut self, combined: CombinedSentence) {
        self.emit(PipelineEvent::CombinedSentence { sentence: combined.clone() }).await;
        let now_ms = self.now_ms();
        if let Some(block) = self.history.push_sentence(&combined, String::new(), true, now_ms) {
            self.emit(PipelineEvent::History { block, upgraded: false }).await;
        }
        self.enqueue_history(format!("history_{}", combined.id), combined.source_text.clone()).await;
        if let Some(request) = self.summary.push_sentence(&combined) {
            self.summary_queue.push_back(request);
        }
    }

    fn enqueue_realtime(&mut self, segment_id: String, text: String) {
        let dropped = self.queue.enqueue(QueuedTranslation {
            target_id: segment_id,
            source_text: text,
            priority: Priority::Realtime,
        });
        debug_assert!(dropped.is_none(), "realtime entries are never dropped");
    }

    async fn enqueue_history(&mut self, target_id: String, text: String) {
        if let Some(dropped) = self.queue.enqueue(QueuedTranslation {
            target_id,
            source_text: text,
            priority: Priority::History,
        }) {
            tracing::warn!(target_id = %dropped.target_id, "translation-dropped: history queue at capacity");
            self.emit(PipelineEvent::TranslationDropped { target_id: dropped.target_id }).await;
        }
    }

    fn drain_queue(&mut self, internal_tx: &mpsc::Sender<Internal>) {
        while let Some(item) = self.queue.try_dispatch() {
            self.spawn_translation(item, internal_tx.clone());
        }
        self.drain_summary_queue(internal_tx);

        if self.queue.inflight_total() > 0 {
            self.state = ControllerState::Processing;
        } else if self.state == ControllerState::Processing {
            self.state = ControllerState::Listening;
        }
    }

    fn spawn_translation(&self, item: QueuedTranslation, internal_tx: mpsc::Sender<Internal>) {
        let translator = self.translator.clone();
        let timeouts = self.timeouts.clone();
        let target_id = item.target_id;
        let priority = item.priority;
        let source_text = item.source_text;
        let extend = source_text.split_whitespace().count() > 120;

        tokio::spawn(async move {
            let timeout_fut = timeouts.watch(target_id.clone(), extend);
            tokio::pin!(timeout_fut);

            let mut stream = match translator.translate_stream(&source_text, priority).await {
                Ok(s) => s,
                Err(e) => {
                    let _ = internal_tx.send(Internal::TranslationChunk { target_id: target_id.clone(), chunk: Err(e) }).await;
                    let _ = internal_tx.send(Internal::TranslationDone { target_id, priority }).await;
                    return;
                }
            };

            loop {
                tokio::select! {
                    biased;
                    expired = &mut timeout_fut => {
                        if expired {
                            let _ = internal_tx.send(Internal::TranslationTimedOut { target_id: target_id.clone(), priority }).await;
                        }
                        return;
                    }
                    chunk = stream.next() => {
                        match chunk {
                            Some(c) => {
                                let is_final = c.as_ref().map(|chunk| chunk.is_final).unwrap_or(true);
                                let _ = internal_tx.send(Internal::TranslationChunk { target_id: target_id.clone(), chunk: c }).await;
                                if is_final {
                                    timeouts.complete(&target_id);
                                    let _ = internal_tx.send(Internal::TranslationDone { target_id, priority }).await;
                                    return;
                                }
                            }
                            None => {
                                timeouts.complete(&target_id);
                                let _ = internal_tx.send(Internal::TranslationDone { target_id, priority }).await;
                                return;
                            }
                        }
                    }
                }
            }
        });
    }

    fn drain_summary_queue(&mut self, internal_tx: &mpsc::Sender<Internal>) {
        if self.summary_inflight {
            return;
        }
        let Some(request) = self.summary_queue.pop_front() else {
            return;
        };
        self.summary_inflight = true;
        let summarizer = self.summarizer.clone();
        let source_so_far = self.summary_source_so_far.clone();
        let target_so_far = self.summary_target_so_far.clone();
        let internal_tx = internal_tx.clone();
        let request_for_task = request.clone();

        tokio::spawn(async move {
            let result = summarizer.summarize(&source_so_far, &target_so_far, &request_for_task.source_text).await;
            let _ = internal_tx.send(Internal::SummaryDone { request: request_for_task, result }).await;
        });
    }

    async fn handle_internal(&mut self, event: Internal, internal_tx: &mpsc::Sender<Internal>) {
        match event {
            Internal::TranslationChunk { target_id, chunk } => match chunk {
                Ok(c) => self.apply_translation_chunk(&target_id, &c.text_delta, c.is_final).await,
                Err(e) => {
                    self.emit(PipelineEvent::Warning {
                        message: e.to_string(),
                        source_id: Some(target_id),
                    })
                    .await;
                }
            },
            Internal::TranslationDone { priority, .. } => {
                self.queue.mark_finished(priority);
                self.drain_queue(internal_tx);
            }
            Internal::TranslationTimedOut { target_id, priority } => {
                self.queue.mark_finished(priority);
                self.apply_translation_timeout(&target_id).await;
                self.drain_queue(internal_tx);
            }
            Internal::SummaryDone { request, result } => {
                self.apply_summary_result(request, result).await;
                self.summary_inflight = false;
                self.drain_summary_queue(internal_tx);
            }
            Internal::VocabularyDone { result } => {
                self.apply_vocabulary_result(result).await;
            }
        }
    }

    async fn handle_get_history(&mut self, correlation_id: Option<String>) {
        let blocks = self.history.closed_blocks().to_vec();
        self.emit(PipelineEvent::HistorySnapshot { blocks }).await;
        let _ = correlation_id;
    }

    async fn handle_clear_history(&mut self, correlation_id: Option<String>) {
        self.history.clear();
        self.emit(PipelineEvent::HistorySnapshot { blocks: Vec::new() }).await;
        let _ = correlation_id;
    }

    fn handle_generate_vocabulary(&mut self, correlation_id: Option<String>, internal_tx: &mpsc::Sender<Internal>) {
        let vocabulary = self.vocabulary.clone();
        let source_so_far = self.summary_source_so_far.clone();
        let internal_tx = internal_tx.clone();
        tokio::spawn(async move {
            let result = vocabulary.extract(&source_so_far).await;
            let _ = internal_tx.send(Internal::VocabularyDone { result }).await;
        });
        let _ = correlation_id;
    }

    async fn apply_vocabulary_result(&mut self, result: Result<Vec<classbridge_core::VocabularyItem>, CoreError>) {
        match result {
            Ok(items) => self.emit(PipelineEvent::Vocabulary { items }).await,
            Err(e) => {
                self.emit(PipelineEvent::Warning { message: e.to_string(), source_id: None }).await;
            }
        }
    }

    async fn handle_generate_final_report(&mut self, correlation_id: Option<String>) {
        let report = if self.summary_target_so_far.trim().is_empty() {
            self.summary_source_so_far.trim().to_string()
        } else {
            self.summary_target_so_far.trim().to_string()
        };
        let total_word_count = self.summary.cumulative_words();
        self.emit(PipelineEvent::FinalReport { report, total_word_count }).await;
        let _ = correlation_id;
    }

    async fn apply_translation_chunk(&mut self, target_id: &str, text_delta: &str, is_final: bool) {
        if let Some(combined_id) = target_id.strip_prefix("history_") {
            let buffer = self.history_translation_buffers.entry(combined_id.to_string()).or_default();
            buffer.push_str(text_delta);
            if is_final {
                let full_text = self.history_translation_buffers.remove(combined_id).unwrap_or_default();
                if let Some(block) = self.history.merge_retranslation(combined_id, full_text) {
                    self.emit(PipelineEvent::History { block, upgraded: true }).await;
                }
            }
        } else {
            let buffer = self.realtime_translation_buffers.entry(target_id.to_string()).or_default();
            buffer.push_str(text_delta);
            let full_text = buffer.clone();
            self.display.update_translation(target_id, &full_text, is_final, self.now_ms());
            if is_final {
                self.realtime_translation_buffers.remove(target_id);
            }
            self.emit_display().await;
        }
    }

    async fn apply_translation_timeout(&mut self, target_id: &str) {
        if let Some(combined_id) = target_id.strip_prefix("history_") {
            self.history_translation_buffers.remove(combined_id);
            if let Some(block) = self.history.merge_retranslation(combined_id, PLACEHOLDER.to_string()) {
                self.emit(PipelineEvent::History { block, upgraded: true }).await;
            }
        } else {
            self.realtime_translation_buffers.remove(target_id);
            self.display.update_translation(target_id, PLACEHOLDER, true, self.now_ms());
            self.display.complete_translation(target_id);
            self.emit_display().await;
        }
    }

    async fn apply_summary_result(&mut self, request: PendingSummaryRequest, result: Result<String, CoreError>) {
        let target_text = match result {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, "summary translation failed");
                String::new()
            }
        };
        self.summary_source_so_far.push(' ');
        self.summary_source_so_far.push_str(&request.source_text);
        self.summary_target_so_far.push(' ');
        self.summary_target_so_far.push_str(&target_text);

        let summary = self.summary.finish(request, target_text);
        self.emit(PipelineEvent::Summary { summary }).await;
    }

    async fn handle_tick(&mut self, internal_tx: &mpsc::Sender<Internal>) {
        let now_ms = self.now_ms();
        self.coalescer.gc();
        if let Some(combined) = self.combiner.check_timeout(now_ms) {
            self.handle_combined_sentence(combined).await;
        }
        if let Some(block) = self.history.tick(now_ms) {
            self.emit(PipelineEvent::History { block, upgraded: false }).await;
        }
        let retired = self.display.tick();
        if !retired.is_empty() {
            self.emit_display().await;
        }
        self.drain_queue(internal_tx);
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use async_trait::async_trait;

    use classbridge_core::{Error, TranslationCompletion, VocabularyItem};

    use super::*;

    struct NoopAsr;
    #[async_trait]
    impl AsrSink for NoopAsr {
        async fn send_frame(&self, _frame: Vec<u8>) -> Result<(), Error> {
            Ok(())
        }
        async fn next_segment(&mut self) -> Option<Result<Segment, Error>> {
            None
        }
        async fn close(&mut self) -> Result<(), Error> {
            Ok(())
        }
    }

    struct NoopTranslator;
    #[async_trait]
    impl Translator for NoopTranslator {
        async fn translate(&self, _source_text: &str, _priority: Priority) -> Result<TranslationCompletion, Error> {
            Ok(TranslationCompletion { translated_text: String::new() })
        }
    }

    struct NoopSummarizer;
    #[async_trait]
    impl Summarizer for NoopSummarizer {
        async fn summarize(&self, _source_text_so_far: &str, _target_text_so_far: &str, _new_source_text: &str) -> Result<String, Error> {
            Ok(String::new())
        }
    }

    struct NoopVocabulary;
    #[async_trait]
    impl VocabularyExtractor for NoopVocabulary {
        async fn extract(&self, _source_text: &str) -> Result<Vec<VocabularyItem>, Error> {
            Ok(Vec::new())
        }
    }

    #[derive(Default)]
    struct RecordingEventSink {
        events: Mutex<Vec<PipelineEvent>>,
    }

    #[async_trait]
    impl EventSink for RecordingEventSink {
        async fn emit(&self, event: PipelineEvent) {
            self.events.lock().unwrap().push(event);
        }
    }

    fn test_controller(queue_max_history: usize) -> (PipelineController, Arc<RecordingEventSink>) {
        let mut config = classbridge_config::PipelineConfig::default();
        config.summary_first_threshold = 1;
        config.history_max_sentences_per_block = 1;
        let events = Arc::new(RecordingEventSink::default());
        let controller = PipelineController::new(
            &config,
            Box::new(NoopAsr),
            Arc::new(NoopTranslator),
            Arc::new(NoopSummarizer),
            Arc::new(NoopVocabulary),
            events.clone(),
            3,
            64,
            queue_max_history,
            7000,
            10000,
        );
        (controller, events)
    }

    #[tokio::test]
    async fn combined_sentence_pushes_history_and_summary() {
        let (mut controller, events) = test_controller(128);
        let combined = CombinedSentence::new("c1", vec!["s1".to_string()], "Hello there.", 0, 500);
        controller.handle_combined_sentence(combined).await;

        assert_eq!(controller.summary_queue.len(), 1, "crossing the first-threshold should queue a summary request");
        let recorded = events.events.lock().unwrap();
        assert!(recorded.iter().any(|e| matches!(e, PipelineEvent::CombinedSentence { .. })));
        assert!(
            recorded.iter().any(|e| matches!(e, PipelineEvent::History { upgraded: false, .. })),
            "a combined sentence must register into the open history block"
        );
    }

    #[tokio::test]
    async fn dropped_history_entry_emits_translation_dropped_event() {
        let (mut controller, events) = test_controller(1);
        let first = CombinedSentence::new("c1", vec!["s1".to_string()], "First.", 0, 500);
        let second = CombinedSentence::new("c2", vec!["s2".to_string()], "Second.", 500, 900);
        controller.handle_combined_sentence(first).await;
        controller.handle_combined_sentence(second).await;

        let recorded = events.events.lock().unwrap();
        assert!(recorded.iter().any(|e| matches!(e, PipelineEvent::TranslationDropped { target_id } if target_id == "history_c1")));
    }
}
