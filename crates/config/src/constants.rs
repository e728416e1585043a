//! Default values referenced by `Settings` when a layer doesn't override them.
//!
//! Values here are the numbers named in the component design (debounce,
//! timeouts, thresholds); they exist as named constants so defaults and
//! documentation never drift apart.

/// ASR connection defaults.
pub mod asr {
    pub const KEEP_ALIVE_SECS: u64 = 8;
    pub const RECONNECT_MAX_ATTEMPTS: u32 = 3;
    pub const RECONNECT_BACKOFF_BASE_MS: u64 = 1_000;
    pub const RECONNECT_BACKOFF_CAP_MS: u64 = 30_000;
    pub const CLOSE_ACK_TIMEOUT_MS: u64 = 1_000;
}

/// SegmentCoalescer defaults.
pub mod coalescer {
    pub const DEBOUNCE_MS: u64 = 160;
    pub const FORCE_COMMIT_MS: u64 = 1_100;
    pub const MAX_INACTIVE_MS: u64 = 5_000;
}

/// SentenceCombiner defaults.
pub mod combiner {
    pub const MAX_SEGMENTS: usize = 10;
    pub const TIMEOUT_MS: u64 = 2_000;
    pub const MIN_SEGMENTS: usize = 1;
}

/// HistoryGrouper defaults.
pub mod history {
    pub const MAX_SENTENCES_PER_BLOCK: usize = 5;
    pub const MAX_BLOCK_AGE_SECS: u64 = 60;
    pub const SILENCE_GAP_SECS: u64 = 5;
}

/// SummaryEngine defaults.
pub mod summary {
    pub const FIRST_THRESHOLD: u32 = 400;
    pub const SUBSEQUENT_THRESHOLD_STEP: u32 = 800;
}

/// TranslationQueue / TranslatorAdapter defaults.
pub mod translation {
    pub const CONCURRENCY_CAP: usize = 3;
    pub const QUEUE_MAX_REALTIME: usize = 64;
    pub const QUEUE_MAX_HISTORY: usize = 128;
    pub const RETRY_BACKOFF_MS: [u64; 2] = [250, 500];
    pub const TIMEOUT_DEFAULT_MS: u64 = 7_000;
    pub const TIMEOUT_MAX_MS: u64 = 10_000;
    pub const PLACEHOLDER_TEXT: &str = "[translation timeout]";
}

/// Session/lecture registry defaults.
pub mod session {
    pub const MAX_SESSIONS: usize = 64;
    pub const SESSION_TIMEOUT_SECS: u64 = 3_600;
    pub const CLEANUP_INTERVAL_SECS: u64 = 60;
    pub const STOP_DRAIN_CAP_SECS: u64 = 5;
}
