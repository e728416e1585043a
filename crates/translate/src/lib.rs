//! Dual-quality streaming translation: an NDJSON/SSE-capable backend, the
//! adapter bridging it to the core `Translator`/`Summarizer` contracts, a
//! priority-aware dispatch queue, and per-segment timeout handling.

pub mod adapter;
pub mod backend;
pub mod error;
pub mod queue;
pub mod timeout;

pub use adapter::TranslatorAdapter;
pub use backend::{BackendConfig, NdjsonBackend, SseBackend, StreamingStyle, TranslationBackend};
pub use error::TranslationError;
pub use queue::{QueuedTranslation, TranslationQueue};
pub use timeout::TimeoutRegistry;
