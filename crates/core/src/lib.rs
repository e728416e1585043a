//! Shared types and traits for the classroom speech-translation pipeline.
//!
//! This crate provides the foundation every other crate depends on:
//! - the data model (`Frame`, `Segment`, `CombinedSentence`, `Translation`,
//!   `DisplayPair`, `HistoryBlock`, `Summary`)
//! - the capability-set traits backends implement (`AsrSink`, `Translator`,
//!   `Summarizer`, `EventSink`)
//! - the event envelope pushed to clients (`PipelineEvent`, `EventEnvelope`)
//! - the shared error currency (`Error`, `ErrorKind`)
//! - the correlation-id bookkeeping used to echo commands on their events

pub mod correlation;
pub mod error;
pub mod event;
pub mod model;
pub mod traits;

pub use correlation::CorrelationMap;
pub use error::{Error, ErrorKind, Result};
pub use event::{DisplayPairWire, EventEnvelope, PipelineEvent, SessionState};
pub use model::{
    CombinedSentence, CombinedSentenceId, CorrelationId, DisplayPair, Frame, HistoryBlock,
    HistoryBlockId, HistorySentence, OriginalText, Position, Priority, Segment, SegmentId,
    SessionId, Summary, SummaryId, TranslatedText, Translation, TranslationState, VocabularyItem,
};
pub use traits::{AsrSink, EventSink, Summarizer, TranslationChunk, TranslationCompletion, Translator, VocabularyExtractor};
