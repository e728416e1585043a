//! Sentence-formation and lifecycle orchestration: debouncing ASR segments,
//! combining them into sentences, optionally grouping sentences into
//! paragraphs, and driving the single-owner `PipelineController` state
//! machine that ties translation, history, and summary components together.

pub mod coalescer;
pub mod combiner;
pub mod controller;
pub mod error;
pub mod paragraph;

pub use coalescer::SegmentCoalescer;
pub use combiner::SentenceCombiner;
pub use controller::{Command, ControllerState, PipelineController};
pub use error::PipelineError;
pub use paragraph::{Paragraph, ParagraphBuilder};
