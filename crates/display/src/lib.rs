//! The three presentation-facing components: the rolling three-line
//! display, flowing paragraph history, and progressive summarization.

pub mod error;
pub mod history;
pub mod summary;
pub mod three_line;

pub use error::DisplayError;
pub use history::HistoryGrouper;
pub use summary::{PendingSummaryRequest, SummaryEngine};
pub use three_line::ThreeLineDisplay;
