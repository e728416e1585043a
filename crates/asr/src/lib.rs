//! Audio framing and the cloud ASR WebSocket client.

pub mod client;
pub mod error;
pub mod framer;
pub mod wire;

pub use client::{AsrClient, AsrClientState};
pub use error::AsrError;
pub use framer::AudioFramer;
pub use wire::{AsrEvent, InboundMessage, OutboundControl};
