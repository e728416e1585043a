//! JSON wire types for the outbound ASR WebSocket connection.
//!
//! Outbound control messages are `{"type": "KeepAlive" | "Finalize" |
//! "CloseStream"}`. Inbound messages carry `type` in {Results, UtteranceEnd,
//! Metadata, Error} with transcript data nested under
//! `channel.alternatives[0]`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundControl {
    KeepAlive,
    Finalize,
    CloseStream,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum InboundMessage {
    Results(ResultsMessage),
    UtteranceEnd(UtteranceEndMessage),
    Metadata(MetadataMessage),
    Error(ErrorMessage),
}

#[derive(Debug, Clone, Deserialize)]
pub struct ResultsMessage {
    pub channel: Channel,
    pub is_final: bool,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub speech_final: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Channel {
    pub alternatives: Vec<Alternative>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alternative {
    pub transcript: String,
    #[serde(default)]
    pub confidence: f32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UtteranceEndMessage {
    #[serde(default)]
    pub last_word_end: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MetadataMessage {
    #[serde(flatten)]
    pub fields: serde_json::Value,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ErrorMessage {
    pub description: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// The events an `AsrClient` surfaces to its caller after parsing the raw
/// wire messages above, keyed by a synthesized segment id (the provider
/// doesn't name one; the client assigns one per distinct interim/final run).
#[derive(Debug, Clone)]
pub enum AsrEvent {
    Interim {
        segment_id: String,
        text: String,
        confidence: f32,
    },
    Final {
        segment_id: String,
        text: String,
        confidence: f32,
        start_ms: u64,
        end_ms: u64,
    },
    UtteranceEnd,
    Metadata(serde_json::Value),
}

pub fn seconds_to_ms(seconds: f64) -> u64 {
    (seconds * 1000.0).round() as u64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_results_message() {
        let raw = serde_json::json!({
            "type": "Results",
            "channel": {"alternatives": [{"transcript": "hello", "confidence": 0.9}]},
            "is_final": false,
            "start": 0.0,
            "end": 0.5,
        });
        let parsed: InboundMessage = serde_json::from_value(raw).unwrap();
        match parsed {
            InboundMessage::Results(r) => {
                assert_eq!(r.channel.alternatives[0].transcript, "hello");
                assert!(!r.is_final);
            }
            _ => panic!("wrong variant"),
        }
    }

    #[test]
    fn outbound_control_serializes_tagged() {
        let json = serde_json::to_value(OutboundControl::KeepAlive).unwrap();
        assert_eq!(json["type"], "KeepAlive");
    }

    #[test]
    fn seconds_conversion_rounds() {
        assert_eq!(seconds_to_ms(1.2345), 1235);
    }
}
