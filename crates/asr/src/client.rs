//! The outbound WebSocket connection to the cloud ASR service: connect,
//! keep-alive, reconnect with backoff, and JSON event parsing.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::RwLock;
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message as WsMessage;

use classbridge_config::AsrConfig;
use classbridge_core::{AsrSink, Error as CoreError, Segment};

use crate::error::AsrError;
use crate::wire::{seconds_to_ms, InboundMessage, OutboundControl};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AsrClientState {
    Disconnected,
    Connecting,
    Open,
    Closing,
    Closed,
}

enum Outbound {
    Audio(Vec<u8>),
    Control(OutboundControl),
}

/// A connected (or reconnecting) ASR session. Owned exclusively by the
/// pipeline task; `send_frame` is non-blocking best-effort and `next_segment`
/// drains the parsed event stream.
pub struct AsrClient {
    state: Arc<RwLock<AsrClientState>>,
    frame_tx: mpsc::Sender<Outbound>,
    events_rx: mpsc::Receiver<Result<Segment, CoreError>>,
    supervisor: tokio::task::JoinHandle<()>,
}

impl AsrClient {
    /// Opens a connection and starts the supervisor task that owns
    /// reconnects, keep-alive, and message parsing for the lifetime of the
    /// session.
    pub async fn connect(cfg: AsrConfig, session_id: impl Into<String>) -> Result<Self, AsrError> {
        let session_id = session_id.into();
        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (events_tx, events_rx) = mpsc::channel(256);
        let state = Arc::new(RwLock::new(AsrClientState::Connecting));

        let initial_conn = connect_once(&cfg, &session_id).await.map_err(|e| {
            *state.write() = AsrClientState::Closed;
            e
        })?;

        let supervisor_state = state.clone();
        let supervisor = tokio::spawn(run_supervisor(cfg, session_id, supervisor_state, frame_rx, events_tx, initial_conn));

        *state.write() = AsrClientState::Open;
        Ok(Self {
            state,
            frame_tx,
            events_rx,
            supervisor,
        })
    }

    pub fn state(&self) -> AsrClientState {
        *self.state.read()
    }
}

#[async_trait]
impl AsrSink for AsrClient {
    async fn send_frame(&self, frame: Vec<u8>) -> Result<(), CoreError> {
        if self.state() != AsrClientState::Open {
            return Ok(());
        }
        let _ = self.frame_tx.send(Outbound::Audio(frame)).await;
        Ok(())
    }

    async fn next_segment(&mut self) -> Option<Result<Segment, CoreError>> {
        self.events_rx.recv().await
    }

    async fn close(&mut self) -> Result<(), CoreError> {
        *self.state.write() = AsrClientState::Closing;
        let _ = self.frame_tx.send(Outbound::Control(OutboundControl::Finalize)).await;
        let _ = self.frame_tx.send(Outbound::Control(OutboundControl::CloseStream)).await;
        let _ = tokio::time::timeout(Duration::from_secs(1), async {
            while self.events_rx.recv().await.is_some() {}
        })
        .await;
        self.supervisor.abort();
        *self.state.write() = AsrClientState::Closed;
        Ok(())
    }
}

type WsStream = tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;
type WsSink = futures::stream::SplitSink<WsStream, WsMessage>;
type WsSource = futures::stream::SplitStream<WsStream>;

async fn connect_once(cfg: &AsrConfig, session_id: &str) -> Result<(WsSink, WsSource), AsrError> {
    tracing::info!(session_id, endpoint = %cfg.endpoint, "connecting to ASR");
    match tokio_tungstenite::connect_async(&cfg.endpoint).await {
        Ok((ws_stream, _response)) => Ok(ws_stream.split()),
        // A rejected handshake (non-101 response) surfaces as this error
        // variant, not as a successful connect with a non-101 status.
        Err(tokio_tungstenite::tungstenite::Error::Http(response)) => {
            let status = response.status().as_u16();
            if status == 401 {
                Err(AsrError::Auth)
            } else if status == 400 {
                Err(AsrError::BadRequest("ASR rejected connect handshake".into()))
            } else {
                Err(AsrError::Transient(format!("handshake rejected with status {status}")))
            }
        }
        Err(e) => Err(AsrError::Transient(e.to_string())),
    }
}

async fn run_supervisor(
    cfg: AsrConfig,
    session_id: String,
    state: Arc<RwLock<AsrClientState>>,
    mut frame_rx: mpsc::Receiver<Outbound>,
    events_tx: mpsc::Sender<Result<Segment, CoreError>>,
    initial_conn: (WsSink, WsSource),
) {
    let mut attempts: u32 = 0;
    let mut current_segment_id: Option<String> = None;
    let mut next_segment_seq: u64 = 0;
    let mut pending_conn = Some(initial_conn);

    loop {
        let (mut write, mut read) = match pending_conn.take() {
            Some(conn) => conn,
            None => match connect_once(&cfg, &session_id).await {
                Ok(split) => split,
                Err(e) if e.is_reconnectable() && attempts < 3 => {
                    attempts += 1;
                    let backoff_ms = 1000u64.saturating_mul(1 << (attempts - 1)).min(30_000);
                    tracing::warn!(session_id = %session_id, attempt = attempts, backoff_ms, "ASR reconnect backing off");
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                    continue;
                }
                Err(e) => {
                    *state.write() = AsrClientState::Closed;
                    let _ = events_tx.send(Err(to_core_error(&e))).await;
                    return;
                }
            },
        };

        *state.write() = AsrClientState::Open;
        attempts = 0;
        let mut keep_alive = tokio::time::interval(Duration::from_secs(cfg.keep_alive_secs));
        keep_alive.tick().await;

        let close_reason = loop {
            tokio::select! {
                _ = keep_alive.tick() => {
                    let payload = serde_json::to_string(&OutboundControl::KeepAlive).unwrap_or_default();
                    if write.send(WsMessage::Text(payload)).await.is_err() {
                        break AsrError::Transient("write failed during keep-alive".into());
                    }
                }
                outbound = frame_rx.recv() => {
                    match outbound {
                        Some(Outbound::Audio(bytes)) => {
                            if write.send(WsMessage::Binary(bytes)).await.is_err() {
                                break AsrError::Transient("write failed sending audio frame".into());
                            }
                        }
                        Some(Outbound::Control(ctrl)) => {
                            let payload = serde_json::to_string(&ctrl).unwrap_or_default();
                            let _ = write.send(WsMessage::Text(payload)).await;
                        }
                        None => break AsrError::Transient("frame channel closed".into()),
                    }
                }
                msg = read.next() => {
                    match msg {
                        Some(Ok(WsMessage::Text(text))) => {
                            handle_inbound_text(&text, &mut current_segment_id, &mut next_segment_seq, &events_tx).await;
                        }
                        Some(Ok(WsMessage::Close(frame))) => {
                            let code = frame.map(|f| u16::from(f.code)).unwrap_or(1000);
                            break AsrError::from_close_code(code);
                        }
                        Some(Ok(_)) => {}
                        Some(Err(e)) => break AsrError::Transient(e.to_string()),
                        None => break AsrError::Transient("connection closed by peer".into()),
                    }
                }
            }
        };

        if !close_reason.is_reconnectable() || attempts >= 3 {
            *state.write() = AsrClientState::Closed;
            let _ = events_tx.send(Err(to_core_error(&close_reason))).await;
            return;
        }

        attempts += 1;
        let backoff_ms = 1000u64.saturating_mul(1 << (attempts - 1)).min(30_000);
        tracing::warn!(session_id = %session_id, attempt = attempts, backoff_ms, "ASR reconnect backing off");
        tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
    }
}

async fn handle_inbound_text(
    text: &str,
    current_segment_id: &mut Option<String>,
    next_segment_seq: &mut u64,
    events_tx: &mpsc::Sender<Result<Segment, CoreError>>,
) {
    let parsed: Result<InboundMessage, _> = serde_json::from_str(text);
    let message = match parsed {
        Ok(m) => m,
        Err(e) => {
            let _ = events_tx.send(Err(to_core_error(&AsrError::Format(e.to_string())))).await;
            return;
        }
    };

    match message {
        InboundMessage::Results(results) => {
            let Some(alt) = results.channel.alternatives.first() else {
                return;
            };
            if current_segment_id.is_none() {
                *current_segment_id = Some(format!("seg-{next_segment_seq}"));
                *next_segment_seq += 1;
            }
            let segment_id = current_segment_id.clone().unwrap();

            let mut segment = Segment::new_interim(segment_id, alt.transcript.clone(), alt.confidence, "auto");
            if results.is_final {
                let _ = segment.finalize(
                    alt.transcript.clone(),
                    alt.confidence,
                    seconds_to_ms(results.start),
                    seconds_to_ms(results.end),
                );
                *current_segment_id = None;
            }
            let _ = events_tx.send(Ok(segment)).await;
        }
        InboundMessage::UtteranceEnd(_) => {
            tracing::debug!("ASR utterance end");
        }
        InboundMessage::Metadata(meta) => {
            tracing::debug!(?meta.fields, "ASR metadata");
        }
        InboundMessage::Error(err) => {
            let _ = events_tx.send(Err(to_core_error(&AsrError::BadRequest(err.description)))).await;
        }
    }
}

fn to_core_error(e: &AsrError) -> CoreError {
    match e {
        AsrError::AudioInit => CoreError::BadRequest(e.to_string()),
        AsrError::Auth => CoreError::Auth(e.to_string()),
        AsrError::BadRequest(_) => CoreError::BadRequest(e.to_string()),
        AsrError::Transient(_) => CoreError::Transient(e.to_string()),
        AsrError::Format(_) => CoreError::Format(e.to_string()),
        AsrError::Logic(_) => CoreError::Logic(e.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_schedule_matches_spec() {
        let schedule: Vec<u64> = (1..=3).map(|a| 1000u64.saturating_mul(1 << (a - 1)).min(30_000)).collect();
        assert_eq!(schedule, vec![1000, 2000, 4000]);
    }

    #[test]
    fn error_kind_mapping_matches_close_codes() {
        assert_eq!(AsrError::from_close_code(4001).kind(), classbridge_core::ErrorKind::Auth);
        assert_eq!(AsrError::from_close_code(4000).kind(), classbridge_core::ErrorKind::BadRequest);
        assert_eq!(AsrError::from_close_code(1011).kind(), classbridge_core::ErrorKind::Transient);
    }
}
