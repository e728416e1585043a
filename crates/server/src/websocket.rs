//! The per-session duplex socket: binary audio frames and JSON commands in,
//! JSON pipeline events out.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::Response;
use futures::{SinkExt, StreamExt};
use serde::Deserialize;

use classbridge_core::{CorrelationMap, EventEnvelope};
use classbridge_pipeline::Command;

use crate::session::Session;
use crate::state::AppState;

/// The inbound command envelope, matching the command surface in the
/// session contract: one JSON object per message, `type`-tagged, with an
/// optional client-supplied `correlationId` echoed back on every event this
/// command produces.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
enum WsCommand {
    StartListening {
        #[serde(default)]
        source_language: Option<String>,
        #[serde(default)]
        target_language: Option<String>,
        #[serde(default)]
        correlation_id: Option<String>,
    },
    StopListening {
        #[serde(default)]
        correlation_id: Option<String>,
    },
    GetHistory {
        #[serde(default)]
        correlation_id: Option<String>,
    },
    ClearHistory {
        #[serde(default)]
        correlation_id: Option<String>,
    },
    GenerateVocabulary {
        #[serde(default)]
        correlation_id: Option<String>,
    },
    GenerateFinalReport {
        #[serde(default)]
        correlation_id: Option<String>,
    },
}

impl WsCommand {
    fn correlation_id(&self) -> Option<String> {
        match self {
            WsCommand::StartListening { correlation_id, .. }
            | WsCommand::StopListening { correlation_id }
            | WsCommand::GetHistory { correlation_id }
            | WsCommand::ClearHistory { correlation_id }
            | WsCommand::GenerateVocabulary { correlation_id }
            | WsCommand::GenerateFinalReport { correlation_id } => correlation_id.clone(),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            WsCommand::StartListening { .. } => "startListening",
            WsCommand::StopListening { .. } => "stopListening",
            WsCommand::GetHistory { .. } => "getHistory",
            WsCommand::ClearHistory { .. } => "clearHistory",
            WsCommand::GenerateVocabulary { .. } => "generateVocabulary",
            WsCommand::GenerateFinalReport { .. } => "generateFinalReport",
        }
    }

    fn into_command(self) -> Command {
        match self {
            WsCommand::StartListening { correlation_id, .. } => Command::Start { correlation_id },
            WsCommand::StopListening { correlation_id } => Command::Stop { correlation_id },
            WsCommand::GetHistory { correlation_id } => Command::GetHistory { correlation_id },
            WsCommand::ClearHistory { correlation_id } => Command::ClearHistory { correlation_id },
            WsCommand::GenerateVocabulary { correlation_id } => Command::GenerateVocabulary { correlation_id },
            WsCommand::GenerateFinalReport { correlation_id } => Command::GenerateFinalReport { correlation_id },
        }
    }
}

pub async fn stream_handler(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Path(session_id): Path<String>,
) -> Result<Response, axum::http::StatusCode> {
    let session = state.sessions.get(&session_id).map_err(axum::http::StatusCode::from)?;
    Ok(ws.on_upgrade(move |socket| handle_socket(socket, session)))
}

async fn handle_socket(socket: WebSocket, session: Arc<Session>) {
    let (mut sender, mut receiver) = socket.split();
    let mut events = session.subscribe();
    let started_at = std::time::Instant::now();
    let correlations = CorrelationMap::new();

    let forward = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => {
                    let t_ms = started_at.elapsed().as_millis() as u64;
                    let envelope = EventEnvelope::new(event, t_ms);
                    if let Ok(text) = serde_json::to_string(&envelope) {
                        if sender.send(Message::Text(text)).await.is_err() {
                            break;
                        }
                    }
                }
                Err(tokio::sync::broadcast::error::RecvError::Lagged(_)) => continue,
                Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    let command_tx = session.command_sender();
    while let Some(Ok(message)) = receiver.next().await {
        session.touch();
        match message {
            Message::Binary(bytes) => {
                let _ = command_tx.send(Command::AudioFrame(bytes)).await;
            }
            Message::Text(text) => match serde_json::from_str::<WsCommand>(&text) {
                Ok(cmd) => {
                    let correlation_id = cmd.correlation_id();
                    if let Some(id) = &correlation_id {
                        correlations.insert(id.clone(), cmd.name(), started_at.elapsed().as_millis() as u64);
                    }
                    tracing::debug!(?correlation_id, "inbound command");
                    let _ = command_tx.send(cmd.into_command()).await;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "malformed command envelope");
                }
            },
            Message::Close(_) => {
                let _ = command_tx.send(Command::Stop { correlation_id: None }).await;
                break;
            }
            Message::Ping(_) | Message::Pong(_) => {}
        }
    }

    forward.abort();
}
