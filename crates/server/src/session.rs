//! A `Session` wraps one running `PipelineController` task plus the
//! broadcast channel its events fan out on. `SessionManager` owns the
//! session table, enforces `max_sessions`, and reaps sessions idle past
//! `session_timeout`.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use parking_lot::RwLock;
use tokio::sync::{broadcast, mpsc, watch};

use classbridge_asr::AsrClient;
use classbridge_config::{AsrConfig, PipelineConfig};
use classbridge_core::{EventSink, PipelineEvent, Summarizer, Translator, VocabularyExtractor};
use classbridge_pipeline::{Command, PipelineController};

use crate::error::ServerError;

const EVENT_CHANNEL_CAPACITY: usize = 512;
const COMMAND_CHANNEL_CAPACITY: usize = 128;

/// Publishes every emitted `PipelineEvent` onto a broadcast channel so late
/// WebSocket subscribers (reconnects) still see events from the point they
/// subscribe, without holding up the controller task on a slow consumer.
struct BroadcastEventSink(broadcast::Sender<PipelineEvent>);

#[async_trait]
impl EventSink for BroadcastEventSink {
    async fn emit(&self, event: PipelineEvent) {
        let _ = self.0.send(event);
    }
}

pub struct Session {
    pub id: String,
    command_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<PipelineEvent>,
    created_at: Instant,
    last_activity: RwLock<Instant>,
}

impl Session {
    pub fn command_sender(&self) -> mpsc::Sender<Command> {
        self.command_tx.clone()
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.events_tx.subscribe()
    }

    pub fn touch(&self) {
        *self.last_activity.write() = Instant::now();
    }

    pub fn is_expired(&self, timeout: Duration) -> bool {
        self.last_activity.read().elapsed() > timeout
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }
}

pub struct SessionManager {
    sessions: RwLock<HashMap<String, Arc<Session>>>,
    max_sessions: usize,
    session_timeout: Duration,
    cleanup_interval: Duration,
}

impl SessionManager {
    pub fn new(max_sessions: usize, session_timeout: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions,
            session_timeout,
            cleanup_interval: Duration::from_secs(60),
        }
    }

    /// Spawns the background reaper. Returns a shutdown handle the caller
    /// can use to stop it (dropped senders stop it implicitly too).
    pub fn start_cleanup_task(self: &Arc<Self>) -> watch::Sender<bool> {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let manager = Arc::clone(self);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(manager.cleanup_interval);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let removed = manager.cleanup_expired();
                        if removed > 0 {
                            tracing::info!(removed, "reaped idle sessions");
                        }
                    }
                    _ = shutdown_rx.changed() => {
                        if *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }
        });

        shutdown_tx
    }

    pub fn count(&self) -> usize {
        self.sessions.read().len()
    }

    fn cleanup_expired(&self) -> usize {
        let mut sessions = self.sessions.write();
        let before = sessions.len();
        sessions.retain(|_, session| !session.is_expired(self.session_timeout));
        before - sessions.len()
    }

    /// Connects a fresh ASR socket and spawns the `PipelineController` task
    /// for a new session, returning its id.
    #[allow(clippy::too_many_arguments)]
    pub async fn create(
        &self,
        asr_config: AsrConfig,
        pipeline_config: &PipelineConfig,
        translator: Arc<dyn Translator>,
        summarizer: Arc<dyn Summarizer>,
        vocabulary: Arc<dyn VocabularyExtractor>,
        concurrency_cap: usize,
        queue_max_realtime: usize,
        queue_max_history: usize,
        timeout_default_ms: u64,
        timeout_max_ms: u64,
    ) -> Result<String, ServerError> {
        if self.sessions.read().len() >= self.max_sessions {
            self.cleanup_expired();
            if self.sessions.read().len() >= self.max_sessions {
                return Err(ServerError::SessionLimitReached);
            }
        }

        let id = uuid::Uuid::new_v4().to_string();
        let asr = AsrClient::connect(asr_config, id.clone())
            .await
            .map_err(|e| ServerError::Internal(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::channel(COMMAND_CHANNEL_CAPACITY);
        let (events_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let events: Arc<dyn EventSink> = Arc::new(BroadcastEventSink(events_tx.clone()));

        let controller = PipelineController::new(
            pipeline_config,
            Box::new(asr),
            translator,
            summarizer,
            vocabulary,
            events,
            concurrency_cap,
            queue_max_realtime,
            queue_max_history,
            timeout_default_ms,
            timeout_max_ms,
        );
        tokio::spawn(controller.run(command_rx));

        let session = Arc::new(Session {
            id: id.clone(),
            command_tx,
            events_tx,
            created_at: Instant::now(),
            last_activity: RwLock::new(Instant::now()),
        });

        if self.sessions.write().len() >= self.max_sessions {
            return Err(ServerError::SessionLimitReached);
        }
        self.sessions.write().insert(id.clone(), session);
        Ok(id)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Session>, ServerError> {
        self.sessions.read().get(id).cloned().ok_or_else(|| ServerError::SessionNotFound(id.to_string()))
    }

    pub fn remove(&self, id: &str) {
        self.sessions.write().remove(id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleanup_expired_drops_idle_sessions() {
        let manager = SessionManager::new(10, Duration::from_millis(0));
        {
            let mut sessions = manager.sessions.write();
            sessions.insert("s1".into(), Arc::new(Session {
                id: "s1".into(),
                command_tx: mpsc::channel(1).0,
                events_tx: broadcast::channel(1).0,
                created_at: Instant::now(),
                last_activity: RwLock::new(Instant::now() - Duration::from_secs(1)),
            }));
        }
        assert_eq!(manager.cleanup_expired(), 1);
        assert_eq!(manager.count(), 0);
    }
}
