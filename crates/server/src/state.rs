//! Shared application state handed to every axum handler.

use std::sync::Arc;

use metrics_exporter_prometheus::PrometheusHandle;
use parking_lot::RwLock;

use classbridge_config::{load_settings, RuntimeEnvironment, Settings};
use classbridge_core::{Summarizer, Translator, VocabularyExtractor};
use classbridge_translate::TranslatorAdapter;

use crate::error::ServerError;
use crate::session::SessionManager;

#[derive(Clone)]
pub struct AppState {
    /// Wrapped in `RwLock` so an admin reload can swap it without restarting
    /// in-flight sessions (new sessions pick up the new config; running ones
    /// keep what they were built with).
    pub config: Arc<RwLock<Settings>>,
    pub sessions: Arc<SessionManager>,
    pub translator: Arc<dyn Translator>,
    pub summarizer: Arc<dyn Summarizer>,
    pub vocabulary: Arc<dyn VocabularyExtractor>,
    pub metrics_handle: PrometheusHandle,
    environment: RuntimeEnvironment,
}

impl AppState {
    pub fn new(config: Settings, environment: RuntimeEnvironment, metrics_handle: PrometheusHandle) -> Result<Self, ServerError> {
        let api_key = std::env::var(&config.translator.api_key_env).ok();
        let adapter = Arc::new(
            TranslatorAdapter::new(&config.translator, api_key).map_err(|e| ServerError::Internal(e.to_string()))?,
        );
        let translator: Arc<dyn Translator> = adapter.clone();
        let summarizer: Arc<dyn Summarizer> = adapter.clone();
        let vocabulary: Arc<dyn VocabularyExtractor> = adapter;

        let max_sessions = config.pipeline.max_sessions;
        let session_timeout = std::time::Duration::from_secs(config.pipeline.session_timeout_secs);

        Ok(Self {
            sessions: Arc::new(SessionManager::new(max_sessions, session_timeout)),
            translator,
            summarizer,
            vocabulary,
            metrics_handle,
            config: Arc::new(RwLock::new(config)),
            environment,
        })
    }

    pub fn get_config(&self) -> parking_lot::RwLockReadGuard<'_, Settings> {
        self.config.read()
    }

    /// Reloads configuration from disk. Does not affect sessions already
    /// running with the prior `PipelineConfig`/`AsrConfig`/`TranslatorConfig`.
    pub fn reload_config(&self) -> Result<(), ServerError> {
        let reloaded = load_settings(self.environment).map_err(|e| ServerError::Internal(e.to_string()))?;
        *self.config.write() = reloaded;
        tracing::info!("configuration reloaded");
        Ok(())
    }
}
