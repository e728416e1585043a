//! Layered process configuration: defaults -> `config/default.yaml` ->
//! `config/{environment}.yaml` -> environment variables prefixed
//! `CLASSBRIDGE_`, loaded once at startup via the `config` crate.

use serde::{Deserialize, Serialize};

use crate::constants::{asr as asr_defaults, coalescer, combiner, history, session, summary, translation};
use crate::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RuntimeEnvironment {
    #[default]
    Development,
    Staging,
    Production,
}

impl RuntimeEnvironment {
    pub fn from_env() -> Self {
        match std::env::var("CLASSBRIDGE_ENV").ok().as_deref() {
            Some("staging") => RuntimeEnvironment::Staging,
            Some("production") => RuntimeEnvironment::Production,
            _ => RuntimeEnvironment::Development,
        }
    }

    pub fn is_production(&self) -> bool {
        matches!(self, RuntimeEnvironment::Production)
    }

    /// Production and staging both validate credentials strictly; only
    /// local development tolerates missing API keys (for offline testing
    /// against a mock ASR/translator).
    pub fn is_strict(&self) -> bool {
        !matches!(self, RuntimeEnvironment::Development)
    }

    fn as_file_stem(&self) -> &'static str {
        match self {
            RuntimeEnvironment::Development => "development",
            RuntimeEnvironment::Staging => "staging",
            RuntimeEnvironment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_ws_path")]
    pub ws_path: String,
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
    #[serde(default = "default_cors_enabled")]
    pub cors_enabled: bool,
    #[serde(default)]
    pub cors_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            ws_path: default_ws_path(),
            max_connections: default_max_connections(),
            cors_enabled: default_cors_enabled(),
            cors_origins: Vec::new(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_ws_path() -> String {
    "/sessions".to_string()
}
fn default_max_connections() -> usize {
    session::MAX_SESSIONS
}
fn default_cors_enabled() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AsrConfig {
    #[serde(default = "default_asr_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_asr_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_keep_alive_secs")]
    pub keep_alive_secs: u64,
    #[serde(default = "default_reconnect_max_attempts")]
    pub reconnect_max_attempts: u32,
}

impl Default for AsrConfig {
    fn default() -> Self {
        Self {
            endpoint: default_asr_endpoint(),
            api_key_env: default_asr_api_key_env(),
            keep_alive_secs: default_keep_alive_secs(),
            reconnect_max_attempts: default_reconnect_max_attempts(),
        }
    }
}

fn default_asr_endpoint() -> String {
    "wss://asr.example.invalid/v1/listen".to_string()
}
fn default_asr_api_key_env() -> String {
    "CLASSBRIDGE_ASR_API_KEY".to_string()
}
fn default_keep_alive_secs() -> u64 {
    asr_defaults::KEEP_ALIVE_SECS
}
fn default_reconnect_max_attempts() -> u32 {
    asr_defaults::RECONNECT_MAX_ATTEMPTS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslatorConfig {
    #[serde(default = "default_translator_endpoint")]
    pub endpoint: String,
    #[serde(default = "default_translator_api_key_env")]
    pub api_key_env: String,
    #[serde(default = "default_nano_model")]
    pub nano_model: String,
    #[serde(default = "default_mini_model")]
    pub mini_model: String,
    #[serde(default = "default_summary_model")]
    pub summary_model: String,
    #[serde(default = "default_concurrency_cap")]
    pub concurrency_cap: usize,
    #[serde(default = "default_queue_max_realtime")]
    pub queue_max_realtime: usize,
    #[serde(default = "default_queue_max_history")]
    pub queue_max_history: usize,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_timeout_max_ms")]
    pub timeout_max_ms: u64,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            endpoint: default_translator_endpoint(),
            api_key_env: default_translator_api_key_env(),
            nano_model: default_nano_model(),
            mini_model: default_mini_model(),
            summary_model: default_summary_model(),
            concurrency_cap: default_concurrency_cap(),
            queue_max_realtime: default_queue_max_realtime(),
            queue_max_history: default_queue_max_history(),
            timeout_ms: default_timeout_ms(),
            timeout_max_ms: default_timeout_max_ms(),
        }
    }
}

fn default_translator_endpoint() -> String {
    "https://translate.example.invalid/v1/chat/completions".to_string()
}
fn default_translator_api_key_env() -> String {
    "CLASSBRIDGE_TRANSLATOR_API_KEY".to_string()
}
fn default_nano_model() -> String {
    "translate-nano".to_string()
}
fn default_mini_model() -> String {
    "translate-mini".to_string()
}
fn default_summary_model() -> String {
    "translate-mini".to_string()
}
fn default_concurrency_cap() -> usize {
    translation::CONCURRENCY_CAP
}
fn default_queue_max_realtime() -> usize {
    translation::QUEUE_MAX_REALTIME
}
fn default_queue_max_history() -> usize {
    translation::QUEUE_MAX_HISTORY
}
fn default_timeout_ms() -> u64 {
    translation::TIMEOUT_DEFAULT_MS
}
fn default_timeout_max_ms() -> u64 {
    translation::TIMEOUT_MAX_MS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    #[serde(default = "default_force_commit_ms")]
    pub force_commit_ms: u64,
    #[serde(default = "default_coalescer_max_inactive_ms")]
    pub coalescer_max_inactive_ms: u64,
    #[serde(default = "default_combiner_max_segments")]
    pub combiner_max_segments: usize,
    #[serde(default = "default_combiner_timeout_ms")]
    pub combiner_timeout_ms: u64,
    #[serde(default = "default_history_max_sentences_per_block")]
    pub history_max_sentences_per_block: usize,
    #[serde(default = "default_history_max_block_age_secs")]
    pub history_max_block_age_secs: u64,
    #[serde(default = "default_history_silence_gap_secs")]
    pub history_silence_gap_secs: u64,
    #[serde(default = "default_summary_first_threshold")]
    pub summary_first_threshold: u32,
    #[serde(default = "default_summary_subsequent_step")]
    pub summary_subsequent_step: u32,
    #[serde(default)]
    pub paragraph_mode: bool,
    #[serde(default = "default_session_timeout_secs")]
    pub session_timeout_secs: u64,
    #[serde(default = "default_max_sessions")]
    pub max_sessions: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: default_debounce_ms(),
            force_commit_ms: default_force_commit_ms(),
            coalescer_max_inactive_ms: default_coalescer_max_inactive_ms(),
            combiner_max_segments: default_combiner_max_segments(),
            combiner_timeout_ms: default_combiner_timeout_ms(),
            history_max_sentences_per_block: default_history_max_sentences_per_block(),
            history_max_block_age_secs: default_history_max_block_age_secs(),
            history_silence_gap_secs: default_history_silence_gap_secs(),
            summary_first_threshold: default_summary_first_threshold(),
            summary_subsequent_step: default_summary_subsequent_step(),
            paragraph_mode: false,
            session_timeout_secs: default_session_timeout_secs(),
            max_sessions: default_max_sessions(),
        }
    }
}

fn default_debounce_ms() -> u64 {
    coalescer::DEBOUNCE_MS
}
fn default_force_commit_ms() -> u64 {
    coalescer::FORCE_COMMIT_MS
}
fn default_coalescer_max_inactive_ms() -> u64 {
    coalescer::MAX_INACTIVE_MS
}
fn default_combiner_max_segments() -> usize {
    combiner::MAX_SEGMENTS
}
fn default_combiner_timeout_ms() -> u64 {
    combiner::TIMEOUT_MS
}
fn default_history_max_sentences_per_block() -> usize {
    history::MAX_SENTENCES_PER_BLOCK
}
fn default_history_max_block_age_secs() -> u64 {
    history::MAX_BLOCK_AGE_SECS
}
fn default_history_silence_gap_secs() -> u64 {
    history::SILENCE_GAP_SECS
}
fn default_summary_first_threshold() -> u32 {
    summary::FIRST_THRESHOLD
}
fn default_summary_subsequent_step() -> u32 {
    summary::SUBSEQUENT_THRESHOLD_STEP
}
fn default_session_timeout_secs() -> u64 {
    session::SESSION_TIMEOUT_SECS
}
fn default_max_sessions() -> usize {
    session::MAX_SESSIONS
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ObservabilityConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
    #[serde(default)]
    pub log_json: bool,
    #[serde(default = "default_metrics_enabled")]
    pub metrics_enabled: bool,
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            log_json: false,
            metrics_enabled: default_metrics_enabled(),
            metrics_port: default_metrics_port(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}
fn default_metrics_enabled() -> bool {
    true
}
fn default_metrics_port() -> u16 {
    9090
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Settings {
    #[serde(default)]
    pub environment: RuntimeEnvironment,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub asr: AsrConfig,
    #[serde(default)]
    pub translator: TranslatorConfig,
    #[serde(default)]
    pub pipeline: PipelineConfig,
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

impl Settings {
    /// Validates every bound named in the component design; called once at
    /// startup before the server binds its listener.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.port".into(),
                message: "must be nonzero".into(),
            });
        }
        if self.server.max_connections == 0 {
            return Err(ConfigError::InvalidValue {
                field: "server.max_connections".into(),
                message: "must be nonzero".into(),
            });
        }
        if self.translator.concurrency_cap == 0 {
            return Err(ConfigError::InvalidValue {
                field: "translator.concurrency_cap".into(),
                message: "must be at least 1 to reserve a realtime slot".into(),
            });
        }
        if self.translator.timeout_max_ms < self.translator.timeout_ms {
            return Err(ConfigError::InvalidValue {
                field: "translator.timeout_max_ms".into(),
                message: "must be >= translator.timeout_ms".into(),
            });
        }
        if self.pipeline.summary_first_threshold == 0 || self.pipeline.summary_subsequent_step == 0 {
            return Err(ConfigError::InvalidValue {
                field: "pipeline.summary_first_threshold".into(),
                message: "summary thresholds must be nonzero".into(),
            });
        }
        if self.environment.is_strict() {
            if std::env::var(&self.asr.api_key_env).is_err() {
                return Err(ConfigError::MissingField(format!(
                    "{} (required outside development)",
                    self.asr.api_key_env
                )));
            }
            if std::env::var(&self.translator.api_key_env).is_err() {
                return Err(ConfigError::MissingField(format!(
                    "{} (required outside development)",
                    self.translator.api_key_env
                )));
            }
        }
        Ok(())
    }
}

/// Loads layered configuration: built-in defaults, then `config/default.yaml`,
/// then `config/{environment}.yaml`, then environment variables prefixed
/// `CLASSBRIDGE_` (double underscore as the nested-field separator).
pub fn load_settings(environment: RuntimeEnvironment) -> Result<Settings, ConfigError> {
    let builder = config::Config::builder()
        .add_source(config::File::with_name("config/default").required(false))
        .add_source(config::File::with_name(&format!("config/{}", environment.as_file_stem())).required(false))
        .add_source(config::Environment::with_prefix("CLASSBRIDGE").separator("__"));

    let raw = builder.build()?;
    let mut settings: Settings = raw.try_deserialize()?;
    settings.environment = environment;
    settings.validate()?;
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_validate() {
        let settings = Settings::default();
        assert!(settings.validate().is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut settings = Settings::default();
        settings.server.port = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn zero_concurrency_cap_is_rejected() {
        let mut settings = Settings::default();
        settings.translator.concurrency_cap = 0;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn timeout_max_below_default_is_rejected() {
        let mut settings = Settings::default();
        settings.translator.timeout_max_ms = settings.translator.timeout_ms - 1;
        assert!(settings.validate().is_err());
    }

    #[test]
    fn production_requires_credentials() {
        let mut settings = Settings::default();
        settings.environment = RuntimeEnvironment::Production;
        settings.asr.api_key_env = "CLASSBRIDGE_TEST_UNSET_ASR_KEY_XYZ".into();
        settings.translator.api_key_env = "CLASSBRIDGE_TEST_UNSET_TRANSLATOR_KEY_XYZ".into();
        assert!(settings.validate().is_err());
    }

    #[test]
    fn development_tolerates_missing_credentials() {
        let mut settings = Settings::default();
        settings.asr.api_key_env = "CLASSBRIDGE_TEST_UNSET_ASR_KEY_XYZ".into();
        settings.translator.api_key_env = "CLASSBRIDGE_TEST_UNSET_TRANSLATOR_KEY_XYZ".into();
        assert!(settings.validate().is_ok());
    }
}
