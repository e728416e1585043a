//! Layered configuration for the classroom speech-translation pipeline.
//!
//! Loads `Settings` from built-in defaults, `config/default.yaml`,
//! `config/{environment}.yaml`, and `CLASSBRIDGE_`-prefixed environment
//! variables, in that order of increasing precedence.

pub mod constants;
pub mod settings;

pub use settings::{
    load_settings, AsrConfig, ObservabilityConfig, PipelineConfig, RuntimeEnvironment,
    ServerConfig, Settings, TranslatorConfig,
};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),

    #[error("failed to parse configuration: {0}")]
    ParseError(String),

    #[error("missing required field: {0}")]
    MissingField(String),

    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    #[error("environment error: {0}")]
    Environment(String),
}

impl From<config::ConfigError> for ConfigError {
    fn from(err: config::ConfigError) -> Self {
        ConfigError::ParseError(err.to_string())
    }
}

impl ConfigError {
    pub fn kind(&self) -> classbridge_core::ErrorKind {
        match self {
            ConfigError::FileNotFound(_) | ConfigError::ParseError(_) => classbridge_core::ErrorKind::BadRequest,
            ConfigError::MissingField(_) | ConfigError::InvalidValue { .. } => classbridge_core::ErrorKind::BadRequest,
            ConfigError::Environment(_) => classbridge_core::ErrorKind::BadRequest,
        }
    }
}
