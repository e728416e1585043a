use thiserror::Error;

use classbridge_core::ErrorKind;

#[derive(Error, Debug, Clone)]
pub enum PipelineError {
    #[error("pipeline already running")]
    AlreadyRunning,

    #[error("pipeline is not running")]
    NotRunning,

    #[error("pipeline credential rejected: {0}")]
    Auth(String),

    #[error("pipeline rejected request: {0}")]
    BadRequest(String),

    #[error("pipeline transient failure: {0}")]
    Transient(String),

    #[error("pipeline parse failure: {0}")]
    Format(String),

    #[error("pipeline invariant violation: {0}")]
    Logic(String),

    #[error("pipeline resource exhausted: {0}")]
    Resource(String),
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::AlreadyRunning | PipelineError::NotRunning => ErrorKind::Logic,
            PipelineError::Auth(_) => ErrorKind::Auth,
            PipelineError::BadRequest(_) => ErrorKind::BadRequest,
            PipelineError::Transient(_) => ErrorKind::Transient,
            PipelineError::Format(_) => ErrorKind::Format,
            PipelineError::Logic(_) => ErrorKind::Logic,
            PipelineError::Resource(_) => ErrorKind::Resource,
        }
    }
}

impl From<classbridge_core::Error> for PipelineError {
    fn from(err: classbridge_core::Error) -> Self {
        match err {
            classbridge_core::Error::Auth(m) => PipelineError::Auth(m),
            classbridge_core::Error::BadRequest(m) => PipelineError::BadRequest(m),
            classbridge_core::Error::Transient(m) => PipelineError::Transient(m),
            classbridge_core::Error::Format(m) => PipelineError::Format(m),
            classbridge_core::Error::Logic(m) => PipelineError::Logic(m),
            classbridge_core::Error::Resource(m) => PipelineError::Resource(m),
        }
    }
}

impl From<PipelineError> for classbridge_core::Error {
    fn from(err: PipelineError) -> Self {
        match err.kind() {
            ErrorKind::Auth => classbridge_core::Error::Auth(err.to_string()),
            ErrorKind::BadRequest => classbridge_core::Error::BadRequest(err.to_string()),
            ErrorKind::Transient => classbridge_core::Error::Transient(err.to_string()),
            ErrorKind::Format => classbridge_core::Error::Format(err.to_string()),
            ErrorKind::Logic => classbridge_core::Error::Logic(err.to_string()),
            ErrorKind::Resource => classbridge_core::Error::Resource(err.to_string()),
        }
    }
}
