use thiserror::Error;

use classbridge_core::ErrorKind;

#[derive(Error, Debug, Clone)]
pub enum AsrError {
    #[error("audio device sample rate could not be acquired")]
    AudioInit,

    #[error("ASR credential rejected")]
    Auth,

    #[error("ASR rejected the request: {0}")]
    BadRequest(String),

    #[error("ASR connection transient failure: {0}")]
    Transient(String),

    #[error("unparseable ASR message: {0}")]
    Format(String),

    #[error("ASR client invariant violation: {0}")]
    Logic(String),
}

impl AsrError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AsrError::AudioInit => ErrorKind::BadRequest,
            AsrError::Auth => ErrorKind::Auth,
            AsrError::BadRequest(_) => ErrorKind::BadRequest,
            AsrError::Transient(_) => ErrorKind::Transient,
            AsrError::Format(_) => ErrorKind::Format,
            AsrError::Logic(_) => ErrorKind::Logic,
        }
    }

    /// Close codes the ASR provider never recovers from on reconnect.
    pub fn from_close_code(code: u16) -> Self {
        match code {
            4001 => AsrError::Auth,
            4000 => AsrError::BadRequest("malformed start message".into()),
            1000 | 1001 => AsrError::Transient("normal closure".into()),
            other => AsrError::Transient(format!("close code {other}")),
        }
    }

    pub fn is_reconnectable(&self) -> bool {
        matches!(self, AsrError::Transient(_))
    }
}
