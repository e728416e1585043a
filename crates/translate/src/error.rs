use thiserror::Error;

use classbridge_core::ErrorKind;

#[derive(Error, Debug, Clone)]
pub enum TranslationError {
    #[error("translator credential rejected")]
    Auth,

    #[error("translator rejected the request: {0}")]
    BadRequest(String),

    #[error("translator transient failure: {0}")]
    Transient(String),

    #[error("unparseable translator payload: {0}")]
    Format(String),

    #[error("translator invariant violation: {0}")]
    Logic(String),

    #[error("translation queue exhausted: {0}")]
    Resource(String),
}

impl TranslationError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            TranslationError::Auth => ErrorKind::Auth,
            TranslationError::BadRequest(_) => ErrorKind::BadRequest,
            TranslationError::Transient(_) => ErrorKind::Transient,
            TranslationError::Format(_) => ErrorKind::Format,
            TranslationError::Logic(_) => ErrorKind::Logic,
            TranslationError::Resource(_) => ErrorKind::Resource,
        }
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, TranslationError::Transient(_))
    }
}

impl From<reqwest::Error> for TranslationError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() || err.is_connect() {
            TranslationError::Transient(err.to_string())
        } else if let Some(status) = err.status() {
            if status.as_u16() == 401 {
                TranslationError::Auth
            } else if status.is_server_error() || status.as_u16() == 429 {
                TranslationError::Transient(err.to_string())
            } else {
                TranslationError::BadRequest(err.to_string())
            }
        } else {
            TranslationError::Transient(err.to_string())
        }
    }
}

impl From<TranslationError> for classbridge_core::Error {
    fn from(err: TranslationError) -> Self {
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
