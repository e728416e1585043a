//! Error kinds shared by every crate in the pipeline.
//!
//! Every crate-local error enum implements `kind()` to map itself onto one of
//! these six buckets; the server crate uses `kind()` to decide whether an
//! `error` event stops the pipeline or degrades to a placeholder.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The six error buckets from the propagation policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub enum ErrorKind {
    /// Credential rejected. Stops the pipeline.
    Auth,
    /// Protocol misuse. Stops the pipeline and emits a diagnostic.
    BadRequest,
    /// Network/5xx/429. Retried inline, then degrades to a placeholder.
    Transient,
    /// Unparseable provider payload. Logged, translation emitted empty.
    Format,
    /// Invariant violation. Logged with context, component best-effort recovers.
    Logic,
    /// OOM/queue overflow. Sheds history-priority work first.
    Resource,
}

impl ErrorKind {
    /// Auth/BadRequest are the only kinds that stop the pipeline.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ErrorKind::Auth | ErrorKind::BadRequest)
    }
}

/// The pipeline's common error currency.
#[derive(Error, Debug, Clone)]
pub enum Error {
    #[error("authentication rejected: {0}")]
    Auth(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("transient failure: {0}")]
    Transient(String),

    #[error("unparseable payload: {0}")]
    Format(String),

    #[error("invariant violation: {0}")]
    Logic(String),

    #[error("resource exhausted: {0}")]
    Resource(String),
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth(_) => ErrorKind::Auth,
            Error::BadRequest(_) => ErrorKind::BadRequest,
            Error::Transient(_) => ErrorKind::Transient,
            Error::Format(_) => ErrorKind::Format,
            Error::Logic(_) => ErrorKind::Logic,
            Error::Resource(_) => ErrorKind::Resource,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fatal_kinds() {
        assert!(ErrorKind::Auth.is_fatal());
        assert!(ErrorKind::BadRequest.is_fatal());
        assert!(!ErrorKind::Transient.is_fatal());
        assert!(!ErrorKind::Format.is_fatal());
        assert!(!ErrorKind::Logic.is_fatal());
        assert!(!ErrorKind::Resource.is_fatal());
    }

    #[test]
    fn error_kind_roundtrip() {
        assert_eq!(Error::Transient("boom".into()).kind(), ErrorKind::Transient);
    }
}
