use thiserror::Error;

use classbridge_core::ErrorKind;

#[derive(Error, Debug, Clone)]
pub enum DisplayError {
    #[error("display invariant violation: {0}")]
    Logic(String),
}

impl DisplayError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DisplayError::Logic(_) => ErrorKind::Logic,
        }
    }
}
