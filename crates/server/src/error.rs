//! Errors surfaced by the HTTP/WebSocket layer, mapped onto the shared
//! `ErrorKind` buckets and, for HTTP responses, onto status codes.

use thiserror::Error;

use classbridge_core::ErrorKind;

#[derive(Error, Debug, Clone)]
pub enum ServerError {
    #[error("session not found: {0}")]
    SessionNotFound(String),

    #[error("session limit reached")]
    SessionLimitReached,

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("websocket error: {0}")]
    WebSocket(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ServerError::SessionNotFound(_) => ErrorKind::BadRequest,
            ServerError::SessionLimitReached => ErrorKind::Resource,
            ServerError::InvalidRequest(_) => ErrorKind::BadRequest,
            ServerError::WebSocket(_) => ErrorKind::Transient,
            ServerError::Internal(_) => ErrorKind::Logic,
        }
    }
}

impl From<ServerError> for axum::http::StatusCode {
    fn from(err: ServerError) -> Self {
        match err {
            ServerError::SessionNotFound(_) => axum::http::StatusCode::NOT_FOUND,
            ServerError::SessionLimitReached => axum::http::StatusCode::SERVICE_UNAVAILABLE,
            ServerError::InvalidRequest(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::WebSocket(_) => axum::http::StatusCode::BAD_REQUEST,
            ServerError::Internal(_) => axum::http::StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        let status = axum::http::StatusCode::from(self.clone());
        let body = axum::Json(serde_json::json!({ "error": self.to_string() }));
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn session_not_found_maps_to_404() {
        let err = ServerError::SessionNotFound("abc".into());
        assert_eq!(axum::http::StatusCode::from(err), axum::http::StatusCode::NOT_FOUND);
    }

    #[test]
    fn session_limit_maps_to_resource_kind() {
        assert_eq!(ServerError::SessionLimitReached.kind(), ErrorKind::Resource);
    }
}
