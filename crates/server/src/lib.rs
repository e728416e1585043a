//! Classbridge HTTP/WebSocket server.
//!
//! Exposes session lifecycle endpoints and a streaming WebSocket per
//! session, backing each with a `PipelineController` task.

pub mod error;
pub mod http;
pub mod metrics;
pub mod session;
pub mod state;
pub mod websocket;

pub use error::ServerError;
pub use http::create_router;
pub use metrics::init_metrics;
pub use session::{Session, SessionManager};
pub use state::AppState;
