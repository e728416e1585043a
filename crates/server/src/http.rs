//! The axum router: session lifecycle, the streaming WebSocket, and the
//! liveness/metrics endpoints.

use axum::extract::{Path, State};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Json};
use axum::routing::{get, post};
use axum::Router;
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::metrics::metrics_handler;
use crate::state::AppState;
use crate::websocket::stream_handler;

pub fn create_router(state: AppState) -> Router {
    let cors_layer = {
        let config = state.get_config();
        build_cors_layer(&config.server.cors_origins, config.server.cors_enabled)
    };

    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", axum::routing::delete(delete_session))
        .route("/sessions/:id/stream", get(stream_handler))
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CompressionLayer::new())
        .layer(cors_layer)
        .with_state(state)
}

/// Builds a `CorsLayer` from configuration; permissive only when CORS is
/// explicitly disabled (local development), never as a silent default.
fn build_cors_layer(origins: &[String], enabled: bool) -> CorsLayer {
    if !enabled {
        tracing::warn!("CORS is disabled - allowing all origins (development only)");
        return CorsLayer::permissive();
    }

    let parsed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse::<HeaderValue>().ok()).collect();
    if parsed.is_empty() {
        tracing::info!("no CORS origins configured, defaulting to localhost:3000");
        return CorsLayer::new()
            .allow_origin("http://localhost:3000".parse::<HeaderValue>().unwrap())
            .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
            .allow_headers(Any);
    }

    CorsLayer::new()
        .allow_origin(parsed)
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(true)
}

async fn create_session(State(state): State<AppState>) -> Result<Json<serde_json::Value>, StatusCode> {
    let config = state.get_config();
    let asr_config = config.asr.clone();
    let pipeline_config = config.pipeline.clone();
    let concurrency_cap = config.translator.concurrency_cap;
    let queue_max_realtime = config.translator.queue_max_realtime;
    let queue_max_history = config.translator.queue_max_history;
    let timeout_default_ms = config.translator.timeout_ms;
    let timeout_max_ms = config.translator.timeout_max_ms;
    drop(config);

    let id = state
        .sessions
        .create(
            asr_config,
            &pipeline_config,
            state.translator.clone(),
            state.summarizer.clone(),
            state.vocabulary.clone(),
            concurrency_cap,
            queue_max_realtime,
            queue_max_history,
            timeout_default_ms,
            timeout_max_ms,
        )
        .await
        .map_err(StatusCode::from)?;

    crate::metrics::record_session_created();
    Ok(Json(serde_json::json!({ "sessionId": id })))
}

async fn delete_session(State(state): State<AppState>, Path(id): Path<String>) -> StatusCode {
    state.sessions.remove(&id);
    StatusCode::NO_CONTENT
}

async fn healthz(State(state): State<AppState>) -> impl IntoResponse {
    Json(serde_json::json!({
        "status": "ok",
        "activeSessions": state.sessions.count(),
    }))
}
