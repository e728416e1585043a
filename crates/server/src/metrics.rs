//! Prometheus metrics: request counters recorded by the HTTP layer, plus
//! the `/metrics` scrape handler.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new().install_recorder().expect("failed to install Prometheus recorder")
}

pub async fn metrics_handler(axum::extract::State(state): axum::extract::State<crate::state::AppState>) -> impl axum::response::IntoResponse {
    state.metrics_handle.render()
}

pub fn record_session_created() {
    metrics::counter!("classbridge_sessions_created_total").increment(1);
}

pub fn record_session_rejected() {
    metrics::counter!("classbridge_sessions_rejected_total").increment(1);
}
