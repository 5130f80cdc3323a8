//! Prometheus metrics endpoint

use axum::{extract::State, http::header, response::IntoResponse, routing::get, Router};
use std::sync::Arc;

use crate::state::MetricsHandle;

/// Create metrics routes with the Prometheus handle
pub fn routes(handle: Arc<MetricsHandle>) -> Router {
    Router::new()
        .route("/metrics", get(get_metrics))
        .with_state(handle)
}

/// GET /metrics - Prometheus text exposition
async fn get_metrics(State(handle): State<Arc<MetricsHandle>>) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        handle.render(),
    )
}
