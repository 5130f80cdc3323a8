//! API routes

mod auth;
mod health;
pub mod metrics;
mod types;
mod users;

use axum::Router;
use std::sync::Arc;

use crate::state::{AppState, MetricsHandle};

pub use auth::RequireAuth;

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // Users API
        .merge(users::routes())
        .with_state(state);

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
