//! Application state

use std::sync::Arc;
use users_auth::TokenService;
use users_core::UserDirectory;

/// Handle used to render the Prometheus exposition
pub type MetricsHandle = metrics_exporter_prometheus::PrometheusHandle;

/// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub directory: Arc<UserDirectory>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(directory: Arc<UserDirectory>, tokens: Arc<TokenService>) -> Self {
        Self { directory, tokens }
    }
}
