//! Users Service REST API
//!
//! This crate provides the Axum-based HTTP API for the users service:
//! registration, login, current-user and profile endpoints.

pub mod error;
pub mod routes;
pub mod state;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
