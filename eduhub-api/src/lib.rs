//! Connection lifecycle core and its HTTP surface.
//!
//! [`connection::ConnectionManager`] establishes, supervises and tears down
//! the process's connection to the managed platform. The router exposes its
//! health check and operator-triggered reconnect.

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

pub mod connection;
pub mod error;
pub mod handlers;
pub mod observability;
pub mod resilience;

pub use connection::{ConnectionConfig, ConnectionManager, ServiceHandleFactory};
pub use error::{ApiError, ApiResult};

#[derive(Clone)]
pub struct AppState {
    pub connection: Arc<ConnectionManager>,
}

impl AppState {
    pub fn new(connection: Arc<ConnectionManager>) -> Self {
        Self { connection }
    }
}

pub fn routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(handlers::health::health))
        .route("/health/live", get(handlers::health::liveness))
        .route("/admin/reconnect", post(handlers::admin::reconnect))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
