//! API routes

pub mod auth;
mod health;
pub mod metrics;
pub mod types;
mod users;

use axum::{Router, extract::DefaultBodyLimit};
use std::sync::Arc;

use crate::rpc;
use crate::state::{AppState, MetricsHandle};

/// Request bodies are small JSON documents
const MAX_BODY_BYTES: usize = 64 * 1024;

/// Create the main router
pub fn create_router(state: AppState, metrics_handle: Option<Arc<MetricsHandle>>) -> Router {
    let mut router = Router::new()
        // Health check
        .merge(health::routes())
        // User API
        .merge(auth::routes())
        .merge(users::routes())
        // RPC surface
        .merge(rpc::routes())
        .with_state(state)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    // Add metrics endpoint if handle is provided
    if let Some(handle) = metrics_handle {
        router = router.merge(metrics::routes(handle));
    }

    router
}
