//! Tollgate REST and RPC API
//!
//! This crate provides the Axum-based HTTP front-end for Tollgate: the user
//! account API under `/api/users` and the JSON RPC surface under
//! `/rpc/UserService`. Both go through the same session manager and
//! authorization guard.

pub mod error;
pub mod extract;
pub mod routes;
pub mod rpc;
pub mod state;

#[cfg(test)]
pub(crate) mod test_support;

pub use error::ApiError;
pub use routes::create_router;
pub use state::{AppState, MetricsHandle};
