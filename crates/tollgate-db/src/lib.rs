//! Tollgate Database Layer
//!
//! This crate provides persistence for accounts and their address
//! records, using SQLite via sqlx.

pub mod error;
pub mod models;
pub mod repository;
pub mod utils;

pub use error::DbError;
pub use models::*;
pub use repository::Database;
