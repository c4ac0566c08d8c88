//! Revocation store error types

use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RevocationError {
    #[error("Revocation store connection error: {0}")]
    Connection(String),

    #[error("Revocation store command error: {0}")]
    Command(String),

    #[error("Revocation store {operation} timed out after {after:?}")]
    Timeout {
        operation: &'static str,
        after: Duration,
    },

    #[error("Invalid record TTL: {0:?}")]
    InvalidTtl(Duration),
}
