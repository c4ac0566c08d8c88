//! Tollgate Revocation Cache
//!
//! This crate provides the liveness store consulted when validating
//! tokens, supporting Redis and in-process backends.

pub mod error;
pub mod memory;
pub mod redis_store;
pub mod store;

pub use error::RevocationError;
pub use memory::MemoryRevocationStore;
pub use redis_store::RedisRevocationStore;
pub use store::{RevocationStore, record_key, token_fingerprint};
