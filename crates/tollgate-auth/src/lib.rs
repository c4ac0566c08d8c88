//! Tollgate Authentication Primitives
//!
//! This crate provides credential hashing (Argon2id) and signed,
//! expiring identity tokens (JWT) for Tollgate.

pub mod error;
pub mod password;
pub mod token;

pub use error::AuthError;
pub use password::{CredentialHasher, HashingConfig};
pub use token::{DEFAULT_ISSUER, IdentityClaim, IssuedToken, TokenManager};
