//! Authentication error types

use jsonwebtoken::errors::ErrorKind;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Malformed token: {0}")]
    TokenMalformed(String),

    #[error("Token signing error: {0}")]
    Signing(#[source] jsonwebtoken::errors::Error),

    #[error("Malformed credential hash: {0}")]
    MalformedHash(String),

    #[error("Password hashing error: {0}")]
    PasswordHash(String),
}

impl AuthError {
    /// Classify a decoding failure from `jsonwebtoken`.
    ///
    /// Time-bound violations keep their own kinds; everything else
    /// (bad signature, wrong algorithm, bad encoding, missing claims) is
    /// treated as a malformed token.
    pub(crate) fn from_decode(err: jsonwebtoken::errors::Error) -> Self {
        match err.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            _ => AuthError::TokenMalformed(err.to_string()),
        }
    }

    /// Whether this error came from token verification rather than from
    /// hashing or signing.
    pub fn is_token_rejection(&self) -> bool {
        matches!(
            self,
            AuthError::TokenExpired | AuthError::TokenNotYetValid | AuthError::TokenMalformed(_)
        )
    }
}
