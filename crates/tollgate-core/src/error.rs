//! Core error types

use std::fmt;
use thiserror::Error;
use tracing::error;

use tollgate_auth::AuthError;

/// Why a token was rejected
///
/// Only used for logging and metrics; callers outside the core see a single
/// "invalid or expired token" outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenFault {
    Expired,
    Malformed,
    NotYetValid,
    Revoked,
    CacheUnavailable,
}

impl TokenFault {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenFault::Expired => "expired",
            TokenFault::Malformed => "malformed",
            TokenFault::NotYetValid => "not-yet-valid",
            TokenFault::Revoked => "revoked",
            TokenFault::CacheUnavailable => "cache-unavailable",
        }
    }

    /// `None` when verification failed for a reason other than the token
    pub(crate) fn from_auth(err: &AuthError) -> Option<Self> {
        if !err.is_token_rejection() {
            return None;
        }
        Some(match err {
            AuthError::TokenExpired => TokenFault::Expired,
            AuthError::TokenNotYetValid => TokenFault::NotYetValid,
            _ => TokenFault::Malformed,
        })
    }
}

impl fmt::Display for TokenFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Same text whether the email is unknown or the password is wrong
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("invalid or expired token")]
    InvalidToken(TokenFault),

    #[error("You do not have permission to access this resource")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    /// Detail is kept for logs and never displayed
    #[error("internal error")]
    Internal(String),
}

impl CoreError {
    /// Internal detail, if any
    pub fn detail(&self) -> Option<&str> {
        match self {
            CoreError::Internal(detail) => Some(detail),
            _ => None,
        }
    }
}

/// Log a lower-layer failure and collapse it into [`CoreError::Internal`]
pub(crate) fn internal(context: &str, err: impl fmt::Display) -> CoreError {
    error!("{}: {}", context, err);
    CoreError::Internal(format!("{}: {}", context, err))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_detail_is_hidden() {
        let err = internal("account lookup", "disk I/O error at /var/lib/db");

        assert_eq!(err.to_string(), "internal error");
        assert_eq!(err.detail(), Some("account lookup: disk I/O error at /var/lib/db"));
    }

    #[test]
    fn test_token_faults_share_message() {
        for fault in [
            TokenFault::Expired,
            TokenFault::Malformed,
            TokenFault::NotYetValid,
            TokenFault::Revoked,
            TokenFault::CacheUnavailable,
        ] {
            assert_eq!(CoreError::InvalidToken(fault).to_string(), "invalid or expired token");
        }
    }

    #[test]
    fn test_fault_from_auth_error() {
        assert_eq!(
            TokenFault::from_auth(&AuthError::TokenExpired),
            Some(TokenFault::Expired)
        );
        assert_eq!(
            TokenFault::from_auth(&AuthError::TokenNotYetValid),
            Some(TokenFault::NotYetValid)
        );
        assert_eq!(
            TokenFault::from_auth(&AuthError::TokenMalformed("bad".to_string())),
            Some(TokenFault::Malformed)
        );
        assert_eq!(
            TokenFault::from_auth(&AuthError::PasswordHash("out of memory".to_string())),
            None
        );
    }
}
