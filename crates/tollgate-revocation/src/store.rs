//! Revocation store trait

use async_trait::async_trait;
use std::time::Duration;

use crate::error::RevocationError;

/// Revocation store trait
///
/// Keeps at most one liveness record per subject. Writing a record for a
/// subject replaces whatever was there before, so only the most recently
/// issued token is considered live. Records expire on their own once their
/// TTL elapses.
#[async_trait]
pub trait RevocationStore: Send + Sync {
    /// Upsert the liveness record for a subject
    async fn record(
        &self,
        subject_id: i64,
        marker: &str,
        ttl: Duration,
    ) -> Result<(), RevocationError>;

    /// Check whether a live record exists for a subject
    async fn check_live(&self, subject_id: i64) -> Result<bool, RevocationError>;

    /// Get the marker currently recorded for a subject
    async fn current(&self, subject_id: i64) -> Result<Option<String>, RevocationError>;

    /// Remove the record for a subject, returns whether one existed
    async fn revoke(&self, subject_id: i64) -> Result<bool, RevocationError>;

    /// Short backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Build the cache key for a subject
pub fn record_key(prefix: &str, subject_id: i64) -> String {
    format!("{}:{}", prefix, subject_id)
}

/// Compute the opaque marker stored for a token
///
/// The raw token is never written to the store.
pub fn token_fingerprint(token: &str) -> String {
    use sha2::{Digest, Sha256};
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

pub(crate) fn ensure_ttl(ttl: Duration) -> Result<(), RevocationError> {
    if ttl.is_zero() {
        return Err(RevocationError::InvalidTtl(ttl));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_key() {
        assert_eq!(record_key("jwt", 42), "jwt:42");
        assert_eq!(record_key("tollgate:live", 1), "tollgate:live:1");
    }

    #[test]
    fn test_token_fingerprint() {
        let fp = token_fingerprint("abc");
        assert_eq!(
            fp,
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
        assert_ne!(token_fingerprint("abc"), token_fingerprint("abd"));
    }

    #[test]
    fn test_ensure_ttl() {
        assert!(ensure_ttl(Duration::from_secs(1)).is_ok());
        assert!(matches!(
            ensure_ttl(Duration::ZERO),
            Err(RevocationError::InvalidTtl(_))
        ));
    }
}
