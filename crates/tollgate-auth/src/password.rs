//! Credential hashing with Argon2id

use argon2::password_hash::{self, SaltString};
use argon2::{Algorithm, Argon2, Params, PasswordHash, PasswordHasher, PasswordVerifier, Version};
use tracing::debug;

use crate::error::AuthError;

const SALT_LEN: usize = 16;

/// Argon2 work factor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HashingConfig {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Number of passes
    pub iterations: u32,
    /// Degree of parallelism
    pub parallelism: u32,
}

impl Default for HashingConfig {
    fn default() -> Self {
        Self {
            memory_kib: Params::DEFAULT_M_COST,
            iterations: Params::DEFAULT_T_COST,
            parallelism: Params::DEFAULT_P_COST,
        }
    }
}

/// One-way credential hasher
///
/// Produces self-salted PHC strings and verifies secrets against them using
/// the parameters embedded in the stored hash, so changing the work factor
/// does not invalidate existing credentials.
#[derive(Clone)]
pub struct CredentialHasher {
    argon2: Argon2<'static>,
    dummy_hash: String,
}

impl CredentialHasher {
    /// Create a hasher with the given work factor
    pub fn new(config: HashingConfig) -> Result<Self, AuthError> {
        let params = Params::new(
            config.memory_kib,
            config.iterations,
            config.parallelism,
            None,
        )
        .map_err(|e| AuthError::PasswordHash(e.to_string()))?;

        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

        // Never matches anything a caller can send: the input is random bytes.
        let mut filler = [0u8; 32];
        getrandom::getrandom(&mut filler).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
        let dummy_hash = hash_with(&argon2, &filler)?;

        debug!(
            "Credential hasher ready (m={}, t={}, p={})",
            config.memory_kib, config.iterations, config.parallelism
        );

        Ok(Self { argon2, dummy_hash })
    }

    /// Hash a plaintext secret
    pub fn hash(&self, secret: &str) -> Result<String, AuthError> {
        hash_with(&self.argon2, secret.as_bytes())
    }

    /// Verify a plaintext secret against a stored hash
    ///
    /// Returns `Ok(false)` on mismatch. A stored hash that cannot be parsed is
    /// reported as [`AuthError::MalformedHash`].
    pub fn verify(&self, secret: &str, stored_hash: &str) -> Result<bool, AuthError> {
        let parsed =
            PasswordHash::new(stored_hash).map_err(|e| AuthError::MalformedHash(e.to_string()))?;

        match self.argon2.verify_password(secret.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(password_hash::Error::Password) => Ok(false),
            Err(e) => Err(AuthError::PasswordHash(e.to_string())),
        }
    }

    /// Spend the same effort as a real verification and report a mismatch.
    ///
    /// Used when the account does not exist so that the response time does not
    /// reveal whether the email is registered.
    pub fn verify_dummy(&self, secret: &str) -> bool {
        let _ = self.verify(secret, &self.dummy_hash);
        false
    }
}

fn hash_with(argon2: &Argon2<'_>, secret: &[u8]) -> Result<String, AuthError> {
    let mut salt_bytes = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt_bytes).map_err(|e| AuthError::PasswordHash(e.to_string()))?;
    let salt =
        SaltString::encode_b64(&salt_bytes).map_err(|e| AuthError::PasswordHash(e.to_string()))?;

    argon2
        .hash_password(secret, &salt)
        .map(|phc| phc.to_string())
        .map_err(|e| AuthError::PasswordHash(e.to_string()))
}

#[cfg(test)]
pub(crate) fn test_hasher() -> CredentialHasher {
    CredentialHasher::new(HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = test_hasher();
        let hash = hasher.hash("secret1").unwrap();

        assert!(hasher.verify("secret1", &hash).unwrap());
        assert!(!hasher.verify("secret2", &hash).unwrap());
        assert!(!hasher.verify("", &hash).unwrap());
    }

    #[test]
    fn test_hash_is_salted() {
        let hasher = test_hasher();
        let first = hasher.hash("same-secret").unwrap();
        let second = hasher.hash("same-secret").unwrap();

        assert_ne!(first, second);
        assert!(hasher.verify("same-secret", &first).unwrap());
        assert!(hasher.verify("same-secret", &second).unwrap());
    }

    #[test]
    fn test_hash_carries_work_factor() {
        let hasher = test_hasher();
        let hash = hasher.hash("secret").unwrap();

        assert!(hash.starts_with("$argon2id$v=19$m=8,t=1,p=1$"));
    }

    #[test]
    fn test_verify_uses_stored_parameters() {
        let cheap = test_hasher();
        let other = CredentialHasher::new(HashingConfig {
            memory_kib: 16,
            iterations: 2,
            parallelism: 1,
        })
        .unwrap();

        let hash = other.hash("portable").unwrap();
        assert!(cheap.verify("portable", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_distinct_error() {
        let hasher = test_hasher();

        let result = hasher.verify("secret", "not-a-phc-string");
        assert!(matches!(result, Err(AuthError::MalformedHash(_))));
    }

    #[test]
    fn test_dummy_verification_never_matches() {
        let hasher = test_hasher();

        assert!(!hasher.verify_dummy("secret1"));
        assert!(!hasher.verify_dummy(""));
    }

    #[test]
    fn test_invalid_work_factor() {
        let result = CredentialHasher::new(HashingConfig {
            memory_kib: 1,
            iterations: 0,
            parallelism: 1,
        });

        assert!(matches!(result, Err(AuthError::PasswordHash(_))));
    }
}
