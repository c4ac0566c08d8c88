//! Signed identity tokens (JWT, HS256)

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;
use uuid::Uuid;

use crate::error::AuthError;

/// Issuer written into every token unless configured otherwise
pub const DEFAULT_ISSUER: &str = "user-service";

const SIGNING_ALGORITHM: Algorithm = Algorithm::HS256;

/// Claims as they appear on the wire
#[derive(Debug, Serialize, Deserialize)]
struct TokenClaims {
    sub: String,
    email: String,
    iat: i64,
    nbf: i64,
    exp: i64,
    iss: String,
    jti: String,
}

/// Verified identity carried by a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IdentityClaim {
    /// Account ID
    pub subject_id: i64,
    /// Account email
    pub email: String,
    /// Issued at (Unix timestamp)
    pub issued_at: i64,
    /// Not valid before (Unix timestamp)
    pub not_before: i64,
    /// Expiration time (Unix timestamp)
    pub expires_at: i64,
    pub issuer: String,
    /// Unique token ID
    pub token_id: String,
}

impl IdentityClaim {
    /// Check that `now` falls inside `[not_before, expires_at)`
    pub fn check_window(&self, now: i64) -> Result<(), AuthError> {
        if now < self.not_before {
            return Err(AuthError::TokenNotYetValid);
        }
        if now >= self.expires_at {
            return Err(AuthError::TokenExpired);
        }
        Ok(())
    }

    fn from_wire(claims: TokenClaims) -> Result<Self, AuthError> {
        let subject_id = claims
            .sub
            .parse::<i64>()
            .map_err(|_| AuthError::TokenMalformed(format!("non-numeric subject: {}", claims.sub)))?;

        if claims.iat <= 0 || claims.exp <= claims.iat {
            return Err(AuthError::TokenMalformed(
                "inconsistent issued-at/expiry".to_string(),
            ));
        }

        Ok(Self {
            subject_id,
            email: claims.email,
            issued_at: claims.iat,
            not_before: claims.nbf,
            expires_at: claims.exp,
            issuer: claims.iss,
            token_id: claims.jti,
        })
    }
}

/// A freshly minted token together with the claim it encodes
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub claim: IdentityClaim,
}

impl IssuedToken {
    /// Lifetime of the token in seconds
    pub fn expires_in(&self) -> i64 {
        self.claim.expires_at - self.claim.issued_at
    }
}

/// Token manager for issuing and verifying identity tokens
///
/// Holds the process-wide signing key. It is immutable after construction
/// and safe to share between concurrent requests.
#[derive(Clone)]
pub struct TokenManager {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
    issuer: String,
}

impl fmt::Debug for TokenManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenManager")
            .field("issuer", &self.issuer)
            .field("ttl", &self.ttl)
            .finish_non_exhaustive()
    }
}

impl TokenManager {
    /// Create a new token manager
    pub fn new(secret: &[u8], ttl: Duration, issuer: impl Into<String>) -> Self {
        let issuer = issuer.into();

        let mut validation = Validation::new(SIGNING_ALGORITHM);
        validation.set_required_spec_claims(&["sub", "exp", "nbf", "iss"]);
        validation.set_issuer(&[issuer.as_str()]);
        // Time bounds are checked by `verify_at` so each violation keeps its own kind.
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        Self {
            encoding_key: EncodingKey::from_secret(secret),
            decoding_key: DecodingKey::from_secret(secret),
            validation,
            ttl,
            issuer,
        }
    }

    /// Configured token lifetime
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// Issue a token for an account
    pub fn issue(&self, subject_id: i64, email: &str) -> Result<IssuedToken, AuthError> {
        self.issue_at(subject_id, email, Utc::now())
    }

    /// Issue a token as if the current time were `now`
    pub fn issue_at(
        &self,
        subject_id: i64,
        email: &str,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, AuthError> {
        let issued_at = now.timestamp();
        let expires_at = (now + self.ttl).timestamp();

        let claims = TokenClaims {
            sub: subject_id.to_string(),
            email: email.to_string(),
            iat: issued_at,
            nbf: issued_at,
            exp: expires_at,
            iss: self.issuer.clone(),
            jti: Uuid::new_v4().to_string(),
        };

        debug!("Issuing token for subject {}", subject_id);

        let token = encode(&Header::new(SIGNING_ALGORITHM), &claims, &self.encoding_key)
            .map_err(AuthError::Signing)?;
        let claim = IdentityClaim::from_wire(claims)?;

        Ok(IssuedToken { token, claim })
    }

    /// Verify a token and return its claim
    pub fn verify(&self, token: &str) -> Result<IdentityClaim, AuthError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`
    ///
    /// The signature and algorithm are checked before any claim field is
    /// looked at.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<IdentityClaim, AuthError> {
        let token_data = decode::<TokenClaims>(token, &self.decoding_key, &self.validation)
            .map_err(AuthError::from_decode)?;

        let claim = IdentityClaim::from_wire(token_data.claims)?;
        claim.check_window(now.timestamp())?;
        Ok(claim)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manager() -> TokenManager {
        TokenManager::new(b"test-secret-key", Duration::minutes(15), DEFAULT_ISSUER)
    }

    #[test]
    fn test_token_generation_and_validation() {
        let manager = manager();

        let issued = manager.issue(7, "u@x.com").unwrap();
        let claim = manager.verify(&issued.token).unwrap();

        assert_eq!(claim.subject_id, 7);
        assert_eq!(claim.email, "u@x.com");
        assert_eq!(claim.issuer, DEFAULT_ISSUER);
        assert_eq!(claim, issued.claim);
        assert_eq!(issued.expires_in(), 15 * 60);
    }

    #[test]
    fn test_claim_time_fields() {
        let manager = manager();
        let now = Utc::now();

        let issued = manager.issue_at(1, "a@b.c", now).unwrap();

        assert_eq!(issued.claim.issued_at, now.timestamp());
        assert_eq!(issued.claim.not_before, now.timestamp());
        assert_eq!(issued.claim.expires_at, now.timestamp() + 900);
        assert!(issued.claim.expires_at > issued.claim.issued_at);
    }

    #[test]
    fn test_token_ids_are_unique() {
        let manager = manager();

        let first = manager.issue(1, "a@b.c").unwrap();
        let second = manager.issue(1, "a@b.c").unwrap();

        assert_ne!(first.claim.token_id, second.claim.token_id);
        assert_ne!(first.token, second.token);
    }

    #[test]
    fn test_expiry_boundary() {
        let manager = manager();
        let now = Utc::now();
        let issued = manager.issue_at(1, "a@b.c", now).unwrap();
        let ttl = manager.ttl();

        let just_before = now + ttl - Duration::seconds(1);
        assert!(manager.verify_at(&issued.token, just_before).is_ok());

        let at_expiry = now + ttl;
        assert!(matches!(
            manager.verify_at(&issued.token, at_expiry),
            Err(AuthError::TokenExpired)
        ));

        let just_after = now + ttl + Duration::seconds(1);
        assert!(matches!(
            manager.verify_at(&issued.token, just_after),
            Err(AuthError::TokenExpired)
        ));
    }

    #[test]
    fn test_not_yet_valid() {
        let manager = manager();
        let now = Utc::now();
        let issued = manager.issue_at(1, "a@b.c", now).unwrap();

        let result = manager.verify_at(&issued.token, now - Duration::seconds(1));
        assert!(matches!(result, Err(AuthError::TokenNotYetValid)));
    }

    #[test]
    fn test_wrong_key_rejected() {
        let issuer = TokenManager::new(b"key-one", Duration::minutes(15), DEFAULT_ISSUER);
        let verifier = TokenManager::new(b"key-two", Duration::minutes(15), DEFAULT_ISSUER);

        let issued = issuer.issue(1, "a@b.c").unwrap();
        let result = verifier.verify(&issued.token);
        assert!(matches!(result, Err(AuthError::TokenMalformed(_))));
    }

    #[test]
    fn test_tampered_payload_rejected() {
        let manager = manager();
        let issued = manager.issue(1, "a@b.c").unwrap();

        let parts: Vec<&str> = issued.token.split('.').collect();
        assert_eq!(parts.len(), 3);
        let payload = parts[1];

        for idx in 0..payload.len() {
            let original = payload.as_bytes()[idx];
            let replacement = if original == b'A' { 'B' } else { 'A' };
            let mut tampered_payload = payload.to_string();
            tampered_payload.replace_range(idx..idx + 1, &replacement.to_string());
            let tampered = format!("{}.{}.{}", parts[0], tampered_payload, parts[2]);

            let result = manager.verify(&tampered);
            assert!(
                matches!(result, Err(AuthError::TokenMalformed(_))),
                "byte {} accepted after tampering",
                idx
            );
        }
    }

    #[test]
    fn test_algorithm_substitution_rejected() {
        let manager = manager();
        let now = Utc::now().timestamp();
        let claims = TokenClaims {
            sub: "1".to_string(),
            email: "a@b.c".to_string(),
            iat: now,
            nbf: now,
            exp: now + 900,
            iss: DEFAULT_ISSUER.to_string(),
            jti: "x".to_string(),
        };
        let token = encode(
            &Header::new(Algorithm::HS384),
            &claims,
            &EncodingKey::from_secret(b"test-secret-key"),
        )
        .unwrap();

        let result = manager.verify(&token);
        assert!(matches!(result, Err(AuthError::TokenMalformed(_))));
    }

    #[test]
    fn test_foreign_issuer_rejected() {
        let manager = manager();
        let other = TokenManager::new(b"test-secret-key", Duration::minutes(15), "someone-else");

        let issued = other.issue(1, "a@b.c").unwrap();
        assert!(matches!(
            manager.verify(&issued.token),
            Err(AuthError::TokenMalformed(_))
        ));
    }

    #[test]
    fn test_invalid_token() {
        let manager = manager();

        let result = manager.verify("invalid-token");
        assert!(matches!(result, Err(AuthError::TokenMalformed(_))));
        assert!(result.unwrap_err().is_token_rejection());
    }

    #[test]
    fn test_check_window_bounds() {
        let manager = manager();
        let now = Utc::now();
        let claim = manager.issue_at(1, "a@b.c", now).unwrap().claim;

        assert!(claim.check_window(now.timestamp()).is_ok());
        assert!(claim.check_window(claim.expires_at - 1).is_ok());
        assert!(matches!(
            claim.check_window(now.timestamp() - 1),
            Err(AuthError::TokenNotYetValid)
        ));
        assert!(matches!(
            claim.check_window(claim.expires_at),
            Err(AuthError::TokenExpired)
        ));
    }
}
