//! Session manager
//!
//! Login runs input validation, account lookup, credential verification,
//! token issuance and the liveness record in that order. Validation verifies
//! the token and then consults the revocation store according to the
//! configured [`SessionPolicy`].

use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

use tollgate_auth::{CredentialHasher, IdentityClaim, IssuedToken, TokenManager};
use tollgate_revocation::{RevocationStore, token_fingerprint};

use crate::directory::AccountDirectory;
use crate::error::{CoreError, TokenFault, internal};
use crate::policy::{LivenessCheck, SessionPolicy, UnavailablePolicy};
use crate::validation::{validate_email, validate_login_secret};

/// Whether the liveness record was written at login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded,
    /// The store rejected or timed out; the token is only bounded by expiry
    Failed,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub token: String,
    /// Token lifetime in seconds
    pub expires_in: i64,
    pub claim: IdentityClaim,
    pub recorded: RecordOutcome,
}

pub struct SessionManager {
    hasher: Arc<CredentialHasher>,
    tokens: Arc<TokenManager>,
    revocations: Arc<dyn RevocationStore>,
    accounts: Arc<dyn AccountDirectory>,
    policy: SessionPolicy,
}

impl SessionManager {
    pub fn new(
        hasher: Arc<CredentialHasher>,
        tokens: Arc<TokenManager>,
        revocations: Arc<dyn RevocationStore>,
        accounts: Arc<dyn AccountDirectory>,
        policy: SessionPolicy,
    ) -> Self {
        info!(
            "Initializing session manager (revocation: {}, liveness: {}, on unavailable: {}, ttl: {}s)",
            revocations.backend_name(),
            policy.liveness.as_str(),
            policy.on_unavailable.as_str(),
            tokens.ttl().num_seconds()
        );

        Self {
            hasher,
            tokens,
            revocations,
            accounts,
            policy,
        }
    }

    pub fn tokens(&self) -> &TokenManager {
        &self.tokens
    }

    pub fn policy(&self) -> SessionPolicy {
        self.policy
    }

    /// Authenticate with email and password and issue a token
    pub async fn login(&self, email: &str, secret: &str) -> Result<LoginOutcome, CoreError> {
        validate_email(email)?;
        validate_login_secret(secret)?;

        let account = self
            .accounts
            .find_account_by_email(email.trim())
            .await
            .map_err(|e| internal("account lookup", e))?;

        let stored_hash = account.as_ref().map(|a| a.credential_hash.clone());
        let matched = self.verify_credential(secret, stored_hash).await?;

        let account = match account {
            Some(account) if matched => account,
            _ => {
                debug!("Login rejected for {}", email.trim());
                metrics::counter!("tollgate_logins_total", "outcome" => "rejected").increment(1);
                return Err(CoreError::InvalidCredentials);
            }
        };

        let issued = self
            .tokens
            .issue(account.id, &account.email)
            .map_err(|e| internal("token issue", e))?;
        let recorded = self.record_liveness(&issued).await;

        info!("User {} logged in (token {})", account.id, issued.claim.token_id);
        metrics::counter!("tollgate_logins_total", "outcome" => "success").increment(1);

        Ok(LoginOutcome {
            expires_in: issued.expires_in(),
            token: issued.token,
            claim: issued.claim,
            recorded,
        })
    }

    /// Verify a token and check that its session is still live
    pub async fn validate(&self, token: &str) -> Result<IdentityClaim, CoreError> {
        let result = self.validate_token(token).await;

        let outcome = match &result {
            Ok(_) => "valid",
            Err(CoreError::InvalidToken(fault)) => fault.as_str(),
            Err(_) => "error",
        };
        metrics::counter!("tollgate_token_validations_total", "outcome" => outcome).increment(1);

        result
    }

    /// Drop the liveness record for a subject
    ///
    /// With liveness checking enabled every outstanding token of the subject
    /// stops validating. Returns whether a record existed.
    pub async fn logout(&self, subject_id: i64) -> Result<bool, CoreError> {
        let removed = self
            .revocations
            .revoke(subject_id)
            .await
            .map_err(|e| internal("revocation delete", e))?;

        info!("User {} logged out (record existed: {})", subject_id, removed);
        Ok(removed)
    }

    async fn validate_token(&self, token: &str) -> Result<IdentityClaim, CoreError> {
        if token.is_empty() {
            return Err(CoreError::InvalidToken(TokenFault::Malformed));
        }

        let claim = self
            .tokens
            .verify(token)
            .map_err(|e| match TokenFault::from_auth(&e) {
                Some(fault) => {
                    debug!("Token rejected ({}): {}", fault, e);
                    CoreError::InvalidToken(fault)
                }
                None => internal("token verification", e),
            })?;

        self.check_liveness(token, &claim).await?;
        Ok(claim)
    }

    async fn check_liveness(&self, token: &str, claim: &IdentityClaim) -> Result<(), CoreError> {
        let live = match self.policy.liveness {
            LivenessCheck::Off => return Ok(()),
            LivenessCheck::Present => self.revocations.check_live(claim.subject_id).await,
            LivenessCheck::Latest => self
                .revocations
                .current(claim.subject_id)
                .await
                .map(|marker| marker.is_some_and(|m| m == token_fingerprint(token))),
        };

        match live {
            Ok(true) => Ok(()),
            Ok(false) => {
                debug!(
                    "Token {} for subject {} is no longer live",
                    claim.token_id, claim.subject_id
                );
                Err(CoreError::InvalidToken(TokenFault::Revoked))
            }
            Err(e) => match self.policy.on_unavailable {
                UnavailablePolicy::FailOpen => {
                    warn!(
                        "Revocation store unavailable, accepting token for subject {} on signature and expiry: {}",
                        claim.subject_id, e
                    );
                    Ok(())
                }
                UnavailablePolicy::FailClosed => {
                    warn!(
                        "Revocation store unavailable, rejecting token for subject {}: {}",
                        claim.subject_id, e
                    );
                    Err(CoreError::InvalidToken(TokenFault::CacheUnavailable))
                }
            },
        }
    }

    /// Verify a secret against a stored hash on the blocking pool
    ///
    /// Unknown accounts are verified against the hasher's dummy hash so both
    /// failure paths cost the same.
    async fn verify_credential(
        &self,
        secret: &str,
        stored_hash: Option<String>,
    ) -> Result<bool, CoreError> {
        let hasher = Arc::clone(&self.hasher);
        let secret = secret.to_string();

        tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => hasher.verify(&secret, &hash),
            None => Ok(hasher.verify_dummy(&secret)),
        })
        .await
        .map_err(|e| internal("credential verification task", e))?
        .map_err(|e| internal("credential verification", e))
    }

    async fn record_liveness(&self, issued: &IssuedToken) -> RecordOutcome {
        let subject_id = issued.claim.subject_id;
        let ttl = Duration::from_secs(u64::try_from(issued.expires_in()).unwrap_or(0));
        let marker = token_fingerprint(&issued.token);

        match self.revocations.record(subject_id, &marker, ttl).await {
            Ok(()) => {
                debug!(
                    "Recorded session for subject {} in {} store (ttl: {}s)",
                    subject_id,
                    self.revocations.backend_name(),
                    ttl.as_secs()
                );
                RecordOutcome::Recorded
            }
            Err(e) => {
                warn!(
                    "Failed to record session for subject {} in {} store, token is bounded by expiry only: {}",
                    subject_id,
                    self.revocations.backend_name(),
                    e
                );
                metrics::counter!("tollgate_revocation_write_failures_total").increment(1);
                RecordOutcome::Failed
            }
        }
    }
}

/// Cheap hasher for tests
#[cfg(test)]
pub(crate) fn fast_hasher() -> CredentialHasher {
    CredentialHasher::new(tollgate_auth::HashingConfig {
        memory_kib: 8,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}
