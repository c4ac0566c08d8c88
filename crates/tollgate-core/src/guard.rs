//! Authorization guard
//!
//! Every profile and address operation is checked here before any data is
//! read or changed. The decision itself is delegated to an [`AccessPolicy`];
//! today the only policy is [`OwnerOnly`].

use serde::Serialize;
use std::sync::Arc;
use tracing::debug;

use crate::directory::OwnerDirectory;
use crate::error::{CoreError, internal};

/// Outcome of an authorization check
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

impl Decision {
    pub fn is_allowed(self) -> bool {
        self == Decision::Allow
    }
}

/// Decides whether a subject may act on a resource owned by another subject
pub trait AccessPolicy: Send + Sync {
    fn decide(&self, claimed_subject_id: i64, resource_owner_id: i64) -> Decision;

    fn name(&self) -> &'static str;
}

/// A subject may only act on its own resources
#[derive(Debug, Default, Clone, Copy)]
pub struct OwnerOnly;

impl AccessPolicy for OwnerOnly {
    fn decide(&self, claimed_subject_id: i64, resource_owner_id: i64) -> Decision {
        if claimed_subject_id == resource_owner_id {
            Decision::Allow
        } else {
            Decision::Deny
        }
    }

    fn name(&self) -> &'static str {
        "owner-only"
    }
}

#[derive(Clone)]
pub struct AuthorizationGuard {
    policy: Arc<dyn AccessPolicy>,
}

impl Default for AuthorizationGuard {
    fn default() -> Self {
        Self::new(Arc::new(OwnerOnly))
    }
}

impl std::fmt::Debug for AuthorizationGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthorizationGuard")
            .field("policy", &self.policy.name())
            .finish()
    }
}

impl AuthorizationGuard {
    pub fn new(policy: Arc<dyn AccessPolicy>) -> Self {
        Self { policy }
    }

    pub fn authorize(&self, claimed_subject_id: i64, resource_owner_id: i64) -> Decision {
        self.policy.decide(claimed_subject_id, resource_owner_id)
    }

    /// Like [`authorize`](Self::authorize) but a denial is an error
    pub fn require(&self, claimed_subject_id: i64, resource_owner_id: i64) -> Result<(), CoreError> {
        match self.authorize(claimed_subject_id, resource_owner_id) {
            Decision::Allow => Ok(()),
            Decision::Deny => {
                debug!(
                    "Denied subject {} access to resources of {} ({})",
                    claimed_subject_id,
                    resource_owner_id,
                    self.policy.name()
                );
                Err(CoreError::Forbidden)
            }
        }
    }

    /// Check a sub-resource addressed as `/{path_owner}/.../{resource_id}`
    ///
    /// The path owner is checked first. The stored owner of the resource is
    /// then looked up and checked as well, so a caller cannot reach another
    /// subject's record by putting its own ID in the path.
    pub async fn require_resource(
        &self,
        claimed_subject_id: i64,
        path_owner_id: i64,
        resource_id: i64,
        owners: &dyn OwnerDirectory,
        kind: &str,
    ) -> Result<(), CoreError> {
        self.require(claimed_subject_id, path_owner_id)?;

        let owner = owners
            .find_resource_owner(resource_id)
            .await
            .map_err(|e| internal("resource owner lookup", e))?
            .ok_or_else(|| CoreError::NotFound(format!("{} {}", kind, resource_id)))?;

        self.require(claimed_subject_id, owner)
    }
}
