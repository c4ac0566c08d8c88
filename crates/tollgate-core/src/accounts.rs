//! Account service
//!
//! Registration, profiles and addresses. Every method that touches an
//! existing account runs the authorization guard first.

use std::sync::Arc;
use tracing::info;

use tollgate_auth::CredentialHasher;
use tollgate_db::{Address, AddressFields, Database, DbError, NewUser, User};

use crate::directory::AddressOwners;
use crate::error::{CoreError, internal};
use crate::guard::{AuthorizationGuard, Decision};
use crate::validation::{require_field, validate_email, validate_name, validate_new_secret};

#[derive(Clone)]
pub struct AccountService {
    db: Database,
    hasher: Arc<CredentialHasher>,
    guard: AuthorizationGuard,
    owners: AddressOwners,
}

impl AccountService {
    pub fn new(db: Database, hasher: Arc<CredentialHasher>, guard: AuthorizationGuard) -> Self {
        Self {
            owners: AddressOwners(db.clone()),
            db,
            hasher,
            guard,
        }
    }

    pub fn guard(&self) -> &AuthorizationGuard {
        &self.guard
    }

    /// Decide whether `caller` may act on an address without touching it
    pub async fn authorize_address(
        &self,
        caller: i64,
        user_id: i64,
        address_id: i64,
    ) -> Result<Decision, CoreError> {
        match self
            .guard
            .require_resource(caller, user_id, address_id, &self.owners, "address")
            .await
        {
            Ok(()) => Ok(Decision::Allow),
            Err(CoreError::Forbidden) => Ok(Decision::Deny),
            Err(e) => Err(e),
        }
    }

    // ==================== Registration ====================

    /// Create an account
    pub async fn register(&self, email: &str, secret: &str) -> Result<User, CoreError> {
        validate_email(email)?;
        validate_new_secret(secret)?;

        let hasher = Arc::clone(&self.hasher);
        let owned_secret = secret.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&owned_secret))
            .await
            .map_err(|e| internal("credential hashing task", e))?
            .map_err(|e| internal("credential hashing", e))?;

        let user = self
            .db
            .insert_user(NewUser {
                email: email.trim().to_string(),
                password_hash,
            })
            .await
            .map_err(|e| match e {
                DbError::Duplicate(_) => CoreError::Conflict("Email already registered".to_string()),
                other => internal("user insert", other),
            })?;

        info!("Registered user {}", user.id);
        Ok(user)
    }

    // ==================== Profile ====================

    pub async fn profile(&self, caller: i64, user_id: i64) -> Result<User, CoreError> {
        self.guard.require(caller, user_id)?;

        self.db
            .get_user_by_id(user_id)
            .await
            .map_err(|e| internal("user lookup", e))?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user_id)))
    }

    pub async fn update_profile(
        &self,
        caller: i64,
        user_id: i64,
        first_name: &str,
        last_name: &str,
    ) -> Result<User, CoreError> {
        self.guard.require(caller, user_id)?;
        validate_name("First name", first_name)?;
        validate_name("Last name", last_name)?;

        self.db
            .update_user_profile(user_id, first_name.trim(), last_name.trim())
            .await
            .map_err(|e| internal("profile update", e))?
            .ok_or_else(|| CoreError::NotFound(format!("user {}", user_id)))
    }

    // ==================== Addresses ====================

    pub async fn list_addresses(&self, caller: i64, user_id: i64) -> Result<Vec<Address>, CoreError> {
        self.guard.require(caller, user_id)?;

        self.db
            .list_addresses(user_id)
            .await
            .map_err(|e| internal("address list", e))
    }

    /// Add an address; the owner is always the path user
    pub async fn add_address(
        &self,
        caller: i64,
        user_id: i64,
        fields: AddressFields,
    ) -> Result<Address, CoreError> {
        self.guard.require(caller, user_id)?;
        validate_address(&fields)?;

        let address = self
            .db
            .insert_address(user_id, fields)
            .await
            .map_err(|e| internal("address insert", e))?;

        info!("User {} added address {}", user_id, address.id);
        Ok(address)
    }

    pub async fn update_address(
        &self,
        caller: i64,
        user_id: i64,
        address_id: i64,
        fields: AddressFields,
    ) -> Result<Address, CoreError> {
        self.guard
            .require_resource(caller, user_id, address_id, &self.owners, "address")
            .await?;
        validate_address(&fields)?;

        self.db
            .update_address(address_id, fields)
            .await
            .map_err(|e| internal("address update", e))?
            .ok_or_else(|| CoreError::NotFound(format!("address {}", address_id)))
    }

    pub async fn delete_address(
        &self,
        caller: i64,
        user_id: i64,
        address_id: i64,
    ) -> Result<(), CoreError> {
        self.guard
            .require_resource(caller, user_id, address_id, &self.owners, "address")
            .await?;

        let deleted = self
            .db
            .delete_address(address_id)
            .await
            .map_err(|e| internal("address delete", e))?;
        if !deleted {
            return Err(CoreError::NotFound(format!("address {}", address_id)));
        }

        info!("User {} deleted address {}", user_id, address_id);
        Ok(())
    }
}

fn validate_address(fields: &AddressFields) -> Result<(), CoreError> {
    require_field("Street", &fields.street)?;
    require_field("City", &fields.city)?;
    require_field("Postal code", &fields.postal_code)?;
    require_field("Country", &fields.country)?;
    Ok(())
}
