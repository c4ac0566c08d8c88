//! Account and ownership lookups
//!
//! The session manager and the authorization guard only need two questions
//! answered by the persistence layer: who owns this email, and who owns this
//! resource. Both are traits so the core can be driven without a database.

use async_trait::async_trait;
use thiserror::Error;

use tollgate_db::Database;

/// Account fields needed to authenticate a login
#[derive(Debug, Clone)]
pub struct Account {
    pub id: i64,
    pub email: String,
    pub credential_hash: String,
}

#[derive(Error, Debug)]
#[error("Directory lookup failed: {0}")]
pub struct DirectoryError(pub String);

/// Lookup of accounts by login email or ID
#[async_trait]
pub trait AccountDirectory: Send + Sync {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError>;

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, DirectoryError>;
}

/// Lookup of the owning subject of a sub-resource
#[async_trait]
pub trait OwnerDirectory: Send + Sync {
    async fn find_resource_owner(&self, resource_id: i64) -> Result<Option<i64>, DirectoryError>;
}

#[async_trait]
impl AccountDirectory for Database {
    async fn find_account_by_email(&self, email: &str) -> Result<Option<Account>, DirectoryError> {
        let user = self
            .get_user_by_email(email)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;

        Ok(user.map(|u| Account {
            id: u.id,
            email: u.email,
            credential_hash: u.password_hash,
        }))
    }

    async fn find_account_by_id(&self, id: i64) -> Result<Option<Account>, DirectoryError> {
        let user = self
            .get_user_by_id(id)
            .await
            .map_err(|e| DirectoryError(e.to_string()))?;

        Ok(user.map(|u| Account {
            id: u.id,
            email: u.email,
            credential_hash: u.password_hash,
        }))
    }
}

/// Owner lookup for address records
#[derive(Clone)]
pub struct AddressOwners(pub Database);

#[async_trait]
impl OwnerDirectory for AddressOwners {
    async fn find_resource_owner(&self, resource_id: i64) -> Result<Option<i64>, DirectoryError> {
        self.0
            .get_address_owner(resource_id)
            .await
            .map_err(|e| DirectoryError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_db::{AddressFields, NewUser};

    #[tokio::test]
    async fn test_database_account_lookup() {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .insert_user(NewUser {
                email: "u@x.com".to_string(),
                password_hash: "$argon2id$stub".to_string(),
            })
            .await
            .unwrap();

        let by_email = db.find_account_by_email("U@X.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, user.id);
        assert_eq!(by_email.credential_hash, "$argon2id$stub");

        let by_id = db.find_account_by_id(user.id).await.unwrap().unwrap();
        assert_eq!(by_id.email, "u@x.com");

        assert!(db.find_account_by_email("nobody@x.com").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_address_owner_lookup() {
        let db = Database::in_memory().await.unwrap();
        let user = db
            .insert_user(NewUser {
                email: "u@x.com".to_string(),
                password_hash: "hash".to_string(),
            })
            .await
            .unwrap();
        let address = db
            .insert_address(
                user.id,
                AddressFields {
                    street: "1 Main St".to_string(),
                    city: "Springfield".to_string(),
                    postal_code: "62701".to_string(),
                    country: "US".to_string(),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let owners = AddressOwners(db);
        assert_eq!(owners.find_resource_owner(address.id).await.unwrap(), Some(user.id));
        assert_eq!(owners.find_resource_owner(address.id + 1).await.unwrap(), None);
    }
}
