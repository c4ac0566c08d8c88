//! Address operations

use chrono::Utc;
use sqlx::Row;

use crate::error::DbError;
use crate::models::{Address, AddressFields};
use crate::repository::Database;

impl Database {
    /// List addresses belonging to a user
    pub async fn list_addresses(&self, user_id: i64) -> Result<Vec<Address>, DbError> {
        let rows = sqlx::query(
            r#"
            SELECT id, user_id, street, city, state, postal_code, country, is_default,
                   created_at, updated_at
            FROM addresses
            WHERE user_id = ?
            ORDER BY id
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter()
            .map(|row| Address::try_from(row).map_err(DbError::from))
            .collect()
    }

    /// Insert an address for a user
    pub async fn insert_address(
        &self,
        user_id: i64,
        fields: AddressFields,
    ) -> Result<Address, DbError> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO addresses
                (user_id, street, city, state, postal_code, country, is_default, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            RETURNING id
            "#,
        )
        .bind(user_id)
        .bind(&fields.street)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.postal_code)
        .bind(&fields.country)
        .bind(fields.is_default)
        .bind(now.to_rfc3339())
        .bind(now.to_rfc3339())
        .fetch_one(&self.pool)
        .await?;

        let id: i64 = result.get("id");

        Ok(Address {
            id,
            user_id,
            street: fields.street,
            city: fields.city,
            state: fields.state,
            postal_code: fields.postal_code,
            country: fields.country,
            is_default: fields.is_default,
            created_at: now,
            updated_at: now,
        })
    }

    /// Get an address by ID
    pub async fn get_address(&self, id: i64) -> Result<Option<Address>, DbError> {
        let result = sqlx::query(
            r#"
            SELECT id, user_id, street, city, state, postal_code, country, is_default,
                   created_at, updated_at
            FROM addresses
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        result.map(|row| Address::try_from(&row).map_err(DbError::from)).transpose()
    }

    /// Get the owning user ID of an address
    pub async fn get_address_owner(&self, id: i64) -> Result<Option<i64>, DbError> {
        let result = sqlx::query("SELECT user_id FROM addresses WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(result.map(|row| row.get("user_id")))
    }

    /// Replace the fields of an address, returns the updated address
    pub async fn update_address(
        &self,
        id: i64,
        fields: AddressFields,
    ) -> Result<Option<Address>, DbError> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            UPDATE addresses
            SET street = ?, city = ?, state = ?, postal_code = ?, country = ?,
                is_default = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&fields.street)
        .bind(&fields.city)
        .bind(&fields.state)
        .bind(&fields.postal_code)
        .bind(&fields.country)
        .bind(fields.is_default)
        .bind(now.to_rfc3339())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }
        self.get_address(id).await
    }

    /// Delete an address
    pub async fn delete_address(&self, id: i64) -> Result<bool, DbError> {
        let result = sqlx::query("DELETE FROM addresses WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
