//! Per-user copy of the address book.

use redthread_core::{AddressId, UserId};
use sqlx::SqlitePool;

use super::RepositoryError;
use crate::types::Address;

#[derive(sqlx::FromRow)]
struct AddressRow {
    id: AddressId,
    line1: String,
    line2: Option<String>,
    city: String,
    state: String,
    zip: String,
    country: String,
    is_default: bool,
}

impl From<AddressRow> for Address {
    fn from(row: AddressRow) -> Self {
        Self {
            id: row.id,
            line1: row.line1,
            line2: row.line2,
            city: row.city,
            state: row.state,
            zip: row.zip,
            country: row.country,
            default: row.is_default,
        }
    }
}

/// Repository for cached addresses.
pub struct AddressRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> AddressRepository<'a> {
    /// Create a new address repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace a user's cached addresses with the given list.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails.
    pub async fn replace_for_user(
        &self,
        user_id: UserId,
        addresses: &[Address],
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM addresses WHERE user_id = ?")
            .bind(user_id)
            .execute(&mut *tx)
            .await?;

        for address in addresses {
            sqlx::query(
                r"
                INSERT OR REPLACE INTO addresses
                    (id, user_id, line1, line2, city, state, zip, country, is_default)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(address.id)
            .bind(user_id)
            .bind(&address.line1)
            .bind(&address.line2)
            .bind(&address.city)
            .bind(&address.state)
            .bind(&address.zip)
            .bind(&address.country)
            .bind(address.default)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    /// A user's cached addresses, default first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn list_for_user(&self, user_id: UserId) -> Result<Vec<Address>, RepositoryError> {
        let rows: Vec<AddressRow> = sqlx::query_as(
            r"
            SELECT id, line1, line2, city, state, zip, country, is_default
            FROM addresses
            WHERE user_id = ?
            ORDER BY is_default DESC, id
            ",
        )
        .bind(user_id)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(Address::from).collect())
    }

    /// The user's default address, if one is cached.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn default_for_user(&self, user_id: UserId) -> Result<Option<Address>, RepositoryError> {
        let row: Option<AddressRow> = sqlx::query_as(
            r"
            SELECT id, line1, line2, city, state, zip, country, is_default
            FROM addresses
            WHERE user_id = ? AND is_default = 1
            LIMIT 1
            ",
        )
        .bind(user_id)
        .fetch_optional(self.pool)
        .await?;
        Ok(row.map(Address::from))
    }

    /// Remove one cached address.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: AddressId) -> Result<(), RepositoryError> {
        sqlx::query("DELETE FROM addresses WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;
        Ok(())
    }
}
