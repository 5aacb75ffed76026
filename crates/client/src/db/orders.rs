//! Order snapshots kept after checkout.

use chrono::{DateTime, Utc};
use redthread_core::{OrderId, Price};
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use super::RepositoryError;
use crate::types::OrderItemRes;

/// Status given to a snapshot when it is first written.
pub const DEFAULT_STATUS: &str = "pendiente";

/// A locally stored order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSnapshot {
    /// Local row ID.
    pub id: i64,
    /// ID assigned by the orders service, if the order was placed remotely.
    pub remote_id: Option<OrderId>,
    pub user_email: String,
    pub address: String,
    pub total: Price,
    pub items: Vec<OrderItemRes>,
    pub created_at: DateTime<Utc>,
    pub delivered: bool,
    pub status: String,
}

/// Data for a new order snapshot.
#[derive(Debug, Clone)]
pub struct NewOrderSnapshot {
    pub remote_id: Option<OrderId>,
    pub user_email: String,
    pub address: String,
    pub total: Decimal,
    pub items: Vec<OrderItemRes>,
}

#[derive(sqlx::FromRow)]
struct OrderRow {
    id: i64,
    remote_id: Option<OrderId>,
    user_email: String,
    address: String,
    total: String,
    items: String,
    created_at: DateTime<Utc>,
    delivered: bool,
    status: String,
}

impl TryFrom<OrderRow> for OrderSnapshot {
    type Error = RepositoryError;

    fn try_from(row: OrderRow) -> Result<Self, Self::Error> {
        let total: Decimal = row.total.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid total for order {}: {e}", row.id))
        })?;
        let items: Vec<OrderItemRes> = serde_json::from_str(&row.items).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid items for order {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            remote_id: row.remote_id,
            user_email: row.user_email,
            address: row.address,
            total: Price::from_amount(total),
            items,
            created_at: row.created_at,
            delivered: row.delivered,
            status: row.status,
        })
    }
}

/// Repository for order snapshots.
pub struct OrderRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> OrderRepository<'a> {
    /// Create a new order repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a snapshot and return its local ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert_returning_id(&self, order: &NewOrderSnapshot) -> Result<i64, RepositoryError> {
        let items = serde_json::to_string(&order.items)
            .map_err(|e| RepositoryError::DataCorruption(format!("unserializable items: {e}")))?;

        let result = sqlx::query(
            r"
            INSERT INTO orders (remote_id, user_email, address, total, items, created_at, delivered, status)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?)
            ",
        )
        .bind(order.remote_id)
        .bind(&order.user_email)
        .bind(&order.address)
        .bind(order.total.to_string())
        .bind(items)
        .bind(Utc::now())
        .bind(DEFAULT_STATUS)
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// Snapshots for a user, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list_for(&self, user_email: &str) -> Result<Vec<OrderSnapshot>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, remote_id, user_email, address, total, items, created_at, delivered, status
            FROM orders
            WHERE user_email = ?
            ORDER BY created_at DESC, id DESC
            ",
        )
        .bind(user_email)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(OrderSnapshot::try_from).collect()
    }

    /// All snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list(&self) -> Result<Vec<OrderSnapshot>, RepositoryError> {
        let rows: Vec<OrderRow> = sqlx::query_as(
            r"
            SELECT id, remote_id, user_email, address, total, items, created_at, delivered, status
            FROM orders
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(OrderSnapshot::try_from).collect()
    }

    /// Get a snapshot by local ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: i64) -> Result<Option<OrderSnapshot>, RepositoryError> {
        let row: Option<OrderRow> = sqlx::query_as(
            r"
            SELECT id, remote_id, user_email, address, total, items, created_at, delivered, status
            FROM orders
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(OrderSnapshot::try_from).transpose()
    }

    /// Update the status and delivered flag of a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no snapshot has this ID.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update_status(
        &self,
        id: i64,
        status: &str,
        delivered: bool,
    ) -> Result<(), RepositoryError> {
        let result = sqlx::query("UPDATE orders SET status = ?, delivered = ? WHERE id = ?")
            .bind(status)
            .bind(delivered)
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a snapshot.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no snapshot has this ID.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM orders WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
