//! Local copies of routes created by an administrator.

use chrono::{DateTime, Utc};
use redthread_core::{OrderId, RouteId};
use sqlx::SqlitePool;

use super::RepositoryError;

/// A route as remembered locally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteSnapshot {
    pub id: i64,
    pub remote_id: Option<RouteId>,
    pub name: String,
    pub order_ids: Vec<OrderId>,
    pub active: bool,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct RouteRow {
    id: i64,
    remote_id: Option<RouteId>,
    name: String,
    order_ids: String,
    active: bool,
    completed: bool,
    created_at: DateTime<Utc>,
}

impl TryFrom<RouteRow> for RouteSnapshot {
    type Error = RepositoryError;

    fn try_from(row: RouteRow) -> Result<Self, Self::Error> {
        let order_ids = decode_order_ids(&row.order_ids).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid order ids for route {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            remote_id: row.remote_id,
            name: row.name,
            order_ids,
            active: row.active,
            completed: row.completed,
            created_at: row.created_at,
        })
    }
}

fn encode_order_ids(ids: &[OrderId]) -> String {
    ids.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn decode_order_ids(s: &str) -> Result<Vec<OrderId>, std::num::ParseIntError> {
    s.split(',')
        .filter(|part| !part.trim().is_empty())
        .map(str::parse)
        .collect()
}

/// Repository for local route snapshots.
pub struct RouteRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> RouteRepository<'a> {
    /// Create a new route repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Store a new active route and return its local ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the insert fails.
    pub async fn insert(
        &self,
        remote_id: Option<RouteId>,
        name: &str,
        order_ids: &[OrderId],
    ) -> Result<i64, RepositoryError> {
        let result = sqlx::query(
            r"
            INSERT INTO routes (remote_id, name, order_ids, active, completed, created_at)
            VALUES (?, ?, ?, 1, 0, ?)
            ",
        )
        .bind(remote_id)
        .bind(name)
        .bind(encode_order_ids(order_ids))
        .bind(Utc::now())
        .execute(self.pool)
        .await?;

        Ok(result.last_insert_rowid())
    }

    /// All routes, newest first.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored row is invalid.
    pub async fn list(&self) -> Result<Vec<RouteSnapshot>, RepositoryError> {
        let rows: Vec<RouteRow> = sqlx::query_as(
            r"
            SELECT id, remote_id, name, order_ids, active, completed, created_at
            FROM routes
            ORDER BY created_at DESC, id DESC
            ",
        )
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(RouteSnapshot::try_from).collect()
    }

    /// Get a route by local ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored row is invalid.
    pub async fn get(&self, id: i64) -> Result<Option<RouteSnapshot>, RepositoryError> {
        let row: Option<RouteRow> = sqlx::query_as(
            r"
            SELECT id, remote_id, name, order_ids, active, completed, created_at
            FROM routes
            WHERE id = ?
            ",
        )
        .bind(id)
        .fetch_optional(self.pool)
        .await?;
        row.map(RouteSnapshot::try_from).transpose()
    }

    /// Overwrite the editable fields of a route.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no route has this ID.
    /// Returns `RepositoryError::Database` if the update fails.
    pub async fn update(&self, route: &RouteSnapshot) -> Result<(), RepositoryError> {
        let result = sqlx::query(
            r"
            UPDATE routes
            SET name = ?, order_ids = ?, active = ?, completed = ?
            WHERE id = ?
            ",
        )
        .bind(&route.name)
        .bind(encode_order_ids(&route.order_ids))
        .bind(route.active)
        .bind(route.completed)
        .bind(route.id)
        .execute(self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }

    /// Delete a route.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::NotFound` if no route has this ID.
    /// Returns `RepositoryError::Database` if the delete fails.
    pub async fn delete(&self, id: i64) -> Result<(), RepositoryError> {
        let result = sqlx::query("DELETE FROM routes WHERE id = ?")
            .bind(id)
            .execute(self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(RepositoryError::NotFound);
        }
        Ok(())
    }
}
