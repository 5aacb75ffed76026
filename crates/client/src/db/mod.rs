//! Local SQLite cache.
//!
//! The backend services are the source of truth. This cache only keeps what
//! the client needs to browse offline and to remember the login:
//!
//! ## Tables
//!
//! - `products` - Catalog snapshot refreshed by `CatalogService::sync_products`
//! - `orders` - Order snapshots written after checkout
//! - `routes` - Routes created by an administrator
//! - `addresses` - Per-user copy of the address book
//! - `session` - The persisted login (single row)
//!
//! # Migrations
//!
//! Migrations live in `crates/client/migrations/` and are embedded at build
//! time. [`migrate`] is idempotent and runs on every start.

use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::SqlitePoolOptions;
use thiserror::Error;

pub mod addresses;
pub mod orders;
pub mod products;
pub mod routes;
pub mod session;

pub use addresses::AddressRepository;
pub use orders::{NewOrderSnapshot, OrderRepository, OrderSnapshot};
pub use products::{CachedProduct, ProductRepository};
pub use routes::{RouteRepository, RouteSnapshot};
pub use session::{Session, SessionRepository};

/// Errors from cache operations.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Embedded migrations failed to apply.
    #[error("migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    /// Data in the database is corrupted or invalid.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// Requested entity was not found.
    #[error("not found")]
    NotFound,
}

/// Open (and create if needed) the cache database.
///
/// # Errors
///
/// Returns `sqlx::Error` if the database cannot be opened.
pub async fn create_pool(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    SqlitePoolOptions::new()
        .max_connections(5)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
}

/// Apply embedded migrations.
///
/// # Errors
///
/// Returns `RepositoryError::Migration` if a migration fails.
pub async fn migrate(pool: &SqlitePool) -> Result<(), RepositoryError> {
    sqlx::migrate!("./migrations").run(pool).await?;
    Ok(())
}

/// A migrated in-memory database for tests.
///
/// A single connection that never expires, since every new `:memory:`
/// connection would open an empty database.
#[cfg(test)]
#[allow(clippy::unwrap_used)]
pub(crate) async fn test_pool() -> SqlitePool {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .idle_timeout(None)
        .max_lifetime(None)
        .connect("sqlite::memory:")
        .await
        .unwrap();
    migrate(&pool).await.unwrap();
    pool
}
