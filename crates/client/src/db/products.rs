//! Cached catalog products for offline browsing.

use chrono::{DateTime, Utc};
use redthread_core::{Price, ProductId};
use rust_decimal::Decimal;
use sqlx::SqlitePool;

use super::RepositoryError;
use crate::types::Product;

/// A product as stored in the local cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedProduct {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    /// Category name.
    pub category: String,
    /// Target audience within the category (`HOMBRE`, `MUJER`, `UNISEX`).
    pub subcategory: String,
    pub brand: Option<String>,
    pub price: Price,
    pub featured: bool,
    pub image_url: Option<String>,
    pub synced_at: DateTime<Utc>,
}

#[derive(sqlx::FromRow)]
struct ProductRow {
    id: ProductId,
    name: String,
    description: Option<String>,
    category: String,
    subcategory: String,
    brand: Option<String>,
    price: String,
    featured: bool,
    image_url: Option<String>,
    synced_at: DateTime<Utc>,
}

impl TryFrom<ProductRow> for CachedProduct {
    type Error = RepositoryError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let amount: Decimal = row.price.parse().map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid price for product {}: {e}", row.id))
        })?;
        Ok(Self {
            id: row.id,
            name: row.name,
            description: row.description,
            category: row.category,
            subcategory: row.subcategory,
            brand: row.brand,
            price: Price::from_amount(amount),
            featured: row.featured,
            image_url: row.image_url,
            synced_at: row.synced_at,
        })
    }
}

const SELECT_COLUMNS: &str = "SELECT id, name, description, category, subcategory, brand, price, \
                              featured, image_url, synced_at FROM products";

/// Repository for cached products.
pub struct ProductRepository<'a> {
    pool: &'a SqlitePool,
}

impl<'a> ProductRepository<'a> {
    /// Create a new product repository.
    #[must_use]
    pub const fn new(pool: &'a SqlitePool) -> Self {
        Self { pool }
    }

    /// Replace the whole cache with a fresh catalog listing.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the transaction fails. Nothing
    /// is replaced in that case.
    pub async fn replace_all(&self, products: &[Product]) -> Result<usize, RepositoryError> {
        let now = Utc::now();
        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM products").execute(&mut *tx).await?;

        for product in products {
            sqlx::query(
                r"
                INSERT INTO products
                    (id, name, description, category, subcategory, brand, price, featured, image_url, synced_at)
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ",
            )
            .bind(product.id)
            .bind(&product.name)
            .bind(&product.description)
            .bind(product.category.as_ref().map_or("", |c| c.name.as_str()))
            .bind(&product.gender)
            .bind(product.brand.as_ref().map(|b| b.name.as_str()))
            .bind(product.base_price.to_string())
            .bind(product.featured)
            .bind(product.primary_image().map(|img| img.public_url.as_str()))
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(products.len())
    }

    /// All cached products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn list(&self) -> Result<Vec<CachedProduct>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} ORDER BY name"))
            .fetch_all(self.pool)
            .await?;
        rows.into_iter().map(CachedProduct::try_from).collect()
    }

    /// Featured products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn featured(&self) -> Result<Vec<CachedProduct>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE featured = 1 ORDER BY name"
        ))
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(CachedProduct::try_from).collect()
    }

    /// Products in a category, ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if a stored price is invalid.
    pub async fn by_category(&self, category: &str) -> Result<Vec<CachedProduct>, RepositoryError> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "{SELECT_COLUMNS} WHERE category = ? ORDER BY name"
        ))
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        rows.into_iter().map(CachedProduct::try_from).collect()
    }

    /// Distinct subcategories present in a category.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn subcategories(&self, category: &str) -> Result<Vec<String>, RepositoryError> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r"
            SELECT DISTINCT subcategory FROM products
            WHERE category = ? AND subcategory <> ''
            ORDER BY subcategory
            ",
        )
        .bind(category)
        .fetch_all(self.pool)
        .await?;
        Ok(rows.into_iter().map(|(s,)| s).collect())
    }

    /// Get a cached product by its catalog ID.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    /// Returns `RepositoryError::DataCorruption` if the stored price is invalid.
    pub async fn get(&self, id: ProductId) -> Result<Option<CachedProduct>, RepositoryError> {
        let row: Option<ProductRow> = sqlx::query_as(&format!("{SELECT_COLUMNS} WHERE id = ?"))
            .bind(id)
            .fetch_optional(self.pool)
            .await?;
        row.map(CachedProduct::try_from).transpose()
    }

    /// Number of cached products.
    ///
    /// # Errors
    ///
    /// Returns `RepositoryError::Database` if the query fails.
    pub async fn count(&self) -> Result<i64, RepositoryError> {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM products")
            .fetch_one(self.pool)
            .await?;
        Ok(count)
    }
}
