//! Catalog browsing, admin writes and the offline product cache.

use std::path::PathBuf;
use std::sync::Arc;

use redthread_core::{ImageId, ProductId, Quantity, VariantId};
use sqlx::SqlitePool;
use tracing::{info, instrument};

use super::NewCartLine;
use crate::api::CatalogApi;
use crate::db::{CachedProduct, ProductRepository};
use crate::error::ClientError;
use crate::types::{
    Brand, Category, CreateProductRequest, CreateVariantRequest, Image, Product, Variant,
};

#[derive(Clone)]
pub struct CatalogService {
    catalog: Arc<dyn CatalogApi>,
    pool: SqlitePool,
}

impl CatalogService {
    #[must_use]
    pub fn new(catalog: Arc<dyn CatalogApi>, pool: SqlitePool) -> Self {
        Self { catalog, pool }
    }

    /// All categories.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn categories(&self) -> Result<Vec<Category>, ClientError> {
        Ok(self.catalog.categories().await?)
    }

    /// All brands.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn brands(&self) -> Result<Vec<Brand>, ClientError> {
        Ok(self.catalog.brands().await?)
    }

    /// All products (cached for five minutes).
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn products(&self) -> Result<Vec<Product>, ClientError> {
        Ok(self.catalog.products().await?)
    }

    /// One product with its images.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn product(&self, id: ProductId) -> Result<Product, ClientError> {
        Ok(self.catalog.product(id).await?)
    }

    /// Variants of a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, ClientError> {
        Ok(self.catalog.variants(product_id).await?)
    }

    /// One variant.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn variant(&self, id: VariantId) -> Result<Variant, ClientError> {
        Ok(self.catalog.variant(id).await?)
    }

    /// Images of a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn images(&self, product_id: ProductId) -> Result<Vec<Image>, ClientError> {
        Ok(self.catalog.images(product_id).await?)
    }

    /// Resolve a variant into a cart line priced at its effective price.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the variant or its product cannot be
    /// fetched.
    pub async fn cart_line(
        &self,
        variant_id: VariantId,
        quantity: Quantity,
    ) -> Result<NewCartLine, ClientError> {
        let variant = self.catalog.variant(variant_id).await?;
        let product = self.catalog.product(variant.product_id).await?;
        Ok(NewCartLine {
            product_id: product.id,
            variant_id,
            unit_price: variant.effective_price(&product),
            name: product.name,
            size: variant.size_value,
            color: variant.color,
            quantity,
        })
    }

    // =========================================================================
    // Admin
    // =========================================================================

    /// Create a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self, req), fields(name = %req.name))]
    pub async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ClientError> {
        Ok(self.catalog.create_product(req).await?)
    }

    /// Replace a product's editable fields.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self, req))]
    pub async fn update_product(
        &self,
        id: ProductId,
        req: &CreateProductRequest,
    ) -> Result<Product, ClientError> {
        Ok(self.catalog.update_product(id, req).await?)
    }

    /// Delete a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: ProductId) -> Result<(), ClientError> {
        Ok(self.catalog.delete_product(id).await?)
    }

    /// Add a variant to a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self, req), fields(product_id = %req.product_id, sku = %req.sku))]
    pub async fn create_variant(&self, req: &CreateVariantRequest) -> Result<Variant, ClientError> {
        Ok(self.catalog.create_variant(req).await?)
    }

    /// Upload an image file as multipart `file`.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self))]
    pub async fn upload_image(&self, product_id: ProductId, file: PathBuf) -> Result<Image, ClientError> {
        Ok(self.catalog.upload_image(product_id, file).await?)
    }

    /// Attach an image by URL.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    #[instrument(skip(self))]
    pub async fn upload_image_from_url(
        &self,
        product_id: ProductId,
        url: &str,
    ) -> Result<Image, ClientError> {
        Ok(self.catalog.upload_image_from_url(product_id, url).await?)
    }

    /// Make an image the product's primary one.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn mark_primary_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError> {
        Ok(self.catalog.mark_primary_image(product_id, image_id).await?)
    }

    /// Remove an image from a product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog call fails.
    pub async fn delete_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ClientError> {
        Ok(self.catalog.delete_image(product_id, image_id).await?)
    }

    // =========================================================================
    // Offline cache
    // =========================================================================

    /// Replace the cached product list with the catalog's current one.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the catalog cannot be fetched and
    /// `ClientError::Repository` if the cache write fails. The previous
    /// cache is kept in both cases.
    #[instrument(skip(self))]
    pub async fn sync_products(&self) -> Result<usize, ClientError> {
        let products = self.catalog.products().await?;
        let count = ProductRepository::new(&self.pool)
            .replace_all(&products)
            .await?;
        info!(count, "Product cache synced");
        Ok(count)
    }

    /// All cached products ordered by name.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn cached_products(&self) -> Result<Vec<CachedProduct>, ClientError> {
        Ok(ProductRepository::new(&self.pool).list().await?)
    }

    /// One cached product.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn cached_product(&self, id: ProductId) -> Result<Option<CachedProduct>, ClientError> {
        Ok(ProductRepository::new(&self.pool).get(id).await?)
    }

    /// Cached featured products.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn featured(&self) -> Result<Vec<CachedProduct>, ClientError> {
        Ok(ProductRepository::new(&self.pool).featured().await?)
    }

    /// Cached products of a category.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn by_category(&self, category: &str) -> Result<Vec<CachedProduct>, ClientError> {
        Ok(ProductRepository::new(&self.pool).by_category(category).await?)
    }

    /// Distinct subcategories within a category, sorted.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn subcategories(&self, category: &str) -> Result<Vec<String>, ClientError> {
        Ok(ProductRepository::new(&self.pool)
            .subcategories(category)
            .await?)
    }

    /// Number of cached products.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn count(&self) -> Result<i64, ClientError> {
        Ok(ProductRepository::new(&self.pool).count().await?)
    }
}
