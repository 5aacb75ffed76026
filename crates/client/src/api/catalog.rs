//! Catalog service client.
//!
//! Reads are cached in memory for 5 minutes; any admin write clears the cache.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use moka::future::Cache;
use redthread_core::{ImageId, ProductId, VariantId};
use reqwest::Method;
use tracing::{debug, instrument};
use url::Url;

use super::cache::{CacheKey, CacheValue};
use super::{ApiError, CatalogApi, ServiceHttp, file_part};
use crate::types::{
    Brand, Category, CreateProductRequest, CreateVariantRequest, Image, Product,
    UploadImageUrlRequest, Variant,
};

/// Client for the catalog service.
#[derive(Clone)]
pub struct CatalogClient {
    inner: Arc<CatalogClientInner>,
}

struct CatalogClientInner {
    http: ServiceHttp,
    cache: Cache<CacheKey, CacheValue>,
}

impl CatalogClient {
    /// Create a new catalog client. Catalog endpoints are public, so no
    /// credentials are attached.
    #[must_use]
    pub fn new(client: reqwest::Client, base: Url) -> Self {
        let cache = Cache::builder()
            .max_capacity(1000)
            .time_to_live(Duration::from_secs(300)) // 5 minutes
            .build();

        Self {
            inner: Arc::new(CatalogClientInner {
                http: ServiceHttp::new(client, base, None),
                cache,
            }),
        }
    }

    /// Drop every cached read.
    pub fn invalidate(&self) {
        self.inner.cache.invalidate_all();
        debug!("Catalog cache invalidated");
    }

    async fn cached(&self, key: &CacheKey) -> Option<CacheValue> {
        let hit = self.inner.cache.get(key).await;
        if hit.is_some() {
            debug!(?key, "Cache hit");
        }
        hit
    }

    async fn store(&self, key: CacheKey, value: CacheValue) {
        self.inner.cache.insert(key, value).await;
    }
}

#[async_trait]
impl CatalogApi for CatalogClient {
    // =========================================================================
    // Reads
    // =========================================================================

    #[instrument(skip(self))]
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        if let Some(CacheValue::Categories(list)) = self.cached(&CacheKey::Categories).await {
            return Ok(list);
        }
        let list: Vec<Category> = self.inner.http.get("categories").await?;
        self.store(CacheKey::Categories, CacheValue::Categories(list.clone()))
            .await;
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        if let Some(CacheValue::Brands(list)) = self.cached(&CacheKey::Brands).await {
            return Ok(list);
        }
        let list: Vec<Brand> = self.inner.http.get("brands").await?;
        self.store(CacheKey::Brands, CacheValue::Brands(list.clone()))
            .await;
        Ok(list)
    }

    #[instrument(skip(self))]
    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        if let Some(CacheValue::Products(list)) = self.cached(&CacheKey::Products).await {
            return Ok(list);
        }
        let list: Vec<Product> = self.inner.http.get("products").await?;
        self.store(CacheKey::Products, CacheValue::Products(list.clone()))
            .await;
        Ok(list)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        let key = CacheKey::Product(id);
        if let Some(CacheValue::Product(product)) = self.cached(&key).await {
            return Ok(*product);
        }
        let product: Product = self.inner.http.get(&format!("products/{id}")).await?;
        self.store(key, CacheValue::Product(Box::new(product.clone())))
            .await;
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, ApiError> {
        let key = CacheKey::Variants(product_id);
        if let Some(CacheValue::Variants(list)) = self.cached(&key).await {
            return Ok(list);
        }
        let list: Vec<Variant> = self
            .inner
            .http
            .get(&format!("variants?productId={product_id}"))
            .await?;
        self.store(key, CacheValue::Variants(list.clone())).await;
        Ok(list)
    }

    #[instrument(skip(self), fields(variant_id = %id))]
    async fn variant(&self, id: VariantId) -> Result<Variant, ApiError> {
        let key = CacheKey::Variant(id);
        if let Some(CacheValue::Variant(variant)) = self.cached(&key).await {
            return Ok(*variant);
        }
        let variant: Variant = self.inner.http.get(&format!("variants/{id}")).await?;
        self.store(key, CacheValue::Variant(Box::new(variant.clone())))
            .await;
        Ok(variant)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn images(&self, product_id: ProductId) -> Result<Vec<Image>, ApiError> {
        let key = CacheKey::Images(product_id);
        if let Some(CacheValue::Images(list)) = self.cached(&key).await {
            return Ok(list);
        }
        let list: Vec<Image> = self
            .inner
            .http
            .get(&format!("products/{product_id}/images"))
            .await?;
        self.store(key, CacheValue::Images(list.clone())).await;
        Ok(list)
    }

    // =========================================================================
    // Admin Writes
    // =========================================================================

    #[instrument(skip(self, req), fields(name = %req.name))]
    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError> {
        let product = self.inner.http.send(Method::POST, "products", req).await?;
        self.invalidate();
        Ok(product)
    }

    #[instrument(skip(self, req), fields(product_id = %id))]
    async fn update_product(
        &self,
        id: ProductId,
        req: &CreateProductRequest,
    ) -> Result<Product, ApiError> {
        let product = self
            .inner
            .http
            .send(Method::PUT, &format!("products/{id}"), req)
            .await?;
        self.invalidate();
        Ok(product)
    }

    #[instrument(skip(self), fields(product_id = %id))]
    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.inner
            .http
            .send_empty::<()>(Method::DELETE, &format!("products/{id}"), None)
            .await?;
        self.invalidate();
        Ok(())
    }

    #[instrument(skip(self, req), fields(product_id = %req.product_id, sku = %req.sku))]
    async fn create_variant(&self, req: &CreateVariantRequest) -> Result<Variant, ApiError> {
        let variant = self.inner.http.send(Method::POST, "variants", req).await?;
        self.invalidate();
        Ok(variant)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn upload_image(&self, product_id: ProductId, file: PathBuf) -> Result<Image, ApiError> {
        let form = reqwest::multipart::Form::new().part("file", file_part(&file).await?);
        let image = self
            .inner
            .http
            .send_multipart(&format!("products/{product_id}/images/upload"), form)
            .await?;
        self.invalidate();
        Ok(image)
    }

    #[instrument(skip(self), fields(product_id = %product_id))]
    async fn upload_image_from_url(
        &self,
        product_id: ProductId,
        url: &str,
    ) -> Result<Image, ApiError> {
        let body = UploadImageUrlRequest {
            url: url.to_string(),
        };
        let image = self
            .inner
            .http
            .send(
                Method::POST,
                &format!("products/{product_id}/images/from-url"),
                &body,
            )
            .await?;
        self.invalidate();
        Ok(image)
    }

    #[instrument(skip(self), fields(product_id = %product_id, image_id = %image_id))]
    async fn mark_primary_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ApiError> {
        self.inner
            .http
            .send_empty::<()>(
                Method::POST,
                &format!("products/{product_id}/images/{image_id}/primary"),
                None,
            )
            .await?;
        self.invalidate();
        Ok(())
    }

    #[instrument(skip(self), fields(product_id = %product_id, image_id = %image_id))]
    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<(), ApiError> {
        self.inner
            .http
            .send_empty::<()>(
                Method::DELETE,
                &format!("products/{product_id}/images/{image_id}"),
                None,
            )
            .await?;
        self.invalidate();
        Ok(())
    }
}
