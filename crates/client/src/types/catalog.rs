//! Catalog service wire types.

use redthread_core::{BrandId, CategoryId, ImageId, Price, ProductId, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Read Models
// =============================================================================

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
}

/// A product brand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    pub id: BrandId,
    pub name: String,
    pub active: Option<bool>,
}

/// A product image hosted by the catalog service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    pub id: ImageId,
    pub product_id: ProductId,
    pub public_url: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default)]
    pub sort_order: i32,
}

/// A catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: ProductId,
    pub name: String,
    pub description: Option<String>,
    pub base_price: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub images: Vec<Image>,
    pub category: Option<Category>,
    pub brand: Option<Brand>,
    #[serde(default)]
    pub featured: bool,
    /// `HOMBRE`, `MUJER` or `UNISEX`.
    #[serde(default)]
    pub gender: String,
}

impl Product {
    /// The image flagged as primary, falling back to the lowest sort order.
    #[must_use]
    pub fn primary_image(&self) -> Option<&Image> {
        self.images
            .iter()
            .find(|img| img.primary)
            .or_else(|| self.images.iter().min_by_key(|img| img.sort_order))
    }

    /// Base price in the store currency.
    #[must_use]
    pub fn price(&self) -> Price {
        Price::from_amount(self.base_price)
    }
}

/// A purchasable size/color combination of a product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: VariantId,
    pub product_id: ProductId,
    /// Sizing system, e.g. `LETTER` or `NUMERIC`.
    pub size_type: String,
    pub size_value: String,
    pub color: String,
    pub sku: String,
    pub price_override: Option<Decimal>,
    pub stock: Option<i32>,
}

impl Variant {
    /// Effective unit price: the override if present, else the product base price.
    #[must_use]
    pub fn effective_price(&self, product: &Product) -> Price {
        Price::from_amount(self.price_override.unwrap_or(product.base_price))
    }
}

const fn default_true() -> bool {
    true
}

// =============================================================================
// Admin Requests
// =============================================================================

/// Body for `POST products` and `PUT products/{id}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub category_id: CategoryId,
    pub brand_id: BrandId,
    pub name: String,
    pub description: Option<String>,
    /// Whole pesos.
    pub base_price: i64,
    pub featured: bool,
    pub gender: String,
}

/// Body for `POST variants`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateVariantRequest {
    pub product_id: ProductId,
    pub size_type: String,
    pub size_value: String,
    pub color: String,
    pub sku: String,
    pub price_override: Option<i64>,
    pub stock: i32,
}

/// Body for `POST products/{id}/images/from-url`.
#[derive(Debug, Clone, Serialize)]
pub struct UploadImageUrlRequest {
    pub url: String,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const PRODUCT_JSON: &str = r#"{
        "id": 7,
        "name": "Polera Oversize",
        "description": null,
        "basePrice": 19990,
        "active": true,
        "images": [
            {"id": 1, "productId": 7, "publicUrl": "https://cdn/a.jpg", "primary": false, "sortOrder": 2},
            {"id": 2, "productId": 7, "publicUrl": "https://cdn/b.jpg", "primary": false, "sortOrder": 1}
        ],
        "category": {"id": 3, "name": "Poleras", "description": null, "active": true},
        "brand": {"id": 4, "name": "RedThread"},
        "featured": true,
        "gender": "UNISEX"
    }"#;

    #[test]
    fn test_product_deserializes_numeric_price() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.base_price, Decimal::from(19990));
        assert_eq!(product.price().to_string(), "$19990");
        assert_eq!(product.brand.unwrap().active, None);
    }

    #[test]
    fn test_primary_image_falls_back_to_sort_order() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        assert_eq!(product.primary_image().unwrap().id, ImageId::new(2));
    }

    #[test]
    fn test_product_missing_optional_lists() {
        let json = r#"{"id":1,"name":"Gorro","basePrice":5990}"#;
        let product: Product = serde_json::from_str(json).unwrap();
        assert!(product.images.is_empty());
        assert!(product.active);
        assert!(!product.featured);
    }

    #[test]
    fn test_variant_effective_price() {
        let product: Product = serde_json::from_str(PRODUCT_JSON).unwrap();
        let variant: Variant = serde_json::from_str(
            r#"{"id":9,"productId":7,"sizeType":"LETTER","sizeValue":"M","color":"Negro","sku":"PO-M-N","priceOverride":17990,"stock":4}"#,
        )
        .unwrap();
        assert_eq!(variant.effective_price(&product).amount, Decimal::from(17990));

        let plain = Variant {
            price_override: None,
            ..variant
        };
        assert_eq!(plain.effective_price(&product).amount, Decimal::from(19990));
    }
}
