//! Cache types for catalog responses.

use redthread_core::{ProductId, VariantId};

use crate::types::{Brand, Category, Image, Product, Variant};

/// Cache key for catalog reads.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub enum CacheKey {
    Categories,
    Brands,
    Products,
    Product(ProductId),
    Variants(ProductId),
    Variant(VariantId),
    Images(ProductId),
}

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Categories(Vec<Category>),
    Brands(Vec<Brand>),
    Products(Vec<Product>),
    Product(Box<Product>),
    Variants(Vec<Variant>),
    Variant(Box<Variant>),
    Images(Vec<Image>),
}
