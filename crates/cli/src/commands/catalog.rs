//! Catalog browsing, offline cache and admin commands.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use redthread_client::AppState;
use redthread_client::db::CachedProduct;
use redthread_client::types::{CreateProductRequest, CreateVariantRequest, Product};
use redthread_core::{BrandId, CategoryId, ImageId, ProductId};

use super::{CommandError, money};

#[derive(Args)]
pub struct ProductFields {
    #[arg(long)]
    category: CategoryId,
    #[arg(long)]
    brand: BrandId,
    #[arg(short, long)]
    name: String,
    #[arg(short, long)]
    description: Option<String>,
    /// Base price in whole pesos
    #[arg(short, long)]
    price: i64,
    #[arg(long)]
    featured: bool,
    #[arg(long, default_value = "UNISEX")]
    gender: String,
}

impl From<ProductFields> for CreateProductRequest {
    fn from(fields: ProductFields) -> Self {
        Self {
            category_id: fields.category,
            brand_id: fields.brand,
            name: fields.name,
            description: fields.description,
            base_price: fields.price,
            featured: fields.featured,
            gender: fields.gender,
        }
    }
}

#[derive(Subcommand)]
pub enum CatalogAction {
    /// List categories
    Categories,
    /// List brands
    Brands,
    /// List products
    Products {
        /// Read the local cache instead of the catalog service
        #[arg(long)]
        offline: bool,
    },
    /// Show a product with its variants and images
    Product { id: ProductId },
    /// Pull the product list into the local cache
    Sync,
    /// Featured products from the local cache
    Featured,
    /// Products of a category from the local cache
    Category {
        name: String,
        /// Only show this subcategory
        #[arg(long)]
        sub: Option<String>,
    },
    /// Subcategories of a category from the local cache
    Subcategories { category: String },
    /// Create a product (admin)
    CreateProduct {
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Replace a product's fields (admin)
    UpdateProduct {
        id: ProductId,
        #[command(flatten)]
        fields: ProductFields,
    },
    /// Delete a product (admin)
    DeleteProduct { id: ProductId },
    /// Add a variant to a product (admin)
    CreateVariant {
        product: ProductId,
        #[arg(long, default_value = "LETTER")]
        size_type: String,
        #[arg(long)]
        size: String,
        #[arg(long)]
        color: String,
        #[arg(long)]
        sku: String,
        /// Price override in whole pesos
        #[arg(long)]
        price: Option<i64>,
        #[arg(long, default_value_t = 0)]
        stock: i32,
    },
    /// Upload an image file for a product (admin)
    UploadImage { product: ProductId, file: PathBuf },
    /// Attach an image by URL (admin)
    ImageUrl { product: ProductId, url: String },
    /// Make an image the primary one (admin)
    PrimaryImage { product: ProductId, image: ImageId },
    /// Remove an image (admin)
    DeleteImage { product: ProductId, image: ImageId },
}

pub async fn run(app: &AppState, action: CatalogAction) -> Result<(), CommandError> {
    let catalog = app.catalog();

    match action {
        CatalogAction::Categories => {
            for category in catalog.categories().await? {
                println!("{}  {}", category.id, category.name);
            }
        }
        CatalogAction::Brands => {
            for brand in catalog.brands().await? {
                println!("{}  {}", brand.id, brand.name);
            }
        }
        CatalogAction::Products { offline: false } => {
            for product in catalog.products().await? {
                print_product(&product);
            }
        }
        CatalogAction::Products { offline: true } => {
            print_cached(&catalog.cached_products().await?);
        }
        CatalogAction::Product { id } => {
            let product = catalog.product(id).await?;
            print_product(&product);
            if let Some(description) = &product.description {
                println!("      {description}");
            }
            for variant in catalog.variants(id).await? {
                println!(
                    "      variant {}  {} / {}  {}  stock {}",
                    variant.id,
                    variant.size_value,
                    variant.color,
                    variant.effective_price(&product),
                    variant.stock.map_or_else(|| "?".to_string(), |s| s.to_string()),
                );
            }
            for image in catalog.images(id).await? {
                let marker = if image.primary { "*" } else { " " };
                println!("      image {}{marker} {}", image.id, image.public_url);
            }
        }
        CatalogAction::Sync => {
            let count = catalog.sync_products().await?;
            println!("Cached {count} products");
        }
        CatalogAction::Featured => print_cached(&catalog.featured().await?),
        CatalogAction::Category { name, sub } => {
            let products: Vec<CachedProduct> = catalog
                .by_category(&name)
                .await?
                .into_iter()
                .filter(|p| sub.as_ref().is_none_or(|s| p.subcategory.eq_ignore_ascii_case(s)))
                .collect();
            print_cached(&products);
        }
        CatalogAction::Subcategories { category } => {
            for sub in catalog.subcategories(&category).await? {
                println!("{sub}");
            }
        }
        CatalogAction::CreateProduct { fields } => {
            let product = catalog.create_product(&fields.into()).await?;
            println!("Created product #{}", product.id);
        }
        CatalogAction::UpdateProduct { id, fields } => {
            let product = catalog.update_product(id, &fields.into()).await?;
            println!("Updated product #{}", product.id);
        }
        CatalogAction::DeleteProduct { id } => {
            catalog.delete_product(id).await?;
            println!("Deleted product #{id}");
        }
        CatalogAction::CreateVariant {
            product,
            size_type,
            size,
            color,
            sku,
            price,
            stock,
        } => {
            let req = CreateVariantRequest {
                product_id: product,
                size_type,
                size_value: size,
                color,
                sku,
                price_override: price,
                stock,
            };
            let variant = catalog.create_variant(&req).await?;
            println!("Created variant #{} ({})", variant.id, variant.sku);
        }
        CatalogAction::UploadImage { product, file } => {
            let image = catalog.upload_image(product, file).await?;
            println!("Uploaded image #{}: {}", image.id, image.public_url);
        }
        CatalogAction::ImageUrl { product, url } => {
            let image = catalog.upload_image_from_url(product, &url).await?;
            println!("Attached image #{}: {}", image.id, image.public_url);
        }
        CatalogAction::PrimaryImage { product, image } => {
            catalog.mark_primary_image(product, image).await?;
            println!("Image #{image} is now primary");
        }
        CatalogAction::DeleteImage { product, image } => {
            catalog.delete_image(product, image).await?;
            println!("Deleted image #{image}");
        }
    }
    Ok(())
}

fn print_product(product: &Product) {
    let category = product.category.as_ref().map_or("-", |c| c.name.as_str());
    let featured = if product.featured { " *" } else { "" };
    println!(
        "{}  {}  {}  [{category}]{featured}",
        product.id,
        product.name,
        money(product.base_price),
    );
}

fn print_cached(products: &[CachedProduct]) {
    if products.is_empty() {
        println!("No cached products. Run `catalog sync` first.");
        return;
    }
    for product in products {
        println!(
            "{}  {}  {}  [{} / {}]",
            product.id, product.name, product.price, product.category, product.subcategory
        );
    }
}
