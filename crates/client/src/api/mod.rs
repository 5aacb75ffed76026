//! Typed HTTP clients for the RedThread backend services.
//!
//! # Architecture
//!
//! - One [`reqwest::Client`] is shared by all four service clients
//! - Each service is reached through a `ServiceHttp` bound to its base URL
//! - Identity, orders and delivery calls carry the session bearer token held
//!   in [`Credentials`]; catalog calls are anonymous
//! - Every request carries an `X-Request-Id` for log correlation
//!
//! The services are consumed through traits ([`IdentityApi`], [`CatalogApi`],
//! [`OrdersApi`], [`DeliveryApi`]) so the orchestration layer can be driven by
//! in-memory fakes in tests.

mod cache;
mod catalog;
mod delivery;
mod identity;
mod orders;

#[cfg(test)]
pub(crate) mod memory;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redthread_core::{
    AddressId, CartItemId, ImageId, OrderId, ProductId, RouteId, ShipmentId, VariantId,
};
use reqwest::multipart::Part;
use reqwest::{Method, RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;
use tokio::sync::RwLock;
use url::Url;

use crate::types::{
    Address, AddItemReq, AdminOrderDetail, AuthResponse, Brand, CartRes, Category,
    ChangePasswordRequest, CheckoutReq, CreateAddressRequest, CreateProductRequest,
    CreateRouteRequest, CreateVariantRequest, Image, LoginRequest, OrderRes, Product,
    RegisterRequest, ResetPasswordRequest, Route, Shipment, UpdateAddressRequest,
    UpdateMeRequest, UserProfile, Variant,
};

pub use catalog::CatalogClient;
pub use delivery::DeliveryClient;
pub use identity::IdentityClient;
pub use orders::OrdersClient;

/// Longest response excerpt written to logs or error messages.
const BODY_EXCERPT: usize = 500;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when calling a backend service.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Response body did not match the expected shape.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// The service answered with a non-success status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Resource not found.
    #[error("Not found")]
    NotFound,

    /// Missing, expired or insufficient credentials.
    #[error("Unauthorized")]
    Unauthorized,

    /// Rate limited by the service.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Evidence photo or upload file could not be read.
    #[error("Cannot read file: {0}")]
    Evidence(#[from] std::io::Error),

    /// An endpoint path could not be joined to the base URL.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

// =============================================================================
// Credentials
// =============================================================================

/// Shared, swappable bearer token.
///
/// Cloned into every authenticated service client; setting or clearing it
/// takes effect on the next request.
#[derive(Clone, Default)]
pub struct Credentials {
    token: Arc<RwLock<Option<SecretString>>>,
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("token", &"[REDACTED]")
            .finish()
    }
}

impl Credentials {
    /// An empty credential slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Install a bearer token.
    pub async fn set(&self, token: SecretString) {
        *self.token.write().await = Some(token);
    }

    /// Forget the bearer token.
    pub async fn clear(&self) {
        *self.token.write().await = None;
    }

    /// Whether a non-blank token is installed.
    pub async fn is_set(&self) -> bool {
        self.bearer().await.is_some()
    }

    /// The token to send, if any. Blank tokens are treated as absent.
    async fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .await
            .as_ref()
            .map(|t| t.expose_secret().trim().to_string())
            .filter(|t| !t.is_empty())
    }
}

// =============================================================================
// Transport
// =============================================================================

/// Build the shared HTTP client.
///
/// # Errors
///
/// Returns `ApiError::Http` if the TLS backend cannot be initialised.
pub fn build_http_client(timeout: Option<Duration>) -> Result<reqwest::Client, ApiError> {
    let mut builder = reqwest::Client::builder().user_agent(concat!(
        env!("CARGO_PKG_NAME"),
        "/",
        env!("CARGO_PKG_VERSION")
    ));
    if let Some(timeout) = timeout {
        builder = builder.timeout(timeout);
    }
    Ok(builder.build()?)
}

/// HTTP plumbing for one service.
#[derive(Clone)]
pub(crate) struct ServiceHttp {
    client: reqwest::Client,
    base: Url,
    credentials: Option<Credentials>,
}

impl ServiceHttp {
    pub(crate) const fn new(
        client: reqwest::Client,
        base: Url,
        credentials: Option<Credentials>,
    ) -> Self {
        Self {
            client,
            base,
            credentials,
        }
    }

    async fn request(&self, method: Method, path: &str) -> Result<RequestBuilder, ApiError> {
        let url = self.base.join(path)?;
        let mut builder = self
            .client
            .request(method, url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string());

        if let Some(credentials) = &self.credentials
            && let Some(token) = credentials.bearer().await
        {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    /// `GET` a JSON resource.
    pub(crate) async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        self.call(Method::GET, path).await
    }

    /// Send a bodiless request and decode a JSON response.
    pub(crate) async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
    ) -> Result<T, ApiError> {
        let text = self.execute(self.request(method, path).await?).await?;
        parse_body(&text)
    }

    /// Send a JSON body and decode a JSON response.
    pub(crate) async fn send<B, T>(&self, method: Method, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + Sync + ?Sized,
        T: DeserializeOwned,
    {
        let builder = self.request(method, path).await?.json(body);
        let text = self.execute(builder).await?;
        parse_body(&text)
    }

    /// Send a request whose response body is ignored.
    pub(crate) async fn send_empty<B>(
        &self,
        method: Method,
        path: &str,
        body: Option<&B>,
    ) -> Result<(), ApiError>
    where
        B: Serialize + Sync + ?Sized,
    {
        let mut builder = self.request(method, path).await?;
        if let Some(body) = body {
            builder = builder.json(body);
        }
        self.execute(builder).await?;
        Ok(())
    }

    /// `POST` a multipart form and decode a JSON response.
    pub(crate) async fn send_multipart<T: DeserializeOwned>(
        &self,
        path: &str,
        form: reqwest::multipart::Form,
    ) -> Result<T, ApiError> {
        let builder = self.request(Method::POST, path).await?.multipart(form);
        let text = self.execute(builder).await?;
        parse_body(&text)
    }

    /// Send the request and return the body of a successful response.
    async fn execute(&self, builder: RequestBuilder) -> Result<String, ApiError> {
        let response = builder.send().await?;
        let status = response.status();

        // Check for rate limiting
        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Unauthorized);
        }

        if status == StatusCode::NOT_FOUND {
            return Err(ApiError::NotFound);
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;

        if !status.is_success() {
            tracing::error!(
                status = %status,
                base = %self.base,
                body = %excerpt(&text),
                "Service returned non-success status"
            );
            return Err(ApiError::Api {
                status: status.as_u16(),
                message: error_message(&text),
            });
        }

        Ok(text)
    }
}

/// Decode a JSON body, logging an excerpt when it does not match.
fn parse_body<T: DeserializeOwned>(text: &str) -> Result<T, ApiError> {
    serde_json::from_str(text).map_err(|e| {
        tracing::error!(
            error = %e,
            body = %excerpt(text),
            "Failed to parse service response"
        );
        ApiError::Parse(e)
    })
}

/// Read a file into a multipart part named after the file.
pub(crate) async fn file_part(path: &Path) -> Result<Part, ApiError> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map_or_else(|| "upload".to_string(), |n| n.to_string_lossy().into_owned());
    let mime = mime_for(path);
    Ok(Part::bytes(bytes).file_name(file_name).mime_str(mime)?)
}

fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "application/octet-stream",
    }
}

fn excerpt(text: &str) -> String {
    text.chars().take(BODY_EXCERPT).collect()
}

/// Best human-readable message from an error body.
///
/// Spring-style services answer `{"message": ...}` or `{"error": ...}`; anything
/// else is passed through as text.
fn error_message(text: &str) -> String {
    #[derive(serde::Deserialize)]
    struct ErrorBody {
        message: Option<String>,
        error: Option<String>,
    }

    serde_json::from_str::<ErrorBody>(text)
        .ok()
        .and_then(|body| body.message.or(body.error))
        .filter(|m| !m.trim().is_empty())
        .unwrap_or_else(|| {
            let trimmed = text.trim();
            if trimmed.is_empty() {
                "no details".to_string()
            } else {
                trimmed.chars().take(200).collect()
            }
        })
}

// =============================================================================
// Service Traits
// =============================================================================

/// Identity service: accounts, tokens and the current profile.
#[async_trait]
pub trait IdentityApi: Send + Sync {
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError>;
    async fn me(&self) -> Result<UserProfile, ApiError>;
    async fn update_me(&self, req: &UpdateMeRequest) -> Result<UserProfile, ApiError>;
    async fn change_password(&self, req: &ChangePasswordRequest) -> Result<(), ApiError>;
    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ApiError>;
}

/// Catalog service: products, variants, images and admin writes.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    async fn categories(&self) -> Result<Vec<Category>, ApiError>;
    async fn brands(&self) -> Result<Vec<Brand>, ApiError>;
    async fn products(&self) -> Result<Vec<Product>, ApiError>;
    async fn product(&self, id: ProductId) -> Result<Product, ApiError>;
    async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, ApiError>;
    async fn variant(&self, id: VariantId) -> Result<Variant, ApiError>;
    async fn images(&self, product_id: ProductId) -> Result<Vec<Image>, ApiError>;

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError>;
    async fn update_product(
        &self,
        id: ProductId,
        req: &CreateProductRequest,
    ) -> Result<Product, ApiError>;
    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError>;
    async fn create_variant(&self, req: &CreateVariantRequest) -> Result<Variant, ApiError>;
    async fn upload_image(&self, product_id: ProductId, file: PathBuf) -> Result<Image, ApiError>;
    async fn upload_image_from_url(
        &self,
        product_id: ProductId,
        url: &str,
    ) -> Result<Image, ApiError>;
    async fn mark_primary_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ApiError>;
    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<(), ApiError>;
}

/// Orders service: server cart, checkout, order history and addresses.
#[async_trait]
pub trait OrdersApi: Send + Sync {
    async fn cart(&self) -> Result<CartRes, ApiError>;
    async fn add_item(&self, req: AddItemReq) -> Result<CartRes, ApiError>;
    async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<CartRes, ApiError>;
    async fn delete_item(&self, item_id: CartItemId) -> Result<(), ApiError>;
    async fn clear_cart(&self) -> Result<(), ApiError>;

    async fn checkout(&self, req: CheckoutReq) -> Result<OrderRes, ApiError>;
    async fn orders(&self) -> Result<Vec<OrderRes>, ApiError>;
    async fn order(&self, id: OrderId) -> Result<OrderRes, ApiError>;
    async fn admin_order_detail(&self, id: OrderId) -> Result<AdminOrderDetail, ApiError>;

    async fn addresses(&self) -> Result<Vec<Address>, ApiError>;
    async fn create_address(&self, req: &CreateAddressRequest) -> Result<Address, ApiError>;
    async fn update_address(
        &self,
        id: AddressId,
        req: &UpdateAddressRequest,
    ) -> Result<Address, ApiError>;
    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError>;
}

/// Photo plus optional GPS fix attached to a delivered/failed report.
#[derive(Debug, Clone, PartialEq)]
pub struct Evidence {
    pub photo: PathBuf,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl Evidence {
    /// Evidence with a photo and no location.
    #[must_use]
    pub fn photo(path: impl Into<PathBuf>) -> Self {
        Self {
            photo: path.into(),
            latitude: None,
            longitude: None,
        }
    }

    /// Attach a GPS fix.
    #[must_use]
    pub const fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// Delivery service: routes and shipment transitions.
#[async_trait]
pub trait DeliveryApi: Send + Sync {
    async fn active_routes(&self) -> Result<Vec<Route>, ApiError>;
    async fn take_route(&self, id: RouteId) -> Result<Route, ApiError>;
    async fn route_shipments(&self, id: RouteId) -> Result<Vec<Shipment>, ApiError>;
    async fn start_shipment(&self, id: ShipmentId) -> Result<Shipment, ApiError>;
    async fn mark_delivered(
        &self,
        id: ShipmentId,
        receiver_name: &str,
        evidence: &Evidence,
    ) -> Result<Shipment, ApiError>;
    async fn mark_failed(
        &self,
        id: ShipmentId,
        note: &str,
        evidence: &Evidence,
    ) -> Result<Shipment, ApiError>;
    async fn create_route(&self, req: &CreateRouteRequest) -> Result<Route, ApiError>;
}
