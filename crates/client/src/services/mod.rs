//! Orchestration services built on the API clients and the local cache.
//!
//! Two error policies apply:
//!
//! - Cart mutations absorb failures: the error is logged and the published
//!   cart is left as it was.
//! - Auth, profile, address and checkout failures are surfaced: the error is
//!   returned and its message is parked in an [`ErrorSlot`] until read once.

use std::sync::Arc;

use tokio::sync::Mutex;

pub mod addresses;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod driver;
pub mod orders;

pub use addresses::AddressService;
pub use auth::AuthService;
pub use cart::{CartLine, CartService, CartSnapshot, LineId, NewCartLine};
pub use catalog::CatalogService;
pub use driver::{DriverBoard, DriverService, Stage};
pub use orders::OrderService;

use crate::error::ClientError;

/// One-shot error message shared by the surfaced flows.
#[derive(Debug, Clone, Default)]
pub struct ErrorSlot {
    message: Arc<Mutex<Option<String>>>,
}

impl ErrorSlot {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the pending message.
    pub async fn set(&self, message: impl Into<String>) {
        *self.message.lock().await = Some(message.into());
    }

    /// Read and clear the pending message.
    pub async fn take(&self) -> Option<String> {
        self.message.lock().await.take()
    }

    /// Park the error's message, then hand the result back unchanged.
    pub(crate) async fn surface<T>(&self, result: Result<T, ClientError>) -> Result<T, ClientError> {
        if let Err(e) = &result {
            tracing::warn!(error = %e, "Surfacing error");
            self.set(e.user_message()).await;
        }
        result
    }
}
