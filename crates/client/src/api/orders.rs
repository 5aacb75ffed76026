//! Orders service client (cart, checkout, history and addresses).

use async_trait::async_trait;
use redthread_core::{AddressId, CartItemId, OrderId};
use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::{ApiError, Credentials, OrdersApi, ServiceHttp};
use crate::types::{
    AddItemReq, Address, AdminOrderDetail, CartRes, CheckoutReq, CreateAddressRequest, OrderRes,
    UpdateAddressRequest, UpdateQtyReq,
};

/// Client for the orders service. Every call is authenticated.
#[derive(Clone)]
pub struct OrdersClient {
    http: ServiceHttp,
}

impl OrdersClient {
    /// Create a new orders client sharing the session credentials.
    #[must_use]
    pub const fn new(client: reqwest::Client, base: Url, credentials: Credentials) -> Self {
        Self {
            http: ServiceHttp::new(client, base, Some(credentials)),
        }
    }
}

#[async_trait]
impl OrdersApi for OrdersClient {
    // =========================================================================
    // Cart
    // =========================================================================

    #[instrument(skip(self))]
    async fn cart(&self) -> Result<CartRes, ApiError> {
        self.http.get("cart").await
    }

    #[instrument(skip(self), fields(variant_id = %req.variant_id, quantity = req.quantity))]
    async fn add_item(&self, req: AddItemReq) -> Result<CartRes, ApiError> {
        self.http.send(Method::POST, "cart/items", &req).await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<CartRes, ApiError> {
        self.http
            .send(
                Method::PATCH,
                &format!("cart/items/{item_id}"),
                &UpdateQtyReq { quantity },
            )
            .await
    }

    #[instrument(skip(self), fields(item_id = %item_id))]
    async fn delete_item(&self, item_id: CartItemId) -> Result<(), ApiError> {
        self.http
            .send_empty::<()>(Method::DELETE, &format!("cart/items/{item_id}"), None)
            .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> Result<(), ApiError> {
        self.http
            .send_empty::<()>(Method::DELETE, "cart/clear", None)
            .await
    }

    // =========================================================================
    // Checkout & History
    // =========================================================================

    #[instrument(skip(self), fields(address_id = %req.address_id))]
    async fn checkout(&self, req: CheckoutReq) -> Result<OrderRes, ApiError> {
        self.http.send(Method::POST, "checkout", &req).await
    }

    #[instrument(skip(self))]
    async fn orders(&self) -> Result<Vec<OrderRes>, ApiError> {
        self.http.get("orders").await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn order(&self, id: OrderId) -> Result<OrderRes, ApiError> {
        self.http.get(&format!("orders/{id}")).await
    }

    #[instrument(skip(self), fields(order_id = %id))]
    async fn admin_order_detail(&self, id: OrderId) -> Result<AdminOrderDetail, ApiError> {
        self.http.get(&format!("orders/admin/{id}")).await
    }

    // =========================================================================
    // Addresses
    // =========================================================================

    #[instrument(skip(self))]
    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        self.http.get("addresses").await
    }

    #[instrument(skip(self, req))]
    async fn create_address(&self, req: &CreateAddressRequest) -> Result<Address, ApiError> {
        self.http.send(Method::POST, "addresses", req).await
    }

    #[instrument(skip(self, req), fields(address_id = %id))]
    async fn update_address(
        &self,
        id: AddressId,
        req: &UpdateAddressRequest,
    ) -> Result<Address, ApiError> {
        self.http
            .send(Method::PATCH, &format!("addresses/{id}"), req)
            .await
    }

    #[instrument(skip(self), fields(address_id = %id))]
    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError> {
        self.http
            .send_empty::<()>(Method::DELETE, &format!("addresses/{id}"), None)
            .await
    }
}
