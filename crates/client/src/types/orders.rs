//! Orders service wire types (cart, checkout and order history).

use redthread_core::{AddressId, CartId, CartItemId, OrderId, Price, VariantId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

// =============================================================================
// Cart
// =============================================================================

/// A line in the server cart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartItemRes {
    pub item_id: CartItemId,
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Decimal,
}

/// The authenticated user's server cart. `total` is computed server-side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartRes {
    pub cart_id: CartId,
    #[serde(default)]
    pub items: Vec<CartItemRes>,
    pub total: Decimal,
}

impl CartRes {
    /// Server-computed total in the store currency.
    #[must_use]
    pub fn total_price(&self) -> Price {
        Price::from_amount(self.total)
    }
}

/// Body for `POST cart/items`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemReq {
    pub variant_id: VariantId,
    pub quantity: u32,
}

/// Body for `PATCH cart/items/{id}`.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct UpdateQtyReq {
    pub quantity: u32,
}

/// Body for `POST checkout`.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutReq {
    pub address_id: AddressId,
}

// =============================================================================
// Orders
// =============================================================================

/// A line of a placed order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderItemRes {
    pub variant_id: VariantId,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// A placed order as seen by its owner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRes {
    pub id: OrderId,
    pub status: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<OrderItemRes>,
}

/// An order line with product details, for the admin view.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderItem {
    pub variant_id: VariantId,
    pub product_name: String,
    pub size: String,
    pub color: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
}

/// Full order detail for administrators.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdminOrderDetail {
    pub id: OrderId,
    pub status: String,
    pub user_email: String,
    pub full_address: String,
    pub total_amount: Decimal,
    #[serde(default)]
    pub items: Vec<AdminOrderItem>,
}
