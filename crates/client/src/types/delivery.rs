//! Delivery service wire types.

use redthread_core::{OrderId, RouteId, ShipmentId, ShipmentStatus, UserId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A delivery route. Field names follow the delivery service's Spanish schema.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    pub id: RouteId,
    pub nombre: String,
    #[serde(default)]
    pub descripcion: Option<String>,
    #[serde(default)]
    pub total_pedidos: u32,
    #[serde(default)]
    pub total_price: Decimal,
    #[serde(default)]
    pub activa: bool,
    pub assigned_user_id: Option<UserId>,
}

/// The delivery-side view of one order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Shipment {
    pub id: ShipmentId,
    pub order_id: OrderId,
    pub user_id: Option<UserId>,
    pub address_line1: Option<String>,
    pub address_line2: Option<String>,
    pub city: Option<String>,
    pub state: Option<String>,
    pub zip: Option<String>,
    pub country: Option<String>,
    pub status: Option<ShipmentStatus>,
    pub total_price: Option<Decimal>,
}

impl Shipment {
    /// Current status; a shipment without one has not been picked up yet.
    #[must_use]
    pub fn status(&self) -> ShipmentStatus {
        self.status.unwrap_or(ShipmentStatus::PendingPickup)
    }

    /// Display label for the order, e.g. `Pedido #42`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("Pedido #{}", self.order_id)
    }

    /// Non-blank address parts joined with `, `, or `Sin dirección`.
    #[must_use]
    pub fn address(&self) -> String {
        let parts: Vec<&str> = [
            &self.address_line1,
            &self.address_line2,
            &self.city,
            &self.state,
            &self.zip,
            &self.country,
        ]
        .into_iter()
        .filter_map(|p| p.as_deref())
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .collect();

        if parts.is_empty() {
            "Sin dirección".to_string()
        } else {
            parts.join(", ")
        }
    }
}

/// Body for `POST routes`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRouteRequest {
    pub nombre: String,
    pub descripcion: Option<String>,
    pub order_ids: Vec<OrderId>,
    pub total_price: Option<i64>,
}
