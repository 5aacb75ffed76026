//! Delivery service client.

use async_trait::async_trait;
use redthread_core::{RouteId, ShipmentId};
use reqwest::Method;
use reqwest::multipart::Form;
use tracing::instrument;
use url::Url;

use super::{ApiError, Credentials, DeliveryApi, Evidence, ServiceHttp, file_part};
use crate::types::{CreateRouteRequest, Route, Shipment};

/// Client for the delivery service.
#[derive(Clone)]
pub struct DeliveryClient {
    http: ServiceHttp,
}

impl DeliveryClient {
    /// Create a new delivery client sharing the session credentials.
    #[must_use]
    pub const fn new(client: reqwest::Client, base: Url, credentials: Credentials) -> Self {
        Self {
            http: ServiceHttp::new(client, base, Some(credentials)),
        }
    }
}

/// Multipart form for a delivered/failed report: one text field, the GPS fix
/// when known, and the photo.
async fn evidence_form(
    field: &'static str,
    value: &str,
    evidence: &Evidence,
) -> Result<Form, ApiError> {
    let mut form = Form::new().text(field, value.to_string());
    if let Some(latitude) = evidence.latitude {
        form = form.text("latitude", latitude.to_string());
    }
    if let Some(longitude) = evidence.longitude {
        form = form.text("longitude", longitude.to_string());
    }
    Ok(form.part("photo", file_part(&evidence.photo).await?))
}

#[async_trait]
impl DeliveryApi for DeliveryClient {
    #[instrument(skip(self))]
    async fn active_routes(&self) -> Result<Vec<Route>, ApiError> {
        self.http.get("routes/active").await
    }

    #[instrument(skip(self), fields(route_id = %id))]
    async fn take_route(&self, id: RouteId) -> Result<Route, ApiError> {
        self.http
            .call(Method::POST, &format!("routes/{id}/take"))
            .await
    }

    #[instrument(skip(self), fields(route_id = %id))]
    async fn route_shipments(&self, id: RouteId) -> Result<Vec<Shipment>, ApiError> {
        self.http.get(&format!("routes/{id}/shipments")).await
    }

    #[instrument(skip(self), fields(shipment_id = %id))]
    async fn start_shipment(&self, id: ShipmentId) -> Result<Shipment, ApiError> {
        self.http
            .call(Method::POST, &format!("shipments/{id}/start"))
            .await
    }

    #[instrument(skip(self, evidence), fields(shipment_id = %id))]
    async fn mark_delivered(
        &self,
        id: ShipmentId,
        receiver_name: &str,
        evidence: &Evidence,
    ) -> Result<Shipment, ApiError> {
        let form = evidence_form("receiverName", receiver_name, evidence).await?;
        self.http
            .send_multipart(&format!("shipments/{id}/delivered"), form)
            .await
    }

    #[instrument(skip(self, evidence), fields(shipment_id = %id))]
    async fn mark_failed(
        &self,
        id: ShipmentId,
        note: &str,
        evidence: &Evidence,
    ) -> Result<Shipment, ApiError> {
        let form = evidence_form("note", note, evidence).await?;
        self.http
            .send_multipart(&format!("shipments/{id}/fail"), form)
            .await
    }

    #[instrument(skip(self, req), fields(nombre = %req.nombre, orders = req.order_ids.len()))]
    async fn create_route(&self, req: &CreateRouteRequest) -> Result<Route, ApiError> {
        self.http.send(Method::POST, "routes", req).await
    }
}
