//! Delivery driver workflow.
//!
//! A driver claims a route, then works through three buckets of its
//! shipments: pickup, deliver and return. Every mutation is one delivery
//! service call followed by a full reload of the route's shipments; the
//! buckets are recomputed from scratch on each reload.
//!
//! Admins also create routes here; created routes are kept as local
//! snapshots in the cache.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use redthread_core::{OrderId, RouteId, ShipmentId, ShipmentStatus};
use sqlx::SqlitePool;
use tokio::sync::{Mutex, watch};
use tracing::{info, instrument, warn};

use crate::api::{Credentials, DeliveryApi, Evidence};
use crate::db::{RouteRepository, RouteSnapshot};
use crate::error::ClientError;
use crate::types::{CreateRouteRequest, Route, Shipment};

/// The driver's current view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Stage {
    #[default]
    Pickup,
    Deliver,
    Return,
}

impl Stage {
    pub const ALL: [Self; 3] = [Self::Pickup, Self::Deliver, Self::Return];

    /// Label shown to the driver.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::Pickup => "Recoger",
            Self::Deliver => "Entregar",
            Self::Return => "Retorno",
        }
    }

    /// Bucket a shipment status belongs to. Finished and unrecognised
    /// statuses belong to none.
    #[must_use]
    pub const fn bucket(status: ShipmentStatus) -> Option<Self> {
        match status {
            ShipmentStatus::PendingPickup | ShipmentStatus::Assigned => Some(Self::Pickup),
            ShipmentStatus::InTransit => Some(Self::Deliver),
            ShipmentStatus::Failed => Some(Self::Return),
            ShipmentStatus::Delivered
            | ShipmentStatus::Returned
            | ShipmentStatus::Cancelled
            | ShipmentStatus::Unknown => None,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for Stage {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pickup" | "recoger" => Ok(Self::Pickup),
            "deliver" | "entregar" => Ok(Self::Deliver),
            "return" | "retorno" => Ok(Self::Return),
            other => Err(format!("unknown stage: {other}")),
        }
    }
}

/// Shipments of the claimed route, split by stage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverBoard {
    pub route: Option<Route>,
    pub stage: Stage,
    pub pending: Vec<Shipment>,
    pub in_transit: Vec<Shipment>,
    pub failed: Vec<Shipment>,
}

impl DriverBoard {
    /// Build a board in one pass over `shipments`.
    #[must_use]
    pub fn partition(route: Option<Route>, stage: Stage, shipments: Vec<Shipment>) -> Self {
        let mut board = Self {
            route,
            stage,
            ..Self::default()
        };
        for shipment in shipments {
            match Stage::bucket(shipment.status()) {
                Some(Stage::Pickup) => board.pending.push(shipment),
                Some(Stage::Deliver) => board.in_transit.push(shipment),
                Some(Stage::Return) => board.failed.push(shipment),
                None => {}
            }
        }
        board
    }

    /// Shipments of one stage.
    #[must_use]
    pub fn bucket(&self, stage: Stage) -> &[Shipment] {
        match stage {
            Stage::Pickup => &self.pending,
            Stage::Deliver => &self.in_transit,
            Stage::Return => &self.failed,
        }
    }

    /// Shipments of the selected stage.
    #[must_use]
    pub fn visible(&self) -> &[Shipment] {
        self.bucket(self.stage)
    }
}

/// Driver and route-admin workflow.
#[derive(Clone)]
pub struct DriverService {
    delivery: Arc<dyn DeliveryApi>,
    credentials: Credentials,
    pool: SqlitePool,
    /// Serialises mutations so each completes before the next starts.
    busy: Arc<Mutex<()>>,
    tx: Arc<watch::Sender<DriverBoard>>,
}

impl DriverService {
    #[must_use]
    pub fn new(delivery: Arc<dyn DeliveryApi>, credentials: Credentials, pool: SqlitePool) -> Self {
        let (tx, _rx) = watch::channel(DriverBoard::default());
        Self {
            delivery,
            credentials,
            pool,
            busy: Arc::new(Mutex::new(())),
            tx: Arc::new(tx),
        }
    }

    /// Observe board changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<DriverBoard> {
        self.tx.subscribe()
    }

    /// The latest published board.
    #[must_use]
    pub fn board(&self) -> DriverBoard {
        self.tx.borrow().clone()
    }

    /// Drop the claimed route and its shipments.
    pub fn reset(&self) {
        self.tx.send_replace(DriverBoard::default());
    }

    /// Routes that are active and not yet taken.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the call fails.
    pub async fn load_active_routes(&self) -> Result<Vec<Route>, ClientError> {
        self.require_token().await?;
        Ok(self.delivery.active_routes().await?)
    }

    /// Take a route and load its shipments.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the route cannot be taken or loaded.
    #[instrument(skip(self))]
    pub async fn claim_route(&self, id: RouteId) -> Result<DriverBoard, ClientError> {
        self.require_token().await?;
        let _busy = self.busy.lock().await;

        let route = self.delivery.take_route(id).await?;
        info!(route_id = %route.id, name = %route.nombre, "Route claimed");
        self.reload(route).await
    }

    /// Reload the claimed route's shipments.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` if no route has been claimed and
    /// `ClientError::Api` if the call fails.
    pub async fn load_shipments(&self) -> Result<DriverBoard, ClientError> {
        self.require_token().await?;
        let _busy = self.busy.lock().await;
        let route = self.current_route()?;
        self.reload(route).await
    }

    /// Switch the visible bucket.
    pub fn select_stage(&self, stage: Stage) -> DriverBoard {
        self.tx.send_modify(|board| board.stage = stage);
        self.board()
    }

    /// Report a shipment as collected at the warehouse.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the transition is refused; the board
    /// is left unchanged.
    #[instrument(skip(self))]
    pub async fn mark_picked_up(&self, id: ShipmentId) -> Result<DriverBoard, ClientError> {
        self.require_token().await?;
        let _busy = self.busy.lock().await;
        let route = self.current_route()?;

        self.delivery.start_shipment(id).await?;
        self.reload(route).await
    }

    /// Report a shipment as delivered, with evidence.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the transition is refused and
    /// `ApiError::Evidence` if the photo cannot be read; the board is left
    /// unchanged.
    #[instrument(skip(self, evidence))]
    pub async fn mark_delivered(
        &self,
        id: ShipmentId,
        receiver_name: &str,
        evidence: &Evidence,
    ) -> Result<DriverBoard, ClientError> {
        self.require_token().await?;
        let _busy = self.busy.lock().await;
        let route = self.current_route()?;

        self.delivery.mark_delivered(id, receiver_name, evidence).await?;
        self.reload(route).await
    }

    /// Report a failed delivery attempt, with the reason and evidence.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the transition is refused and
    /// `ApiError::Evidence` if the photo cannot be read; the board is left
    /// unchanged.
    #[instrument(skip(self, evidence))]
    pub async fn mark_failed(
        &self,
        id: ShipmentId,
        reason: &str,
        evidence: &Evidence,
    ) -> Result<DriverBoard, ClientError> {
        self.require_token().await?;
        let _busy = self.busy.lock().await;
        let route = self.current_route()?;

        self.delivery.mark_failed(id, reason, evidence).await?;
        self.reload(route).await
    }

    fn current_route(&self) -> Result<Route, ClientError> {
        self.tx
            .borrow()
            .route
            .clone()
            .ok_or_else(|| ClientError::Validation("No route claimed.".to_string()))
    }

    /// Fetch the route's shipments and publish the re-partitioned board.
    async fn reload(&self, route: Route) -> Result<DriverBoard, ClientError> {
        let shipments = self.delivery.route_shipments(route.id).await?;
        let stage = self.tx.borrow().stage;
        let board = DriverBoard::partition(Some(route), stage, shipments);
        self.tx.send_replace(board.clone());
        Ok(board)
    }

    // =========================================================================
    // Route administration
    // =========================================================================

    /// Create a route on the delivery service and keep a local snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty name or order list,
    /// `ClientError::NoSession` when logged out and `ClientError::Api` if
    /// the service rejects the route.
    #[instrument(skip(self))]
    pub async fn create_route(
        &self,
        name: &str,
        order_ids: &[OrderId],
    ) -> Result<Route, ClientError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ClientError::Validation("A route needs a name.".to_string()));
        }
        if order_ids.is_empty() {
            return Err(ClientError::Validation(
                "A route needs at least one order.".to_string(),
            ));
        }
        self.require_token().await?;

        let req = CreateRouteRequest {
            nombre: name.to_string(),
            descripcion: None,
            order_ids: order_ids.to_vec(),
            total_price: None,
        };
        let route = self.delivery.create_route(&req).await?;
        info!(route_id = %route.id, orders = order_ids.len(), "Route created");

        if let Err(e) = RouteRepository::new(&self.pool)
            .insert(Some(route.id), name, order_ids)
            .await
        {
            warn!(error = %e, route_id = %route.id, "Failed to cache route snapshot");
        }
        Ok(route)
    }

    /// Locally cached route snapshots, newest first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn local_routes(&self) -> Result<Vec<RouteSnapshot>, ClientError> {
        Ok(RouteRepository::new(&self.pool).list().await?)
    }

    /// One cached route snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn local_route(&self, id: i64) -> Result<Option<RouteSnapshot>, ClientError> {
        Ok(RouteRepository::new(&self.pool).get(id).await?)
    }

    /// Overwrite a cached route snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the snapshot does not exist.
    pub async fn update_local_route(&self, route: &RouteSnapshot) -> Result<(), ClientError> {
        Ok(RouteRepository::new(&self.pool).update(route).await?)
    }

    /// Remove a cached route snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the snapshot does not exist.
    pub async fn delete_local_route(&self, id: i64) -> Result<(), ClientError> {
        Ok(RouteRepository::new(&self.pool).delete(id).await?)
    }

    async fn require_token(&self) -> Result<(), ClientError> {
        if self.credentials.is_set().await {
            Ok(())
        } else {
            Err(ClientError::NoSession)
        }
    }
}
