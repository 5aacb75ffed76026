//! Checkout and order history.

use std::sync::Arc;

use redthread_core::OrderId;
use sqlx::SqlitePool;
use tracing::{info, instrument, warn};

use super::{CartService, ErrorSlot};
use crate::api::{Credentials, OrdersApi};
use crate::db::{NewOrderSnapshot, OrderRepository, OrderSnapshot, SessionRepository};
use crate::error::ClientError;
use crate::types::{Address, AdminOrderDetail, CheckoutReq, OrderRes};

/// Checkout against the server cart plus local order snapshots.
#[derive(Clone)]
pub struct OrderService {
    orders: Arc<dyn OrdersApi>,
    cart: CartService,
    credentials: Credentials,
    pool: SqlitePool,
    errors: ErrorSlot,
}

impl OrderService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrdersApi>,
        cart: CartService,
        credentials: Credentials,
        pool: SqlitePool,
        errors: ErrorSlot,
    ) -> Self {
        Self {
            orders,
            cart,
            credentials,
            pool,
            errors,
        }
    }

    /// Place an order for the current server cart.
    ///
    /// Preconditions are checked in order: a non-empty cart, a selected
    /// address, then a session. On success the order is snapshotted locally
    /// and the cart refetched.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Validation` for an empty cart or a missing
    /// address, `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the orders service rejects the checkout.
    #[instrument(skip_all, fields(address_id = ?address.map(|a| a.id)))]
    pub async fn checkout(&self, address: Option<&Address>) -> Result<OrderRes, ClientError> {
        let result: Result<OrderRes, ClientError> = async {
            if self.cart.snapshot().is_empty() {
                return Err(ClientError::Validation("Your cart is empty.".to_string()));
            }
            let address = address.ok_or_else(|| {
                ClientError::Validation("Select or register an address.".to_string())
            })?;
            if !self.credentials.is_set().await {
                return Err(ClientError::NoSession);
            }

            let order = self
                .orders
                .checkout(CheckoutReq {
                    address_id: address.id,
                })
                .await?;
            info!(order_id = %order.id, total = %order.total_amount, "Order placed");

            self.snapshot(&order, address).await;
            self.cart.refresh().await;
            Ok(order)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Record the placed order locally. A cache failure does not undo the
    /// order, so it is only logged.
    async fn snapshot(&self, order: &OrderRes, address: &Address) {
        let user_email = match SessionRepository::new(&self.pool).load().await {
            Ok(session) => session.map(|s| s.email).unwrap_or_default(),
            Err(e) => {
                warn!(error = %e, "Failed to read session for order snapshot");
                String::new()
            }
        };
        let snapshot = NewOrderSnapshot {
            remote_id: Some(order.id),
            user_email,
            address: address.one_line(),
            total: order.total_amount,
            items: order.items.clone(),
        };
        if let Err(e) = OrderRepository::new(&self.pool)
            .insert_returning_id(&snapshot)
            .await
        {
            warn!(error = %e, order_id = %order.id, "Failed to cache order snapshot");
        }
    }

    /// The user's order history from the orders service.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the call fails.
    pub async fn list_orders(&self) -> Result<Vec<OrderRes>, ClientError> {
        self.require_token().await?;
        Ok(self.orders.orders().await?)
    }

    /// One order from the orders service.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the call fails.
    pub async fn order(&self, id: OrderId) -> Result<OrderRes, ClientError> {
        self.require_token().await?;
        Ok(self.orders.order(id).await?)
    }

    /// Admin view of an order, with customer email and address.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the call fails.
    pub async fn admin_order_detail(&self, id: OrderId) -> Result<AdminOrderDetail, ClientError> {
        self.require_token().await?;
        Ok(self.orders.admin_order_detail(id).await?)
    }

    // =========================================================================
    // Local snapshots
    // =========================================================================

    /// Cached order snapshots, newest first. With an email, only that
    /// user's snapshots.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn local_orders(&self, user_email: Option<&str>) -> Result<Vec<OrderSnapshot>, ClientError> {
        let repo = OrderRepository::new(&self.pool);
        let orders = match user_email {
            Some(email) => repo.list_for(email).await?,
            None => repo.list().await?,
        };
        Ok(orders)
    }

    /// One cached order snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn local_order(&self, id: i64) -> Result<Option<OrderSnapshot>, ClientError> {
        Ok(OrderRepository::new(&self.pool).get(id).await?)
    }

    /// Change a cached snapshot's status.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the snapshot does not exist.
    pub async fn update_local_status(
        &self,
        id: i64,
        status: &str,
        delivered: bool,
    ) -> Result<(), ClientError> {
        Ok(OrderRepository::new(&self.pool)
            .update_status(id, status, delivered)
            .await?)
    }

    /// Remove a cached snapshot.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the snapshot does not exist.
    pub async fn delete_local(&self, id: i64) -> Result<(), ClientError> {
        Ok(OrderRepository::new(&self.pool).delete(id).await?)
    }

    /// Read and clear the last surfaced error message.
    pub async fn take_error(&self) -> Option<String> {
        self.errors.take().await
    }

    async fn require_token(&self) -> Result<(), ClientError> {
        if self.credentials.is_set().await {
            Ok(())
        } else {
            Err(ClientError::NoSession)
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::{AddressId, Price, ProductId, Quantity, Role, UserId, VariantId};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use super::*;
    use crate::api::memory::{InMemoryCatalog, InMemoryOrders};
    use crate::db::{RepositoryError, Session, test_pool};
    use crate::services::NewCartLine;
    use crate::types::CreateAddressRequest;

    struct Fixture {
        service: OrderService,
        cart: CartService,
        orders: InMemoryOrders,
        credentials: Credentials,
        session: Session,
    }

    async fn setup() -> Fixture {
        let catalog = InMemoryCatalog::new();
        catalog.add_product(1, "Polera Oversize", 14990, &[(10, "M", "Negro")]);
        let orders = InMemoryOrders::new(catalog.clone());
        let cart = CartService::new(Arc::new(orders.clone()), Arc::new(catalog));
        let credentials = Credentials::new();
        let pool = test_pool().await;

        let session = Session {
            email: "ana@redthread.cl".to_string(),
            name: "Ana".to_string(),
            user_id: UserId::new(1),
            role: Role::Usuario,
            token: SecretString::from("token-1"),
        };
        SessionRepository::new(&pool).save(&session).await.unwrap();

        let service = OrderService::new(
            Arc::new(orders.clone()),
            cart.clone(),
            credentials.clone(),
            pool,
            ErrorSlot::new(),
        );
        Fixture {
            service,
            cart,
            orders,
            credentials,
            session,
        }
    }

    async fn login(f: &Fixture) {
        f.credentials.set(f.session.token.clone()).await;
        f.cart.bind_session(Some(&f.session)).await;
    }

    fn polera() -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new(1),
            variant_id: VariantId::new(10),
            name: "Polera Oversize".to_string(),
            size: "M".to_string(),
            color: "Negro".to_string(),
            quantity: Quantity::new(2).unwrap(),
            unit_price: Price::from_amount(Decimal::from(14990)),
        }
    }

    async fn address(f: &Fixture) -> Address {
        f.orders
            .create_address(&CreateAddressRequest {
                line1: "Los Leones 10".to_string(),
                line2: None,
                city: "Santiago".to_string(),
                state: "RM".to_string(),
                zip: "7500000".to_string(),
                country: "Chile".to_string(),
                default: true,
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_checkout_rejects_empty_cart_first() {
        let f = setup().await;
        let err = f.service.checkout(None).await.unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
        assert_eq!(f.service.take_error().await.as_deref(), Some("Your cart is empty."));
    }

    #[tokio::test]
    async fn test_checkout_requires_address_then_session() {
        let f = setup().await;
        f.cart.add(polera()).await;

        f.service.checkout(None).await.unwrap_err();
        assert_eq!(
            f.service.take_error().await.as_deref(),
            Some("Select or register an address.")
        );

        let addr = Address {
            id: AddressId::new(99),
            line1: "Los Leones 10".to_string(),
            line2: None,
            city: "Santiago".to_string(),
            state: "RM".to_string(),
            zip: "7500000".to_string(),
            country: "Chile".to_string(),
            default: false,
        };
        let err = f.service.checkout(Some(&addr)).await.unwrap_err();
        assert!(matches!(err, ClientError::NoSession));
        assert_eq!(f.service.take_error().await.as_deref(), Some("No active session."));
        assert_eq!(f.orders.order_count(), 0);
    }

    #[tokio::test]
    async fn test_checkout_places_order_and_empties_cart() {
        let f = setup().await;
        login(&f).await;
        f.cart.add(polera()).await;
        let addr = address(&f).await;

        let order = f.service.checkout(Some(&addr)).await.unwrap();
        assert_eq!(order.total_amount, Decimal::from(29980));
        assert!(f.cart.snapshot().is_empty());
        assert!(f.service.take_error().await.is_none());

        let local = f.service.local_orders(Some("ana@redthread.cl")).await.unwrap();
        assert_eq!(local.len(), 1);
        assert_eq!(local[0].remote_id, Some(order.id));
        assert_eq!(local[0].address, addr.one_line());

        assert_eq!(f.service.list_orders().await.unwrap().len(), 1);
        assert_eq!(f.service.order(order.id).await.unwrap().id, order.id);
    }

    #[tokio::test]
    async fn test_rejected_checkout_is_surfaced() {
        let f = setup().await;
        login(&f).await;
        f.cart.add(polera()).await;
        let mut addr = address(&f).await;
        addr.id = AddressId::new(404);

        let err = f.service.checkout(Some(&addr)).await.unwrap_err();
        assert!(matches!(err, ClientError::Api(_)));
        assert_eq!(f.service.take_error().await.as_deref(), Some("Dirección inválida"));
        assert!(!f.cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_local_snapshot_lifecycle() {
        let f = setup().await;
        login(&f).await;
        f.cart.add(polera()).await;
        let addr = address(&f).await;
        f.service.checkout(Some(&addr)).await.unwrap();

        let id = f.service.local_orders(None).await.unwrap()[0].id;
        f.service.update_local_status(id, "entregado", true).await.unwrap();
        let stored = f.service.local_order(id).await.unwrap().unwrap();
        assert!(stored.delivered);
        assert_eq!(stored.status, "entregado");

        f.service.delete_local(id).await.unwrap();
        assert!(f.service.local_order(id).await.unwrap().is_none());
        assert!(matches!(
            f.service.delete_local(id).await,
            Err(ClientError::Repository(RepositoryError::NotFound))
        ));
    }

    #[tokio::test]
    async fn test_history_requires_session() {
        let f = setup().await;
        assert!(matches!(f.service.list_orders().await, Err(ClientError::NoSession)));
    }
}
