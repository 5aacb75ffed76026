//! Client state shared by every front end.

use std::sync::Arc;

use sqlx::SqlitePool;
use tracing::info;

use crate::api::{
    CatalogApi, CatalogClient, Credentials, DeliveryApi, DeliveryClient, IdentityApi,
    IdentityClient, OrdersApi, OrdersClient, build_http_client,
};
use crate::config::ClientConfig;
use crate::db::{self, Session};
use crate::error::ClientError;
use crate::services::{
    AddressService, AuthService, CartService, CatalogService, DriverService, ErrorSlot,
    OrderService,
};

/// The four backend services plus the bearer token they share.
#[derive(Clone)]
pub struct Backends {
    pub identity: Arc<dyn IdentityApi>,
    pub catalog: Arc<dyn CatalogApi>,
    pub orders: Arc<dyn OrdersApi>,
    pub delivery: Arc<dyn DeliveryApi>,
    pub credentials: Credentials,
}

impl Backends {
    /// HTTP clients for the configured service URLs.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Api` if the HTTP client cannot be built.
    pub fn http(config: &ClientConfig) -> Result<Self, ClientError> {
        let client = build_http_client(config.http_timeout)?;
        let credentials = Credentials::new();
        let urls = &config.services;

        Ok(Self {
            identity: Arc::new(IdentityClient::new(
                client.clone(),
                urls.identity.clone(),
                credentials.clone(),
            )),
            catalog: Arc::new(CatalogClient::new(client.clone(), urls.catalog.clone())),
            orders: Arc::new(OrdersClient::new(
                client.clone(),
                urls.orders.clone(),
                credentials.clone(),
            )),
            delivery: Arc::new(DeliveryClient::new(
                client,
                urls.delivery.clone(),
                credentials.clone(),
            )),
            credentials,
        })
    }
}

/// Every client service, wired to the same backends, cache and error slot.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    pool: SqlitePool,
    auth: AuthService,
    cart: CartService,
    catalog: CatalogService,
    orders: OrderService,
    addresses: AddressService,
    driver: DriverService,
}

impl AppState {
    /// Open the cache, apply migrations, build the HTTP clients and restore
    /// any persisted session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be opened or
    /// migrated and `ClientError::Api` if the HTTP client cannot be built.
    pub async fn connect(config: &ClientConfig) -> Result<Self, ClientError> {
        let pool = db::create_pool(&config.cache_url)
            .await
            .map_err(db::RepositoryError::from)?;
        db::migrate(&pool).await?;
        info!(cache = %config.cache_url, "Cache ready");

        let backends = Backends::http(config)?;
        Self::with_backends(backends, pool).await
    }

    /// Wire the services to the given backends and a migrated pool, then
    /// restore the persisted session.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the session cannot be read.
    pub async fn with_backends(backends: Backends, pool: SqlitePool) -> Result<Self, ClientError> {
        let errors = ErrorSlot::new();
        let Backends {
            identity,
            catalog,
            orders,
            delivery,
            credentials,
        } = backends;

        let auth = AuthService::new(identity, credentials.clone(), pool.clone(), errors.clone());
        let cart = CartService::new(orders.clone(), catalog.clone());
        let state = Self {
            inner: Arc::new(AppStateInner {
                catalog: CatalogService::new(catalog, pool.clone()),
                orders: OrderService::new(
                    orders.clone(),
                    cart.clone(),
                    credentials.clone(),
                    pool.clone(),
                    errors.clone(),
                ),
                addresses: AddressService::new(orders, credentials.clone(), pool.clone(), errors),
                driver: DriverService::new(delivery, credentials, pool.clone()),
                auth,
                cart,
                pool,
            }),
        };

        let session = state.inner.auth.restore().await?;
        state.inner.cart.bind_session(session.as_ref()).await;
        Ok(state)
    }

    /// Log in and switch the cart to the server cart, merging guest lines.
    ///
    /// # Errors
    ///
    /// See [`AuthService::login`].
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, ClientError> {
        let session = self.inner.auth.login(email, password).await?;
        self.inner.cart.bind_session(Some(&session)).await;
        Ok(session)
    }

    /// Register, log in and switch the cart to the server cart.
    ///
    /// # Errors
    ///
    /// See [`AuthService::register`].
    pub async fn register(
        &self,
        full_name: &str,
        email: &str,
        password: &str,
    ) -> Result<Session, ClientError> {
        let session = self.inner.auth.register(full_name, email, password).await?;
        self.inner.cart.bind_session(Some(&session)).await;
        Ok(session)
    }

    /// Log out, start an empty guest cart and drop any claimed route.
    ///
    /// The token is gone even when the persisted session cannot be removed,
    /// so the cart and the driver board are reset either way.
    ///
    /// # Errors
    ///
    /// See [`AuthService::logout`].
    pub async fn logout(&self) -> Result<(), ClientError> {
        let result = self.inner.auth.logout().await;
        self.inner.cart.bind_session(None).await;
        self.inner.driver.reset();
        result
    }

    #[must_use]
    pub fn pool(&self) -> &SqlitePool {
        &self.inner.pool
    }

    #[must_use]
    pub fn auth(&self) -> &AuthService {
        &self.inner.auth
    }

    #[must_use]
    pub fn cart(&self) -> &CartService {
        &self.inner.cart
    }

    #[must_use]
    pub fn catalog(&self) -> &CatalogService {
        &self.inner.catalog
    }

    #[must_use]
    pub fn orders(&self) -> &OrderService {
        &self.inner.orders
    }

    #[must_use]
    pub fn addresses(&self) -> &AddressService {
        &self.inner.addresses
    }

    #[must_use]
    pub fn driver(&self) -> &DriverService {
        &self.inner.driver
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::{ProductId, Quantity, RouteId, ShipmentId, ShipmentStatus, VariantId};

    use super::*;
    use crate::api::memory::{InMemoryCatalog, InMemoryDelivery, InMemoryIdentity, InMemoryOrders};
    use crate::db::test_pool;
    use crate::services::DriverBoard;

    fn backends() -> Backends {
        backends_with(InMemoryDelivery::new())
    }

    fn backends_with(delivery: InMemoryDelivery) -> Backends {
        let credentials = Credentials::new();
        let identity = InMemoryIdentity::new(credentials.clone());
        identity.add_user(1, "Ana Soto", "ana@redthread.cl", "Secreta1!", "ROLE_USUARIO");
        let catalog = InMemoryCatalog::new();
        catalog.add_product(1, "Polera Oversize", 14990, &[(10, "M", "Negro")]);
        Backends {
            identity: Arc::new(identity),
            orders: Arc::new(InMemoryOrders::new(catalog.clone())),
            catalog: Arc::new(catalog),
            delivery: Arc::new(delivery),
            credentials,
        }
    }

    #[tokio::test]
    async fn test_guest_cart_follows_login_and_logout() {
        let state = AppState::with_backends(backends(), test_pool().await)
            .await
            .unwrap();
        let line = state
            .catalog()
            .cart_line(VariantId::new(10), Quantity::new(2).unwrap())
            .await
            .unwrap();
        state.cart().add(line).await;
        assert!(!state.cart().snapshot().authenticated);

        state.login("ana@redthread.cl", "Secreta1!").await.unwrap();
        let snapshot = state.cart().snapshot();
        assert!(snapshot.authenticated);
        assert_eq!(snapshot.item_count, 2);
        assert_eq!(snapshot.lines[0].product_id, Some(ProductId::new(1)));

        state.logout().await.unwrap();
        let snapshot = state.cart().snapshot();
        assert!(!snapshot.authenticated);
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_persisted_session_is_restored() {
        let pool = test_pool().await;
        let state = AppState::with_backends(backends(), pool.clone())
            .await
            .unwrap();
        state.login("ana@redthread.cl", "Secreta1!").await.unwrap();

        let restarted = AppState::with_backends(backends(), pool).await.unwrap();
        assert!(restarted.cart().snapshot().authenticated);
        assert_eq!(restarted.auth().me().await.unwrap().email, "ana@redthread.cl");
    }

    #[tokio::test]
    async fn test_logout_drops_claimed_route() {
        let delivery = InMemoryDelivery::new();
        delivery.add_route(1, &[Some(ShipmentStatus::PendingPickup)]);
        let state = AppState::with_backends(backends_with(delivery), test_pool().await)
            .await
            .unwrap();
        state.login("ana@redthread.cl", "Secreta1!").await.unwrap();
        state.driver().claim_route(RouteId::new(1)).await.unwrap();

        state.logout().await.unwrap();
        assert_eq!(state.driver().board(), DriverBoard::default());

        state.login("ana@redthread.cl", "Secreta1!").await.unwrap();
        let err = state
            .driver()
            .mark_picked_up(ShipmentId::new(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ClientError::Validation(_)));
    }

    #[tokio::test]
    async fn test_logout_resets_cart_when_session_row_survives() {
        let pool = test_pool().await;
        let state = AppState::with_backends(backends(), pool.clone())
            .await
            .unwrap();
        state.login("ana@redthread.cl", "Secreta1!").await.unwrap();
        assert!(state.cart().snapshot().authenticated);

        pool.close().await;
        assert!(state.logout().await.is_err());

        let snapshot = state.cart().snapshot();
        assert!(!snapshot.authenticated);
        assert!(snapshot.is_empty());
        assert!(state.driver().board().route.is_none());
    }
}
