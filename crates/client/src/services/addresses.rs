//! Address book, backed by the orders service and mirrored in the cache.

use std::sync::Arc;

use redthread_core::{AddressId, UserId};
use sqlx::SqlitePool;
use tracing::{instrument, warn};

use super::ErrorSlot;
use crate::api::{Credentials, OrdersApi};
use crate::db::{AddressRepository, SessionRepository};
use crate::error::ClientError;
use crate::types::{Address, CreateAddressRequest, UpdateAddressRequest};

#[derive(Clone)]
pub struct AddressService {
    orders: Arc<dyn OrdersApi>,
    credentials: Credentials,
    pool: SqlitePool,
    errors: ErrorSlot,
}

impl AddressService {
    #[must_use]
    pub fn new(
        orders: Arc<dyn OrdersApi>,
        credentials: Credentials,
        pool: SqlitePool,
        errors: ErrorSlot,
    ) -> Self {
        Self {
            orders,
            credentials,
            pool,
            errors,
        }
    }

    /// Fetch the user's addresses and refresh the local copy.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the call fails.
    #[instrument(skip(self))]
    pub async fn list(&self) -> Result<Vec<Address>, ClientError> {
        let result: Result<Vec<Address>, ClientError> = async {
            self.require_token().await?;
            let addresses = self.orders.addresses().await?;
            if let Some(session) = SessionRepository::new(&self.pool).load().await? {
                AddressRepository::new(&self.pool)
                    .replace_for_user(session.user_id, &addresses)
                    .await?;
            }
            Ok(addresses)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Register a new address.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the address is rejected.
    #[instrument(skip_all)]
    pub async fn create(&self, req: &CreateAddressRequest) -> Result<Address, ClientError> {
        let result: Result<Address, ClientError> = async {
            self.require_token().await?;
            Ok(self.orders.create_address(req).await?)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Edit an address. Only the fields set in `req` change.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the update is rejected.
    #[instrument(skip(self, req))]
    pub async fn update(
        &self,
        id: AddressId,
        req: &UpdateAddressRequest,
    ) -> Result<Address, ClientError> {
        let result: Result<Address, ClientError> = async {
            self.require_token().await?;
            Ok(self.orders.update_address(id, req).await?)
        }
        .await;
        self.errors.surface(result).await
    }

    /// Delete an address remotely and from the local copy.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::NoSession` when logged out and
    /// `ClientError::Api` if the delete is rejected.
    #[instrument(skip(self))]
    pub async fn delete(&self, id: AddressId) -> Result<(), ClientError> {
        let result: Result<(), ClientError> = async {
            self.require_token().await?;
            self.orders.delete_address(id).await?;
            if let Err(e) = AddressRepository::new(&self.pool).delete(id).await {
                warn!(error = %e, address_id = %id, "Failed to drop cached address");
            }
            Ok(())
        }
        .await;
        self.errors.surface(result).await
    }

    /// The last fetched addresses for a user, default first.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn cached(&self, user_id: UserId) -> Result<Vec<Address>, ClientError> {
        Ok(AddressRepository::new(&self.pool)
            .list_for_user(user_id)
            .await?)
    }

    /// The user's cached default address, if any.
    ///
    /// # Errors
    ///
    /// Returns `ClientError::Repository` if the cache cannot be read.
    pub async fn cached_default(&self, user_id: UserId) -> Result<Option<Address>, ClientError> {
        Ok(AddressRepository::new(&self.pool)
            .default_for_user(user_id)
            .await?)
    }

    async fn require_token(&self) -> Result<(), ClientError> {
        if self.credentials.is_set().await {
            Ok(())
        } else {
            Err(ClientError::NoSession)
        }
    }
}
