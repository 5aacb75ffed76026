//! Identity service client.

use async_trait::async_trait;
use reqwest::Method;
use tracing::instrument;
use url::Url;

use super::{ApiError, Credentials, IdentityApi, ServiceHttp};
use crate::types::{
    AuthResponse, ChangePasswordRequest, LoginRequest, RegisterRequest, ResetPasswordRequest,
    UpdateMeRequest, UserProfile,
};

/// Client for the identity service.
#[derive(Clone)]
pub struct IdentityClient {
    http: ServiceHttp,
}

impl IdentityClient {
    /// Create a new identity client sharing the session credentials.
    #[must_use]
    pub const fn new(client: reqwest::Client, base: Url, credentials: Credentials) -> Self {
        Self {
            http: ServiceHttp::new(client, base, Some(credentials)),
        }
    }
}

#[async_trait]
impl IdentityApi for IdentityClient {
    #[instrument(skip(self, req), fields(email = %req.email))]
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.http.send(Method::POST, "auth/register", req).await
    }

    #[instrument(skip(self, req), fields(email = %req.email))]
    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.http.send(Method::POST, "auth/login", req).await
    }

    #[instrument(skip(self))]
    async fn me(&self) -> Result<UserProfile, ApiError> {
        self.http.get("me").await
    }

    #[instrument(skip(self, req))]
    async fn update_me(&self, req: &UpdateMeRequest) -> Result<UserProfile, ApiError> {
        self.http.send(Method::PATCH, "me", req).await
    }

    #[instrument(skip(self, req))]
    async fn change_password(&self, req: &ChangePasswordRequest) -> Result<(), ApiError> {
        self.http
            .send_empty(Method::POST, "me/password", Some(req))
            .await
    }

    #[instrument(skip(self, req))]
    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ApiError> {
        self.http
            .send_empty(Method::POST, "auth/reset-password", Some(req))
            .await
    }
}
