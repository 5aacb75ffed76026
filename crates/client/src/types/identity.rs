//! Identity service wire types.

use chrono::{DateTime, Utc};
use redthread_core::{Role, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

/// Body for `POST auth/register`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
}

/// Body for `POST auth/login`.
#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// JWT issued by the identity service.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    /// Always `Bearer` today.
    #[serde(default = "default_token_type")]
    pub token_type: String,
    pub access_token: SecretString,
    pub expires_at: Option<DateTime<Utc>>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// The authenticated user's profile (`GET me`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: UserId,
    pub full_name: String,
    pub email: String,
    #[serde(default)]
    pub roles: Vec<String>,
}

impl UserProfile {
    /// The first role the client understands, defaulting to a regular shopper.
    #[must_use]
    pub fn primary_role(&self) -> Role {
        self.roles
            .iter()
            .find_map(|r| r.parse().ok())
            .unwrap_or_default()
    }
}

/// Body for `PATCH me`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMeRequest {
    pub full_name: String,
    pub email: String,
}

/// Body for `POST me/password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Body for `POST auth/reset-password`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    /// Email or phone the account was registered with.
    pub identifier: String,
    pub new_password: String,
}
