//! Client error types.

use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::db::RepositoryError;

/// Errors returned by the client services.
#[derive(Debug, Error)]
pub enum ClientError {
    /// A backend call failed.
    #[error(transparent)]
    Api(#[from] ApiError),

    /// The local cache failed.
    #[error("cache error: {0}")]
    Repository(#[from] RepositoryError),

    /// Configuration could not be loaded.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The operation needs a logged-in user.
    #[error("No active session.")]
    NoSession,

    /// Input rejected before reaching a service.
    #[error("{0}")]
    Validation(String),
}

impl ClientError {
    /// Message suitable for showing to the user once.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(ApiError::Unauthorized) => "Invalid credentials or expired session.".to_string(),
            Self::Api(ApiError::NotFound) => "Not found.".to_string(),
            Self::Api(ApiError::Api { message, .. }) => message.clone(),
            Self::Api(ApiError::Http(_)) => "Could not reach the server.".to_string(),
            Self::Api(ApiError::RateLimited(secs)) => {
                format!("Too many requests, try again in {secs} seconds.")
            }
            other => other.to_string(),
        }
    }
}
