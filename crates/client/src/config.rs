//! Client configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! All variables are optional; defaults target a local development stack.
//!
//! - `RT_IDENTITY_URL` - Identity service base URL (default: `http://127.0.0.1:8081/`)
//! - `RT_CATALOG_URL` - Catalog service base URL (default: `http://127.0.0.1:8082/`)
//! - `RT_ORDERS_URL` - Orders service base URL (default: `http://127.0.0.1:8083/`)
//! - `RT_DELIVERY_URL` - Delivery service base URL (default: `http://127.0.0.1:8084/`)
//! - `RT_CACHE_URL` - SQLite cache location (default: `sqlite://redthread.db?mode=rwc`)
//! - `RT_HTTP_TIMEOUT_SECS` - Per-request timeout, `0` disables it (default: 30)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name

use std::time::Duration;

use thiserror::Error;
use url::Url;

const DEFAULT_TIMEOUT_SECS: &str = "30";

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Base URLs of the four backend services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceUrls {
    pub identity: Url,
    pub catalog: Url,
    pub orders: Url,
    pub delivery: Url,
}

/// Client configuration.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Backend service base URLs, each ending in `/`
    pub services: ServiceUrls,
    /// SQLite connection string for the local cache
    pub cache_url: String,
    /// Per-request HTTP timeout; `None` waits indefinitely
    pub http_timeout: Option<Duration>,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "production", "staging")
    pub sentry_environment: Option<String>,
}

impl ClientConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidEnvVar` if a URL or the timeout does not parse.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let services = ServiceUrls {
            identity: get_service_url("RT_IDENTITY_URL", "http://127.0.0.1:8081/")?,
            catalog: get_service_url("RT_CATALOG_URL", "http://127.0.0.1:8082/")?,
            orders: get_service_url("RT_ORDERS_URL", "http://127.0.0.1:8083/")?,
            delivery: get_service_url("RT_DELIVERY_URL", "http://127.0.0.1:8084/")?,
        };
        let cache_url = get_env_or_default("RT_CACHE_URL", "sqlite://redthread.db?mode=rwc");
        let http_timeout = parse_timeout(
            "RT_HTTP_TIMEOUT_SECS",
            &get_env_or_default("RT_HTTP_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
        )?;

        Ok(Self {
            services,
            cache_url,
            http_timeout,
            sentry_dsn: get_optional_env("SENTRY_DSN"),
            sentry_environment: get_optional_env("SENTRY_ENVIRONMENT"),
        })
    }

    /// Configuration for a given set of services with default timeout and an
    /// in-memory cache.
    #[must_use]
    pub fn for_services(services: ServiceUrls) -> Self {
        Self {
            services,
            cache_url: "sqlite::memory:".to_string(),
            http_timeout: Some(Duration::from_secs(30)),
            sentry_dsn: None,
            sentry_environment: None,
        }
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Get an optional environment variable, treating blank values as unset.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    get_optional_env(key).unwrap_or_else(|| default.to_string())
}

/// Read a service base URL from the environment.
fn get_service_url(key: &str, default: &str) -> Result<Url, ConfigError> {
    parse_base_url(key, &get_env_or_default(key, default))
}

/// Parse an absolute http(s) URL and make sure its path ends in `/`, so that
/// relative endpoint paths join below it instead of replacing the last segment.
fn parse_base_url(key: &str, value: &str) -> Result<Url, ConfigError> {
    let mut url = Url::parse(value.trim())
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;

    if !matches!(url.scheme(), "http" | "https") {
        return Err(ConfigError::InvalidEnvVar(
            key.to_string(),
            format!("unsupported scheme '{}'", url.scheme()),
        ));
    }

    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

fn parse_timeout(key: &str, value: &str) -> Result<Option<Duration>, ConfigError> {
    let secs = value
        .trim()
        .parse::<u64>()
        .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))?;
    Ok((secs > 0).then(|| Duration::from_secs(secs)))
}
