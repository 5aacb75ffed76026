//! RedThread client library.
//!
//! Talks to the four RedThread backend services (identity, catalog, orders,
//! delivery) and keeps a local SQLite cache for offline browsing and the
//! persisted login.
//!
//! # Architecture
//!
//! - [`api`] - Typed HTTP clients behind one trait per service
//! - [`db`] - SQLite cache repositories
//! - [`services`] - Cart reconciliation, checkout, addresses, catalog and the
//!   delivery driver workflow
//! - [`state`] - [`AppState`], which wires everything to one configuration
//!
//! # Example
//!
//! ```rust,ignore
//! let config = ClientConfig::from_env()?;
//! let app = AppState::connect(&config).await?;
//! app.login("ana@redthread.cl", "Secreta1!").await?;
//! let cart = app.cart().snapshot();
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod services;
pub mod state;
pub mod types;

pub use config::ClientConfig;
pub use error::ClientError;
pub use state::{AppState, Backends};
