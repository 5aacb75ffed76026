//! RedThread Core - Shared types library.
//!
//! This crate provides common types used across all RedThread client components:
//! - `client` - HTTP clients, local cache, cart and driver workflows
//! - `cli` - Command-line front end
//!
//! # Architecture
//!
//! The core crate contains only types and traits - no I/O, no database access,
//! no HTTP clients. This keeps it lightweight and allows it to be used anywhere.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for type-safe IDs, prices, quantities, emails, and statuses

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod types;

pub use types::*;
