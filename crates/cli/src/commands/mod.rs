//! Command implementations. Results are written to stdout; logs go to stderr.

#![allow(clippy::print_stdout)]

use redthread_client::ClientError;
use redthread_core::Price;
use rust_decimal::Decimal;
use thiserror::Error;

pub mod address;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod driver;
pub mod orders;
pub mod shell;

pub use address::AddressAction;
pub use auth::AuthAction;
pub use cart::CartAction;
pub use catalog::CatalogAction;
pub use driver::{DriverAction, RoutesAction};
pub use orders::OrdersAction;

/// Errors that can occur while running a command.
#[derive(Debug, Error)]
pub enum CommandError {
    /// A client service call failed.
    #[error(transparent)]
    Client(#[from] ClientError),

    /// Reading stdin failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Arguments the client cannot act on.
    #[error("{0}")]
    Input(String),
}

/// Format a backend amount in the store currency.
fn money(amount: Decimal) -> Price {
    Price::from_amount(amount)
}
