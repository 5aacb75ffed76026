//! JSON wire types for the four backend services.
//!
//! Response types carry prices as [`rust_decimal::Decimal`]; request bodies
//! carry whole-peso integers, which is what the services accept.

pub mod address;
pub mod catalog;
pub mod delivery;
pub mod identity;
pub mod orders;

pub use address::*;
pub use catalog::*;
pub use delivery::*;
pub use identity::*;
pub use orders::*;
