//! Type-safe price representation using decimal arithmetic.
//!
//! Prices come from the backend as JSON numbers. They are carried as
//! [`Decimal`] so repeated display and the guest subtotal never drift the way
//! binary floats do.

use core::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., pesos, dollars).
    pub amount: Decimal,
    /// ISO 4217 currency code.
    pub currency_code: CurrencyCode,
}

impl Price {
    /// Create a new price.
    #[must_use]
    pub const fn new(amount: Decimal, currency_code: CurrencyCode) -> Self {
        Self {
            amount,
            currency_code,
        }
    }

    /// Create a price in the store's default currency.
    #[must_use]
    pub fn from_amount(amount: Decimal) -> Self {
        Self::new(amount, CurrencyCode::default())
    }

    /// A zero price in the store's default currency.
    #[must_use]
    pub fn zero() -> Self {
        Self::from_amount(Decimal::ZERO)
    }

    /// Multiply by a line quantity.
    #[must_use]
    pub fn times(self, quantity: u32) -> Self {
        Self::new(self.amount * Decimal::from(quantity), self.currency_code)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let scale = self.currency_code.minor_units();
        let rounded = self.amount.round_dp(scale);
        if scale == 0 {
            write!(f, "{}{}", self.currency_code.symbol(), rounded.trunc())
        } else {
            write!(f, "{}{rounded:.2}", self.currency_code.symbol())
        }
    }
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    CLP,
    USD,
    EUR,
}

impl CurrencyCode {
    /// Currency symbol used for display.
    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::CLP | Self::USD => "$",
            Self::EUR => "€",
        }
    }

    /// Number of decimal places shown for this currency.
    #[must_use]
    pub const fn minor_units(self) -> u32 {
        match self {
            Self::CLP => 0,
            Self::USD | Self::EUR => 2,
        }
    }
}
