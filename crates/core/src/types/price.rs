//! Type-safe price representation using decimal arithmetic.
//!
//! Product prices arrive from the content store as decimal numbers in the
//! currency's standard unit (dollars). The payment provider wants integer
//! minor units (cents). The conversion rounds to the nearest minor unit with
//! ties away from zero, so `19.995` becomes `2000` and `19.991` becomes `1999`.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};

/// Number of minor units in one standard unit for every supported currency.
const MINOR_UNITS_PER_UNIT: i64 = 100;

/// A price with currency information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Price {
    /// Amount in the currency's standard unit (e.g., dollars, not cents).
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

    /// Amount in minor units, or `None` if it does not fit in an `i64`.
    #[must_use]
    pub fn minor_units(&self) -> Option<i64> {
        to_minor_units(self.amount)
    }

    /// Format for display (e.g., "$19.99").
    #[must_use]
    pub fn display(&self) -> String {
        format!(
            "{}{:.2}",
            self.currency_code.symbol(),
            self.amount
                .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero)
        )
    }
}

/// Convert a standard-unit amount to integer minor units.
///
/// Multiplies by 100 and rounds to the nearest integer, ties away from zero.
/// Returns `None` if the result overflows an `i64`.
#[must_use]
pub fn to_minor_units(amount: Decimal) -> Option<i64> {
    amount
        .checked_mul(Decimal::from(MINOR_UNITS_PER_UNIT))?
        .round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero)
        .to_i64()
}

/// ISO 4217 currency codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum CurrencyCode {
    #[default]
    USD,
    EUR,
    GBP,
    CAD,
    AUD,
}

impl CurrencyCode {
    /// Lowercase code as the payment provider expects it.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::USD => "usd",
            Self::EUR => "eur",
            Self::GBP => "gbp",
            Self::CAD => "cad",
            Self::AUD => "aud",
        }
    }

    /// Display symbol.
    #[must_use]
    pub const fn symbol(&self) -> &'static str {
        match self {
            Self::USD | Self::CAD | Self::AUD => "$",
            Self::EUR => "€",
            Self::GBP => "£",
        }
    }

    /// Parse a currency code, case-insensitively.
    #[must_use]
    pub fn parse(code: &str) -> Option<Self> {
        match code.trim().to_ascii_lowercase().as_str() {
            "usd" => Some(Self::USD),
            "eur" => Some(Self::EUR),
            "gbp" => Some(Self::GBP),
            "cad" => Some(Self::CAD),
            "aud" => Some(Self::AUD),
            _ => None,
        }
    }
}
