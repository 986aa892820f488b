//! Money and currency primitives.
//!
//! All monetary state in the system is held as signed 64-bit integers in
//! minor units (cents, pence). Conversion to and from major units happens
//! only at the HTTP boundary, through the helpers in this module. Arithmetic
//! is currency-homogeneous and never silently mixes denominations.

use rust_decimal::prelude::*;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Minor units per major unit. All supported currencies carry exactly two
/// fractional digits.
const MINOR_PER_MAJOR: i64 = 100;

/// Supported settlement currencies. Closed set; anything else fails to parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Currency {
    Usd,
    Eur,
    Gbp,
}

impl Currency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Currency::Usd => "USD",
            Currency::Eur => "EUR",
            Currency::Gbp => "GBP",
        }
    }

    pub const ALL: [Currency; 3] = [Currency::Usd, Currency::Eur, Currency::Gbp];
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Currency {
    type Err = MoneyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USD" => Ok(Currency::Usd),
            "EUR" => Ok(Currency::Eur),
            "GBP" => Ok(Currency::Gbp),
            other => Err(MoneyError::InvalidCurrency(other.to_string())),
        }
    }
}

impl TryFrom<String> for Currency {
    type Error = MoneyError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Currency> for String {
    fn from(c: Currency) -> Self {
        c.as_str().to_string()
    }
}

/// Money conversion and arithmetic errors
#[derive(Debug, Error)]
pub enum MoneyError {
    #[error("invalid currency: {0}")]
    InvalidCurrency(String),

    #[error("cannot mix currencies: {0} and {1}")]
    CurrencyMismatch(Currency, Currency),

    #[error("insufficient funds: {available} < {required}")]
    InsufficientFunds { available: i64, required: i64 },

    #[error("amount must be positive")]
    InvalidAmount,

    #[error("amount has more than 2 fractional digits")]
    PrecisionOverflow,

    #[error("amount too large")]
    Overflow,
}

/// A monetary amount in minor units, tagged with its currency.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Money {
    pub amount: i64,
    pub currency: Currency,
}

impl Money {
    pub fn new(amount: i64, currency: Currency) -> Self {
        Self { amount, currency }
    }

    pub fn is_positive(&self) -> bool {
        self.amount > 0
    }

    pub fn is_zero(&self) -> bool {
        self.amount == 0
    }

    pub fn checked_add(self, other: Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        let amount = self
            .amount
            .checked_add(other.amount)
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(amount, self.currency))
    }

    pub fn checked_sub(self, other: Money) -> Result<Money, MoneyError> {
        if self.currency != other.currency {
            return Err(MoneyError::CurrencyMismatch(self.currency, other.currency));
        }
        if self.amount < other.amount {
            return Err(MoneyError::InsufficientFunds {
                available: self.amount,
                required: other.amount,
            });
        }
        Ok(Money::new(self.amount - other.amount, self.currency))
    }

    /// Parse a major-unit decimal (e.g. `100.50`) into minor units (`10050`).
    /// Rejects more than two fractional digits rather than truncating.
    pub fn from_major_units(major: Decimal, currency: Currency) -> Result<Money, MoneyError> {
        if major.normalize().scale() > 2 {
            return Err(MoneyError::PrecisionOverflow);
        }
        let minor = (major * Decimal::from(MINOR_PER_MAJOR))
            .normalize()
            .to_i64()
            .ok_or(MoneyError::Overflow)?;
        Ok(Money::new(minor, currency))
    }

    /// Render minor units back into a two-decimal major-unit value.
    pub fn to_major_units(minor: i64) -> Decimal {
        Decimal::new(minor, 2)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {}",
            self.currency,
            Money::to_major_units(self.amount)
        )
    }
}
