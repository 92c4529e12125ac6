//! Catalog price type using decimal arithmetic.
//!
//! Prices are non-negative amounts with at most two fractional digits,
//! stored as a whole number of cents.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is empty.
    #[error("price is required")]
    Empty,
    /// The input is not a decimal number.
    #[error("price must be a number")]
    NotANumber,
    /// The amount is below zero.
    #[error("price cannot be negative")]
    Negative,
    /// The amount has more than two fractional digits.
    #[error("price can have at most two decimal places")]
    TooPrecise,
    /// The amount exceeds [`Price::MAX_CENTS`].
    #[error("price is too large")]
    TooLarge,
}

/// A non-negative catalog price.
///
/// ```
/// use cupboard_core::Price;
///
/// let price = Price::parse("9.99").unwrap();
/// assert_eq!(price.cents(), 999);
/// assert_eq!(price.to_string(), "9.99");
///
/// assert!(Price::parse("-1").is_err());
/// assert!(Price::parse("1.005").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Decimal", into = "Decimal")]
pub struct Price {
    cents: i64,
}

impl Price {
    /// Largest accepted price in cents (99 999 999.99).
    pub const MAX_CENTS: i64 = 9_999_999_999;

    /// Parse a price from user input such as `"9.99"` or `"12"`.
    ///
    /// Surrounding whitespace is ignored.
    ///
    /// # Errors
    ///
    /// Returns a [`PriceError`] if the input is empty, not a number, negative,
    /// has more than two decimal places, or exceeds [`Price::MAX_CENTS`].
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(PriceError::Empty);
        }

        let amount = Decimal::from_str(trimmed).map_err(|_| PriceError::NotANumber)?;
        Self::from_decimal(amount)
    }

    /// Build a price from a decimal amount.
    ///
    /// # Errors
    ///
    /// Same rules as [`Price::parse`], minus the string handling.
    pub fn from_decimal(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }

        if amount.normalize().scale() > 2 {
            return Err(PriceError::TooPrecise);
        }

        let cents = amount
            .checked_mul(Decimal::ONE_HUNDRED)
            .and_then(|c| c.to_i64())
            .ok_or(PriceError::TooLarge)?;

        Self::from_cents(cents)
    }

    /// Build a price from a whole number of cents.
    ///
    /// # Errors
    ///
    /// Returns `PriceError::Negative` or `PriceError::TooLarge` when out of range.
    pub const fn from_cents(cents: i64) -> Result<Self, PriceError> {
        if cents < 0 {
            return Err(PriceError::Negative);
        }
        if cents > Self::MAX_CENTS {
            return Err(PriceError::TooLarge);
        }
        Ok(Self { cents })
    }

    /// The price in cents.
    #[must_use]
    pub const fn cents(&self) -> i64 {
        self.cents
    }

    /// The price as an exact decimal amount.
    #[must_use]
    pub fn amount(&self) -> Decimal {
        Decimal::new(self.cents, 2)
    }

    /// The price as a floating-point number, for JSON consumers.
    #[must_use]
    #[allow(clippy::cast_precision_loss)] // MAX_CENTS is well below 2^53
    pub fn to_f64(&self) -> f64 {
        self.cents as f64 / 100.0
    }

    /// Smallest whole-cent price that is `>= bound`.
    ///
    /// Used to turn an inclusive lower filter bound of arbitrary precision
    /// into an integer comparison against stored cents.
    #[must_use]
    pub fn cents_at_least(bound: Decimal) -> i64 {
        bound
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|c| c.ceil())
            .and_then(|c| c.to_i64())
            .unwrap_or(if bound.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            })
    }

    /// Largest whole-cent price that is `<= bound`.
    #[must_use]
    pub fn cents_at_most(bound: Decimal) -> i64 {
        bound
            .checked_mul(Decimal::ONE_HUNDRED)
            .map(|c| c.floor())
            .and_then(|c| c.to_i64())
            .unwrap_or(if bound.is_sign_negative() {
                i64::MIN
            } else {
                i64::MAX
            })
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.cents / 100, self.cents % 100)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<Decimal> for Price {
    type Error = PriceError;

    fn try_from(amount: Decimal) -> Result<Self, Self::Error> {
        Self::from_decimal(amount)
    }
}

impl From<Price> for Decimal {
    fn from(price: Price) -> Self {
        price.amount()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_valid() {
        assert_eq!(Price::parse("9.99").unwrap().cents(), 999);
        assert_eq!(Price::parse("12").unwrap().cents(), 1200);
        assert_eq!(Price::parse(" 0.5 ").unwrap().cents(), 50);
        assert_eq!(Price::parse("0").unwrap().cents(), 0);
        assert_eq!(Price::parse("3.100").unwrap().cents(), 310);
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(Price::parse(""), Err(PriceError::Empty));
        assert_eq!(Price::parse("   "), Err(PriceError::Empty));
        assert_eq!(Price::parse("abc"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("9,99"), Err(PriceError::NotANumber));
        assert_eq!(Price::parse("-0.01"), Err(PriceError::Negative));
        assert_eq!(Price::parse("1.005"), Err(PriceError::TooPrecise));
        assert_eq!(Price::parse("100000000"), Err(PriceError::TooLarge));
    }

    #[test]
    fn test_display() {
        assert_eq!(Price::from_cents(999).unwrap().to_string(), "9.99");
        assert_eq!(Price::from_cents(5).unwrap().to_string(), "0.05");
        assert_eq!(Price::from_cents(1200).unwrap().to_string(), "12.00");
    }

    #[test]
    fn test_amount_and_f64() {
        let price = Price::from_cents(999).unwrap();
        assert_eq!(price.amount(), Decimal::from_str("9.99").unwrap());
        assert!((price.to_f64() - 9.99).abs() < f64::EPSILON);
    }

    #[test]
    fn test_filter_bounds_round_inward() {
        let d = |s: &str| Decimal::from_str(s).unwrap();
        assert_eq!(Price::cents_at_least(d("9.99")), 999);
        assert_eq!(Price::cents_at_least(d("9.991")), 1000);
        assert_eq!(Price::cents_at_most(d("9.999")), 999);
        assert_eq!(Price::cents_at_most(d("-0.5")), -50);
    }

    #[test]
    fn test_serde_uses_decimal_string() {
        let price = Price::from_cents(999).unwrap();
        let json = serde_json::to_string(&price).unwrap();
        assert_eq!(json, "\"9.99\"");
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
        assert!(serde_json::from_str::<Price>("\"-1\"").is_err());
    }
}
