//! Fixed-point price representation using decimal arithmetic.
//!
//! Prices are amounts in the store currency with two decimal places.
//! Arithmetic on totals is done in [`rust_decimal::Decimal`] space; binary
//! floating point never touches money.

use core::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Errors that can occur when constructing a [`Price`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PriceError {
    /// The input string is not a decimal number.
    #[error("invalid price: {0}")]
    Invalid(String),
    /// Prices cannot be negative.
    #[error("price cannot be negative")]
    Negative,
}

/// A non-negative amount of money with two decimal places.
///
/// ## Examples
///
/// ```
/// use clover_core::Price;
///
/// let price = Price::parse("19.99").unwrap();
/// assert_eq!(price.to_string(), "19.99");
///
/// // Rounded to two decimal places on construction.
/// assert_eq!(Price::parse("5").unwrap().to_string(), "5.00");
///
/// assert!(Price::parse("-1.00").is_err());
/// assert!(Price::parse("free").is_err());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Zero amount.
    pub const ZERO: Self = Self(Decimal::ZERO);

    /// Create a price from a decimal amount.
    ///
    /// The amount is rounded (banker's rounding) to two decimal places.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Negative`] for negative amounts.
    pub fn new(amount: Decimal) -> Result<Self, PriceError> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PriceError::Negative);
        }
        Ok(Self(amount.round_dp(2)))
    }

    /// Parse a price from a decimal string such as `"19.99"`.
    ///
    /// # Errors
    ///
    /// Returns [`PriceError::Invalid`] when the input is not a decimal
    /// number and [`PriceError::Negative`] for negative amounts.
    pub fn parse(s: &str) -> Result<Self, PriceError> {
        let amount =
            Decimal::from_str(s.trim()).map_err(|_| PriceError::Invalid(s.to_owned()))?;
        Self::new(amount)
    }

    /// The underlying decimal amount.
    #[must_use]
    pub const fn amount(&self) -> Decimal {
        self.0
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.2}", self.0)
    }
}

impl FromStr for Price {
    type Err = PriceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        assert_eq!(Price::parse("19.99").unwrap().to_string(), "19.99");
        assert_eq!(Price::parse("0").unwrap().to_string(), "0.00");
        assert_eq!(Price::parse(" 12.5 ").unwrap().to_string(), "12.50");
    }

    #[test]
    fn test_rounds_to_two_places() {
        assert_eq!(Price::parse("1.005").unwrap().to_string(), "1.00");
        assert_eq!(Price::parse("1.015").unwrap().to_string(), "1.02");
    }

    #[test]
    fn test_rejects_negative() {
        assert_eq!(Price::parse("-0.01"), Err(PriceError::Negative));
    }

    #[test]
    fn test_rejects_garbage() {
        assert!(matches!(Price::parse("free"), Err(PriceError::Invalid(_))));
        assert!(matches!(Price::parse(""), Err(PriceError::Invalid(_))));
    }

    #[test]
    fn test_ordering() {
        assert!(Price::parse("5.00").unwrap() < Price::parse("10.00").unwrap());
    }

    #[test]
    fn test_serde_uses_decimal_representation() {
        let price = Price::parse("19.99").unwrap();
        let json = serde_json::to_string(&price).unwrap();
        let back: Price = serde_json::from_str(&json).unwrap();
        assert_eq!(back, price);
    }
}
