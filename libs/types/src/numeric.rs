//! Fixed-point decimal types for prices and quantities
//!
//! Uses rust_decimal for deterministic arithmetic (no floating-point errors).
//! Grouping levels by price relies on exact decimal equality, so `1.0` and
//! `1.00` land on the same level.

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// A strictly positive price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Price(Decimal);

impl Price {
    /// Returns None unless `value > 0`.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value > Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_u64(value: u64) -> Self {
        Self(Decimal::from(value))
    }

    /// Parse a decimal string such as `"50000.25"`.
    pub fn from_str(value: &str) -> Option<Self> {
        Decimal::from_str_exact(value).ok().and_then(Self::try_new)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    /// Lossy conversion for chart axes.
    pub fn to_f64(&self) -> f64 {
        self.0.to_f64().unwrap_or(0.0)
    }
}

impl fmt::Display for Price {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A non-negative quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Quantity(Decimal);

impl Quantity {
    pub const ZERO: Quantity = Quantity(Decimal::ZERO);

    /// Returns None for negative values.
    pub fn try_new(value: Decimal) -> Option<Self> {
        if value >= Decimal::ZERO {
            Some(Self(value))
        } else {
            None
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        Decimal::from_str_exact(value).ok().and_then(Self::try_new)
    }

    pub fn as_decimal(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    /// Sum of two quantities, `None` past the decimal range.
    pub fn checked_add(self, rhs: Quantity) -> Option<Quantity> {
        self.0.checked_add(rhs.0).map(Quantity)
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_price_must_be_positive() {
        assert!(Price::try_new(Decimal::from(1)).is_some());
        assert!(Price::try_new(Decimal::ZERO).is_none());
        assert!(Price::try_new(Decimal::from(-5)).is_none());
    }

    #[test]
    fn test_quantity_rejects_negative() {
        assert!(Quantity::try_new(Decimal::ZERO).is_some());
        assert!(Quantity::try_new(Decimal::from(-1)).is_none());
    }

    #[test]
    fn test_price_equality_ignores_scale() {
        assert_eq!(Price::from_str("1.0"), Price::from_str("1.00"));
    }

    #[test]
    fn test_quantity_addition() {
        let total = Quantity::from_str("1.5")
            .unwrap()
            .checked_add(Quantity::from_str("2.25").unwrap());
        assert_eq!(total, Quantity::from_str("3.75"));
    }

    #[test]
    fn test_quantity_addition_overflow() {
        let max = Quantity::try_new(Decimal::MAX).unwrap();
        assert_eq!(max.checked_add(max), None);
        assert_eq!(max.checked_add(Quantity::ZERO), Some(max));
    }

    #[test]
    fn test_price_to_f64() {
        assert_eq!(Price::from_str("50000.5").unwrap().to_f64(), 50000.5);
    }

    #[test]
    fn test_price_serialization_accepts_numbers_and_strings() {
        let from_str: Price = serde_json::from_str("\"50000.5\"").unwrap();
        let from_num: Price = serde_json::from_str("50000.5").unwrap();
        assert_eq!(from_str, from_num);
    }

    proptest! {
        #[test]
        fn prop_constructors_enforce_sign(mantissa in any::<i64>(), scale in 0u32..10) {
            let value = Decimal::new(mantissa, scale);
            prop_assert_eq!(Price::try_new(value).is_some(), value > Decimal::ZERO);
            prop_assert_eq!(Quantity::try_new(value).is_some(), value >= Decimal::ZERO);
        }

        #[test]
        fn prop_checked_add_matches_decimal(a in 0i64..i64::MAX, b in 0i64..i64::MAX) {
            let qa = Quantity::try_new(Decimal::from(a)).unwrap();
            let qb = Quantity::try_new(Decimal::from(b)).unwrap();
            let sum = qa.checked_add(qb).unwrap();
            prop_assert_eq!(sum.as_decimal(), Decimal::from(a) + Decimal::from(b));
        }
    }
}
