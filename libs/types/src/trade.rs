//! Public trade ticks
//!
//! Trades arrive as `(timestamp_ms, price, quantity)` triples and are never
//! modified after receipt.

use crate::numeric::{Price, Quantity};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A single executed trade as reported by the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    pub timestamp_ms: u64,
    pub price: Price,
    pub quantity: Quantity,
}

impl Trade {
    pub fn new(timestamp_ms: u64, price: Price, quantity: Quantity) -> Self {
        Self {
            timestamp_ms,
            price,
            quantity,
        }
    }

    /// Build from the raw wire triple, rejecting non-positive prices and
    /// negative quantities.
    pub fn from_raw(timestamp_ms: u64, price: Decimal, quantity: Decimal) -> Option<Self> {
        Some(Self::new(
            timestamp_ms,
            Price::try_new(price)?,
            Quantity::try_new(quantity)?,
        ))
    }

    /// Execution time as a UTC timestamp, for chart axes.
    pub fn executed_at(&self) -> Option<DateTime<Utc>> {
        i64::try_from(self.timestamp_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
    }

    /// Notional value, `None` past the decimal range.
    pub fn value(&self) -> Option<Decimal> {
        self.price.as_decimal().checked_mul(self.quantity.as_decimal())
    }
}
