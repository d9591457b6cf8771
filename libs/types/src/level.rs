//! Price level types
//!
//! A level is the quantity resting at one price, tagged with the range of
//! update sequence ids that contributed to it and a presentation-only color
//! weight range derived from that sequence range.

use crate::errors::LevelError;
use crate::numeric::{Price, Quantity};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Book side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Side {
    Bid,
    Ask,
}

/// Gradient range in percent, `0 <= min <= max <= 100`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ColorWeight {
    pub min: f64,
    pub max: f64,
}

impl ColorWeight {
    pub const FULL: ColorWeight = ColorWeight { min: 0.0, max: 100.0 };

    /// Clamp both bounds into `[0, 100]` and order them.
    pub fn new(min: f64, max: f64) -> Self {
        let clamp = |v: f64| if v.is_nan() { 0.0 } else { v.clamp(0.0, 100.0) };
        let (a, b) = (clamp(min), clamp(max));
        if a <= b {
            Self { min: a, max: b }
        } else {
            Self { min: b, max: a }
        }
    }

    /// Width of the gradient band.
    pub fn width(&self) -> f64 {
        self.max - self.min
    }
}

impl Default for ColorWeight {
    fn default() -> Self {
        Self::FULL
    }
}

/// A single validated price level.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    pub price: Price,
    pub quantity: Quantity,
    pub min_seq_id: u64,
    pub max_seq_id: u64,
    pub color: ColorWeight,
}

impl PriceLevel {
    /// Validate raw values into a level with a full color weight.
    pub fn try_new(
        price: Decimal,
        quantity: Decimal,
        min_seq_id: u64,
        max_seq_id: u64,
    ) -> Result<Self, LevelError> {
        let checked_price =
            Price::try_new(price).ok_or(LevelError::NonPositivePrice { price })?;
        let checked_quantity =
            Quantity::try_new(quantity).ok_or(LevelError::NegativeQuantity { price, quantity })?;
        if min_seq_id > max_seq_id {
            return Err(LevelError::InvertedSequence {
                price,
                min_seq_id,
                max_seq_id,
            });
        }

        Ok(Self {
            price: checked_price,
            quantity: checked_quantity,
            min_seq_id,
            max_seq_id,
            color: ColorWeight::FULL,
        })
    }

    /// Number of sequence ids between the oldest and newest contribution.
    pub fn seq_span(&self) -> u64 {
        self.max_seq_id - self.min_seq_id
    }
}
