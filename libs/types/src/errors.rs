//! Error types for depth values
//!
//! Comprehensive error taxonomy using thiserror

use rust_decimal::Decimal;
use thiserror::Error;

/// A single price level failed validation.
///
/// Always scoped to one level: callers drop the level and keep the rest of
/// the ladder.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LevelError {
    #[error("Malformed level: non-positive price {price}")]
    NonPositivePrice { price: Decimal },

    #[error("Malformed level at {price}: negative quantity {quantity}")]
    NegativeQuantity { price: Decimal, quantity: Decimal },

    #[error("Malformed level at {price}: inverted sequence range {min_seq_id} > {max_seq_id}")]
    InvertedSequence {
        price: Decimal,
        min_seq_id: u64,
        max_seq_id: u64,
    },

    #[error("Malformed level at {price}: grouped quantity overflows")]
    QuantityOverflow { price: Decimal },
}

impl LevelError {
    /// Raw price of the offending level.
    pub fn price(&self) -> Decimal {
        match self {
            LevelError::NonPositivePrice { price }
            | LevelError::NegativeQuantity { price, .. }
            | LevelError::InvertedSequence { price, .. }
            | LevelError::QuantityOverflow { price } => *price,
        }
    }
}
