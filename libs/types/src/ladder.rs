//! Sorted bid/ask ladders and the immutable snapshot that bundles them
//!
//! Bids are kept in descending price order and asks in ascending price
//! order, so index 0 is always the best price on either side.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::ids::FeedName;
use crate::level::{PriceLevel, Side};
use crate::numeric::Price;
use crate::trade::Trade;

/// Both sides of one book, best price first.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Ladder {
    pub bids: Vec<PriceLevel>,
    pub asks: Vec<PriceLevel>,
}

impl Ladder {
    pub fn new(bids: Vec<PriceLevel>, asks: Vec<PriceLevel>) -> Self {
        Self { bids, asks }
    }

    pub fn side(&self, side: Side) -> &[PriceLevel] {
        match side {
            Side::Bid => &self.bids,
            Side::Ask => &self.asks,
        }
    }

    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|l| l.price)
    }

    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|l| l.price)
    }

    /// Get the mid-market price (average of best bid and best ask).
    pub fn mid_price(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => bid
                .as_decimal()
                .checked_add(ask.as_decimal())
                .map(|sum| sum / Decimal::from(2)),
            _ => None,
        }
    }

    /// Get the spread between best ask and best bid.
    pub fn spread(&self) -> Option<Decimal> {
        match (self.best_bid(), self.best_ask()) {
            (Some(bid), Some(ask)) => Some(ask.as_decimal() - bid.as_decimal()),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.bids.is_empty() && self.asks.is_empty()
    }

    /// Whether both sides respect best-first ordering.
    pub fn is_sorted(&self) -> bool {
        self.bids.windows(2).all(|w| w[0].price > w[1].price)
            && self.asks.windows(2).all(|w| w[0].price < w[1].price)
    }
}

/// One fetched, merged view of the book plus the trades received with it.
///
/// Immutable once built; the history store hands out shared references.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Price-aggregated ladder across every feed.
    pub combined: Ladder,
    /// Ladder of each individual feed.
    pub per_feed: BTreeMap<FeedName, Ladder>,
    /// Trades received since the previous snapshot, ordered by timestamp.
    pub trades_delta: Vec<Trade>,
}

impl Snapshot {
    pub fn feed(&self, name: &FeedName) -> Option<&Ladder> {
        self.per_feed.get(name)
    }

    pub fn feed_names(&self) -> impl Iterator<Item = &FeedName> {
        self.per_feed.keys()
    }

    /// Highest sequence id seen on any level of this snapshot.
    pub fn last_sequence(&self) -> Option<u64> {
        std::iter::once(&self.combined)
            .chain(self.per_feed.values())
            .flat_map(|ladder| ladder.bids.iter().chain(ladder.asks.iter()))
            .map(|level| level.max_seq_id)
            .max()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn level(price: u64, seq: u64) -> PriceLevel {
        PriceLevel::try_new(Decimal::from(price), Decimal::ONE, seq, seq).unwrap()
    }

    #[test]
    fn test_empty_ladder() {
        let ladder = Ladder::default();
        assert!(ladder.is_empty());
        assert!(ladder.best_bid().is_none());
        assert!(ladder.mid_price().is_none());
        assert!(ladder.spread().is_none());
    }

    #[test]
    fn test_best_prices_and_spread() {
        let ladder = Ladder::new(
            vec![level(50000, 1), level(49900, 2)],
            vec![level(51000, 3), level(51100, 4)],
        );

        assert_eq!(ladder.best_bid(), Some(Price::from_u64(50000)));
        assert_eq!(ladder.best_ask(), Some(Price::from_u64(51000)));
        assert_eq!(ladder.spread().unwrap(), Decimal::from(1000));
        assert_eq!(ladder.mid_price().unwrap(), Decimal::from(50500));
        assert!(ladder.is_sorted());
        assert_eq!(ladder.side(Side::Ask).len(), 2);
    }

    #[test]
    fn test_unsorted_ladder_detected() {
        let ladder = Ladder::new(vec![level(49900, 1), level(50000, 2)], vec![]);
        assert!(!ladder.is_sorted());
    }

    #[test]
    fn test_snapshot_last_sequence() {
        let mut snapshot = Snapshot::default();
        assert_eq!(snapshot.last_sequence(), None);

        snapshot.combined = Ladder::new(vec![level(100, 4)], vec![]);
        snapshot
            .per_feed
            .insert(FeedName::new("btcusdt@depth"), Ladder::new(vec![], vec![level(101, 9)]));
        assert_eq!(snapshot.last_sequence(), Some(9));
        assert_eq!(snapshot.feed_names().count(), 1);
    }
}
