//! Snapshot history store
//!
//! Append-only, index-addressable record of every merged snapshot plus the
//! running trade log. Indices are absolute: with a capacity set, the oldest
//! entries are evicted but every retained snapshot keeps the index it was
//! given at append.
//!
//! ```text
//!   first_index()                     len()
//!        │                              │
//!   ─────▼──────────────────────────────▼
//!   evicted │ s5 │ s6 │ s7 │ ... │ s11 │ next append
//! ```
//!
//! Each entry remembers where the trade log ended after its own delta, so the
//! trades visible "as of" any snapshot are a prefix of the retained log,
//! handed out as a [`TradeSlice`] that shares the log's storage.

use std::collections::VecDeque;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use types::ladder::{Ladder, Snapshot};

use crate::trade_log::{TradeLog, TradeSlice};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HistoryError {
    #[error("Snapshot index {index} out of range [{first}, {len})")]
    IndexOutOfRange {
        index: usize,
        first: usize,
        len: usize,
    },
}

struct Entry {
    snapshot: Arc<Snapshot>,
    checksum: String,
    /// Absolute trade-log length once this snapshot's delta was appended.
    trade_end: usize,
}

pub struct History {
    entries: VecDeque<Entry>,
    /// Absolute index of `entries[0]`.
    base: usize,
    trades: TradeLog,
    capacity: Option<usize>,
}

impl History {
    /// Unbounded history.
    pub fn new() -> Self {
        Self::with_capacity(None)
    }

    /// `Some(n)` keeps at most `n` snapshots, evicting the oldest.
    pub fn with_capacity(capacity: Option<usize>) -> Self {
        Self {
            entries: VecDeque::new(),
            base: 0,
            trades: TradeLog::new(),
            capacity: capacity.map(|n| n.max(1)),
        }
    }

    /// Store a snapshot and return the index it was assigned.
    pub fn append(&mut self, snapshot: Snapshot) -> usize {
        let index = self.len();
        let checksum = snapshot_checksum(&snapshot);

        self.trades.extend(snapshot.trades_delta.iter().copied());
        let trade_end = self.trades.end();

        self.entries.push_back(Entry {
            snapshot: Arc::new(snapshot),
            checksum,
            trade_end,
        });

        if let Some(capacity) = self.capacity {
            while self.entries.len() > capacity {
                self.evict_oldest();
            }
        }

        index
    }

    fn evict_oldest(&mut self) {
        let Some(evicted) = self.entries.pop_front() else {
            return;
        };
        self.base += 1;
        self.trades.evict_until(evicted.trade_end);
    }

    pub fn get(&self, index: usize) -> Result<&Arc<Snapshot>, HistoryError> {
        self.entry(index).map(|e| &e.snapshot)
    }

    fn entry(&self, index: usize) -> Result<&Entry, HistoryError> {
        index
            .checked_sub(self.base)
            .and_then(|offset| self.entries.get(offset))
            .ok_or(HistoryError::IndexOutOfRange {
                index,
                first: self.base,
                len: self.len(),
            })
    }

    /// Absolute index the next append will receive.
    pub fn len(&self) -> usize {
        self.base + self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest retained index.
    pub fn first_index(&self) -> usize {
        self.base
    }

    /// Newest retained index, if any.
    pub fn last_index(&self) -> Option<usize> {
        self.len().checked_sub(1).filter(|_| !self.is_empty())
    }

    pub fn retained(&self) -> usize {
        self.entries.len()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    /// Every retained trade in arrival order.
    pub fn all_trades(&self) -> TradeSlice {
        self.trades.all()
    }

    /// Total trades ever appended, evicted ones included.
    pub fn total_trades(&self) -> usize {
        self.trades.end()
    }

    /// Retained trades received up to and including snapshot `index`.
    pub fn trades_until(&self, index: usize) -> Result<TradeSlice, HistoryError> {
        let end = self.entry(index)?.trade_end;
        Ok(self.trades.until(end))
    }

    /// Recompute the checksum of snapshot `index` and compare it with the
    /// one recorded at append.
    pub fn verify(&self, index: usize) -> Result<bool, HistoryError> {
        let entry = self.entry(index)?;
        Ok(snapshot_checksum(&entry.snapshot) == entry.checksum)
    }

    pub fn checksum(&self, index: usize) -> Result<&str, HistoryError> {
        self.entry(index).map(|e| e.checksum.as_str())
    }
}

impl Default for History {
    fn default() -> Self {
        Self::new()
    }
}

/// SHA-256 over every ladder and trade of a snapshot, hex encoded.
///
/// Feeds hash in `BTreeMap` order so equal snapshots always agree.
pub fn snapshot_checksum(snapshot: &Snapshot) -> String {
    let mut hasher = Sha256::new();

    hash_ladder(&mut hasher, &snapshot.combined);
    for (feed, ladder) in &snapshot.per_feed {
        hasher.update(feed.as_str().as_bytes());
        hasher.update(b"=");
        hash_ladder(&mut hasher, ladder);
    }
    hasher.update(b"###");

    for trade in &snapshot.trades_delta {
        hasher.update(trade.timestamp_ms.to_le_bytes());
        hasher.update(trade.price.to_string().as_bytes());
        hasher.update(b"@");
        hasher.update(trade.quantity.to_string().as_bytes());
        hasher.update(b"|");
    }

    format!("{:x}", hasher.finalize())
}

fn hash_ladder(hasher: &mut Sha256, ladder: &Ladder) {
    for levels in [&ladder.bids, &ladder.asks] {
        for level in levels {
            hasher.update(level.price.to_string().as_bytes());
            hasher.update(b":");
            hasher.update(level.quantity.to_string().as_bytes());
            hasher.update(level.min_seq_id.to_le_bytes());
            hasher.update(level.max_seq_id.to_le_bytes());
            hasher.update(b"|");
        }
        hasher.update(b"---");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use rust_decimal::Decimal;
    use types::level::PriceLevel;
    use types::trade::Trade;

    fn trade(ts: u64) -> Trade {
        Trade::from_raw(ts, Decimal::from(100), Decimal::ONE).unwrap()
    }

    /// Snapshot whose best bid encodes `tag` and carries the given trades.
    fn snapshot(tag: u64, trade_stamps: &[u64]) -> Snapshot {
        let level = PriceLevel::try_new(Decimal::from(tag + 1), Decimal::ONE, tag, tag).unwrap();
        Snapshot {
            combined: Ladder::new(vec![level], vec![]),
            trades_delta: trade_stamps.iter().map(|ts| trade(*ts)).collect(),
            ..Snapshot::default()
        }
    }

    fn stamps(trades: TradeSlice) -> Vec<u64> {
        trades.iter().map(|t| t.timestamp_ms).collect()
    }

    #[test]
    fn test_append_assigns_sequential_indices() {
        let mut history = History::new();
        assert!(history.is_empty());
        assert_eq!(history.last_index(), None);

        for i in 0..3 {
            assert_eq!(history.append(snapshot(i, &[])), i as usize);
        }
        assert_eq!(history.len(), 3);
        assert_eq!(history.first_index(), 0);
        assert_eq!(history.last_index(), Some(2));
        assert_eq!(**history.get(1).unwrap(), snapshot(1, &[]));
    }

    #[test]
    fn test_get_out_of_range() {
        let mut history = History::new();
        history.append(snapshot(0, &[]));

        assert_eq!(
            history.get(1).unwrap_err(),
            HistoryError::IndexOutOfRange {
                index: 1,
                first: 0,
                len: 1
            }
        );
    }

    #[test]
    fn test_all_trades_in_arrival_order() {
        let mut history = History::new();
        history.append(snapshot(0, &[5, 7]));
        history.append(snapshot(1, &[]));
        history.append(snapshot(2, &[3]));

        assert_eq!(stamps(history.all_trades()), vec![5, 7, 3]);
        assert_eq!(stamps(history.trades_until(0).unwrap()), vec![5, 7]);
        assert_eq!(stamps(history.trades_until(1).unwrap()), vec![5, 7]);
        assert_eq!(stamps(history.trades_until(2).unwrap()), vec![5, 7, 3]);
        assert_eq!(history.total_trades(), 3);
    }

    #[test]
    fn test_trade_slices_survive_later_appends() {
        let mut history = History::with_capacity(Some(2));
        history.append(snapshot(0, &[1, 2]));
        let held = history.trades_until(0).unwrap();
        assert!(held.shares_storage(&history.all_trades()));

        for i in 1..4 {
            history.append(snapshot(i, &[i * 10]));
        }

        // eviction and growth do not reach a slice already handed out
        assert_eq!(stamps(held), vec![1, 2]);
        assert_eq!(stamps(history.all_trades()), vec![20, 30]);
    }

    #[test]
    fn test_bounded_ring_keeps_indices_stable() {
        let mut history = History::with_capacity(Some(3));
        for i in 0..5 {
            history.append(snapshot(i, &[i * 10, i * 10 + 1]));
        }

        assert_eq!(history.len(), 5);
        assert_eq!(history.first_index(), 2);
        assert_eq!(history.retained(), 3);
        assert!(matches!(
            history.get(1),
            Err(HistoryError::IndexOutOfRange { first: 2, len: 5, .. })
        ));
        assert_eq!(**history.get(4).unwrap(), snapshot(4, &[40, 41]));

        // trades of evicted snapshots go with them
        assert_eq!(stamps(history.all_trades()), vec![20, 21, 30, 31, 40, 41]);
        assert_eq!(stamps(history.trades_until(3).unwrap()), vec![20, 21, 30, 31]);
        assert_eq!(history.total_trades(), 10);
    }

    #[test]
    fn test_verify_detects_no_mutation() {
        let mut history = History::new();
        history.append(snapshot(9, &[1]));

        assert!(history.verify(0).unwrap());
        assert_eq!(history.checksum(0).unwrap(), snapshot_checksum(&snapshot(9, &[1])));
        assert!(history.verify(1).is_err());
    }

    #[test]
    fn test_checksum_distinguishes_content() {
        assert_ne!(
            snapshot_checksum(&snapshot(1, &[])),
            snapshot_checksum(&snapshot(2, &[]))
        );
        assert_ne!(
            snapshot_checksum(&snapshot(1, &[])),
            snapshot_checksum(&snapshot(1, &[4]))
        );
    }

    proptest! {
        #[test]
        fn prop_appended_snapshots_read_back_unchanged(
            tags in proptest::collection::vec(0u64..1_000, 1..40),
            capacity in proptest::option::of(1usize..10),
        ) {
            let mut history = History::with_capacity(capacity);
            for tag in &tags {
                history.append(snapshot(*tag, &[*tag]));
            }

            prop_assert_eq!(history.len(), tags.len());
            for index in history.first_index()..history.len() {
                prop_assert_eq!(&**history.get(index).unwrap(), &snapshot(tags[index], &[tags[index]]));
                prop_assert!(history.verify(index).unwrap());
            }
            let expected: Vec<u64> = tags[history.first_index()..].to_vec();
            prop_assert_eq!(stamps(history.all_trades()), expected);
        }
    }
}
