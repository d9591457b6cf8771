//! Chunked trade log
//!
//! The running trade log behind [`History`](crate::history::History). Trades
//! are stored in sealed chunks of [`CHUNK_LEN`] plus one growing tail. A
//! sealed chunk never changes, so a [`TradeSlice`] handed to a view holds
//! `Arc`s to the storage instead of a copy of the trades.
//!
//! ```text
//!   chunk_base        first                              end()
//!       │               │                                  │
//!       ▼───────────────▼──────────┬───────────┬───────────▼
//!       │ chunk 0 (evicted prefix) │ chunk 1   │ tail ...  │
//!       └──────────────────────────┴───────────┴───────────┘
//! ```
//!
//! Positions are absolute: eviction advances `first` and releases chunks
//! that lie wholly before it.

use std::collections::VecDeque;
use std::sync::Arc;

use types::trade::Trade;

/// Trades per sealed chunk.
pub const CHUNK_LEN: usize = 1024;

#[derive(Debug, Clone, Default)]
pub struct TradeLog {
    sealed: Arc<VecDeque<Arc<[Trade]>>>,
    tail: Arc<Vec<Trade>>,
    /// Absolute position of the first trade in `sealed[0]`, or of the tail
    /// when nothing is sealed.
    chunk_base: usize,
    /// Absolute position of the oldest retained trade.
    first: usize,
}

impl TradeLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, trade: Trade) {
        // Clones at most one tail's worth when a view still holds it.
        let tail = Arc::make_mut(&mut self.tail);
        tail.push(trade);
        if tail.len() == CHUNK_LEN {
            let chunk: Arc<[Trade]> = std::mem::take(tail).into();
            Arc::make_mut(&mut self.sealed).push_back(chunk);
        }
    }

    pub fn extend(&mut self, trades: impl IntoIterator<Item = Trade>) {
        for trade in trades {
            self.push(trade);
        }
    }

    /// Absolute position one past the newest trade.
    pub fn end(&self) -> usize {
        self.chunk_base + self.sealed.len() * CHUNK_LEN + self.tail.len()
    }

    /// Absolute position of the oldest retained trade.
    pub fn first(&self) -> usize {
        self.first
    }

    /// Retained trade count.
    pub fn len(&self) -> usize {
        self.end() - self.first
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every trade before absolute position `position`.
    pub fn evict_until(&mut self, position: usize) {
        self.first = self.first.max(position.min(self.end()));
        while !self.sealed.is_empty() && self.chunk_base + CHUNK_LEN <= self.first {
            Arc::make_mut(&mut self.sealed).pop_front();
            self.chunk_base += CHUNK_LEN;
        }
    }

    /// Retained trades before absolute position `end`.
    pub fn until(&self, end: usize) -> TradeSlice {
        let end = end.clamp(self.first, self.end());
        TradeSlice {
            sealed: Arc::clone(&self.sealed),
            tail: Arc::clone(&self.tail),
            chunk_base: self.chunk_base,
            start: self.first,
            end,
        }
    }

    /// Every retained trade.
    pub fn all(&self) -> TradeSlice {
        self.until(self.end())
    }
}

/// Immutable window `[start, end)` over a [`TradeLog`].
///
/// Cloning is O(1); later pushes and evictions on the log leave it unchanged.
#[derive(Debug, Clone, Default)]
pub struct TradeSlice {
    sealed: Arc<VecDeque<Arc<[Trade]>>>,
    tail: Arc<Vec<Trade>>,
    chunk_base: usize,
    start: usize,
    end: usize,
}

impl TradeSlice {
    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    /// Trades in arrival order.
    pub fn iter(&self) -> impl Iterator<Item = &Trade> + '_ {
        let offset = self.start - self.chunk_base;
        self.sealed
            .iter()
            .skip(offset / CHUNK_LEN)
            .flat_map(|chunk| chunk.iter())
            .chain(self.tail.iter())
            .skip(offset % CHUNK_LEN)
            .take(self.len())
    }

    /// Whether both slices read the same underlying storage.
    pub fn shares_storage(&self, other: &TradeSlice) -> bool {
        Arc::ptr_eq(&self.sealed, &other.sealed) && Arc::ptr_eq(&self.tail, &other.tail)
    }
}

impl From<Vec<Trade>> for TradeSlice {
    fn from(trades: Vec<Trade>) -> Self {
        let end = trades.len();
        Self {
            sealed: Arc::default(),
            tail: Arc::new(trades),
            chunk_base: 0,
            start: 0,
            end,
        }
    }
}
