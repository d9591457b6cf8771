//! Backend data source interface
//!
//! The backend keeps the live order book; this engine only asks it for the
//! latest depth (truncated to `depth` levels per side) and for the trades
//! received since the previous call. Trade calls have delta semantics, so a
//! successful call must never be replayed.
//!
//! Payload shape:
//!
//! ```text
//! { "symbol": "btcusdt",
//!   "bids": [PqData], "asks": [PqData],
//!   "depthStream": { "btcusdt@depth": [[PqData], [PqData]] } }
//!
//! PqData = { "p": 50000.1, "q": "0.25", "min_seq_id": 7, "max_seq_id": 9 }
//! trades = [[1708123456789, 50000.1, 0.01], ...]
//! ```

use std::collections::BTreeMap;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::fetcher::FetchError;

/// One price level as sent by the backend, not yet validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawLevel {
    pub p: Decimal,
    pub q: Decimal,
    pub min_seq_id: u64,
    pub max_seq_id: u64,
    /// Ignored: color weights are always re-derived locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_color: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_color: Option<f64>,
}

impl RawLevel {
    pub fn new(p: Decimal, q: Decimal, min_seq_id: u64, max_seq_id: u64) -> Self {
        Self {
            p,
            q,
            min_seq_id,
            max_seq_id,
            min_color: None,
            max_color: None,
        }
    }
}

/// `(timestamp_ms, price, quantity)`
pub type RawTrade = (u64, Decimal, Decimal);

/// Latest depth as reported by the backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DepthPayload {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub bids: Vec<RawLevel>,
    #[serde(default)]
    pub asks: Vec<RawLevel>,
    /// Per-feed `(bids, asks)`.
    #[serde(default, rename = "depthStream")]
    pub depth_stream: BTreeMap<String, (Vec<RawLevel>, Vec<RawLevel>)>,
}

impl DepthPayload {
    pub fn from_json(json: &str) -> Result<Self, FetchError> {
        serde_json::from_str(json).map_err(|e| FetchError::Decode {
            cause: e.to_string(),
        })
    }

    /// Number of raw levels across the payload, feeds included.
    pub fn raw_level_count(&self) -> usize {
        self.bids.len()
            + self.asks.len()
            + self
                .depth_stream
                .values()
                .map(|(bids, asks)| bids.len() + asks.len())
                .sum::<usize>()
    }
}

/// Parse a JSON array of `[ts, price, quantity]` triples.
pub fn trades_from_json(json: &str) -> Result<Vec<RawTrade>, FetchError> {
    serde_json::from_str(json).map_err(|e| FetchError::Decode {
        cause: e.to_string(),
    })
}

/// The backend the engine polls.
#[async_trait]
pub trait DepthSource: Send + Sync + 'static {
    /// Latest combined and per-feed ladders, at most `depth` levels per side.
    async fn latest_snapshot(&self, depth: usize) -> Result<DepthPayload, FetchError>;

    /// Trades received since the previous call.
    async fn latest_trades(&self) -> Result<Vec<RawTrade>, FetchError>;
}
