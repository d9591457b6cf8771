//! Snapshot fetcher
//!
//! One fetch cycle: ask the source for the latest depth, then for the trades
//! since the previous call, then merge both into a snapshot. The depth call
//! goes first so a failed depth call never consumes a trade delta.

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};
use types::trade::Trade;

use crate::merge::{DepthMerger, MergeOutcome};
use crate::source::DepthSource;

/// A fetch cycle failed. The engine absorbs these: it logs, marks the view
/// stale and waits for the next cycle.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Backend call failed: {cause}")]
    Backend { cause: String },

    #[error("Backend payload could not be decoded: {cause}")]
    Decode { cause: String },
}

impl FetchError {
    pub fn backend(cause: impl Into<String>) -> Self {
        FetchError::Backend {
            cause: cause.into(),
        }
    }

    pub fn cause(&self) -> &str {
        match self {
            FetchError::Backend { cause } | FetchError::Decode { cause } => cause,
        }
    }
}

pub struct SnapshotFetcher<S> {
    source: Arc<S>,
    merger: DepthMerger,
}

impl<S> Clone for SnapshotFetcher<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            merger: self.merger.clone(),
        }
    }
}

impl<S: DepthSource> SnapshotFetcher<S> {
    pub fn new(source: Arc<S>, depth: usize) -> Self {
        Self {
            source,
            merger: DepthMerger::new(depth),
        }
    }

    pub fn depth(&self) -> usize {
        self.merger.depth()
    }

    /// Run one fetch cycle.
    pub async fn fetch(&self) -> Result<MergeOutcome, FetchError> {
        let payload = self.source.latest_snapshot(self.merger.depth()).await?;
        let raw_trades = self.source.latest_trades().await?;

        let raw_count = raw_trades.len();
        let trades: Vec<Trade> = raw_trades
            .into_iter()
            .filter_map(|(ts, price, quantity)| {
                let trade = Trade::from_raw(ts, price, quantity);
                if trade.is_none() {
                    warn!(timestamp_ms = ts, %price, %quantity, "Dropping invalid trade");
                }
                trade
            })
            .collect();

        debug!(
            levels = payload.raw_level_count(),
            trades = trades.len(),
            invalid_trades = raw_count - trades.len(),
            "Fetch cycle received"
        );

        Ok(self.merger.merge(&payload, trades))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::{DepthPayload, RawLevel, RawTrade};
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Default)]
    struct CountingSource {
        fail_snapshot: bool,
        trade_calls: AtomicUsize,
    }

    #[async_trait]
    impl DepthSource for CountingSource {
        async fn latest_snapshot(&self, depth: usize) -> Result<DepthPayload, FetchError> {
            if self.fail_snapshot {
                return Err(FetchError::backend("connection refused"));
            }
            let bids = (0..depth as i64 + 5)
                .map(|i| RawLevel::new(Decimal::from(100 - i), Decimal::ONE, 1, 1))
                .collect();
            Ok(DepthPayload {
                bids,
                ..DepthPayload::default()
            })
        }

        async fn latest_trades(&self) -> Result<Vec<RawTrade>, FetchError> {
            self.trade_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![
                (20, Decimal::from(100), Decimal::ONE),
                (10, Decimal::from(99), Decimal::TWO),
                (15, Decimal::from(-1), Decimal::ONE),
            ])
        }
    }

    #[tokio::test]
    async fn test_fetch_merges_and_filters_trades() {
        let fetcher = SnapshotFetcher::new(Arc::new(CountingSource::default()), 4);
        let outcome = fetcher.fetch().await.unwrap();

        assert_eq!(outcome.snapshot.combined.bids.len(), 4);
        let stamps: Vec<u64> = outcome
            .snapshot
            .trades_delta
            .iter()
            .map(|t| t.timestamp_ms)
            .collect();
        assert_eq!(stamps, vec![10, 20]);
    }

    #[tokio::test]
    async fn test_failed_snapshot_skips_trade_call() {
        let source = Arc::new(CountingSource {
            fail_snapshot: true,
            ..CountingSource::default()
        });
        let fetcher = SnapshotFetcher::new(Arc::clone(&source), 10);

        let err = fetcher.fetch().await.unwrap_err();
        assert_eq!(err.cause(), "connection refused");
        assert_eq!(source.trade_calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_error_display() {
        let err = FetchError::Decode {
            cause: "expected value".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Backend payload could not be decoded: expected value"
        );
    }
}
