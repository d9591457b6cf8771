//! Read-only render view
//!
//! An owned picture of the timeline at one instant, handed to the host UI.
//! Snapshots and the trade log are shared, not copied.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use types::ladder::{Ladder, Snapshot};

use crate::playback::PlaybackMode;
use crate::trade_log::TradeSlice;

#[derive(Debug, Clone)]
pub struct TimelineView {
    pub mode: PlaybackMode,
    pub cursor: Option<usize>,
    /// Scrub control lower bound.
    pub first_index: usize,
    /// Scrub control upper bound (exclusive).
    pub len: usize,
    pub elapsed_ticks: u64,
    pub interval_ticks: u64,
    pub suspended: bool,
    /// The most recent fetch cycle failed.
    pub stale: bool,
    /// `None` renders as empty ladders.
    pub snapshot: Option<Arc<Snapshot>>,
    /// Trades received up to the snapshot under the cursor.
    pub trades: TradeSlice,
}

impl TimelineView {
    pub fn combined(&self) -> Option<&Ladder> {
        self.snapshot.as_deref().map(|s| &s.combined)
    }

    pub fn is_live(&self) -> bool {
        self.mode == PlaybackMode::Live
    }

    /// `(time, price)` series for the trade chart, prices as plot
    /// coordinates. Trades whose timestamp does not map to a calendar time
    /// are skipped.
    pub fn chart_points(&self) -> Vec<(DateTime<Utc>, f64)> {
        self.trades
            .iter()
            .filter_map(|t| t.executed_at().map(|at| (at, t.price.to_f64())))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use types::trade::Trade;

    fn view(trades: Vec<Trade>) -> TimelineView {
        TimelineView {
            mode: PlaybackMode::Live,
            cursor: None,
            first_index: 0,
            len: 0,
            elapsed_ticks: 0,
            interval_ticks: 1000,
            suspended: false,
            stale: false,
            snapshot: None,
            trades: trades.into(),
        }
    }

    #[test]
    fn test_empty_view_has_no_ladders() {
        let view = view(vec![]);
        assert!(view.combined().is_none());
        assert!(view.chart_points().is_empty());
        assert!(view.is_live());
    }

    #[test]
    fn test_chart_points() {
        let trade = Trade::from_raw(1_708_123_456_789, Decimal::from(50000), Decimal::ONE).unwrap();
        let points = view(vec![trade]).chart_points();

        assert_eq!(points.len(), 1);
        assert_eq!(points[0].0.timestamp_millis(), 1_708_123_456_789);
        assert_eq!(points[0].1, 50000.0);
    }
}
