//! Depth merger
//!
//! Builds an immutable [`Snapshot`] from one backend payload. The merge runs
//! once, at fetch time, so scrubbing through history only reads finished
//! ladders and never recomputes them.
//!
//! Pipeline per payload:
//! 1. Validate every raw level. A malformed level (negative quantity,
//!    inverted sequence range, non-positive price) is dropped on its own;
//!    the rest of the payload is kept.
//! 2. Group by exact price: sum quantities, widen the sequence range to the
//!    min/max of the contributors. Groups that sum to zero are removed.
//! 3. Derive color weights from each level's sequence range relative to the
//!    global span of the snapshot (see [`color_weight`]).
//! 4. Sort bids descending and asks ascending, then keep `depth` levels.
//!
//! The combined ladder is the merge of every feed. A payload without feeds
//! has its own `bids/asks` run through the same pipeline.

use std::collections::BTreeMap;

use tracing::{debug, warn};
use types::errors::LevelError;
use types::ids::FeedName;
use types::ladder::{Ladder, Snapshot};
use types::level::{ColorWeight, PriceLevel, Side};
use types::numeric::Price;
use types::trade::Trade;

use crate::source::{DepthPayload, RawLevel};

/// A level dropped during validation.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{side:?} level in {}: {error}", .feed.as_ref().map_or("combined payload", |f| f.as_str()))]
pub struct MalformedLevel {
    /// `None` for the payload's own combined levels.
    pub feed: Option<FeedName>,
    pub side: Side,
    pub error: LevelError,
}

/// Result of merging one payload.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    pub snapshot: Snapshot,
    pub dropped: Vec<MalformedLevel>,
}

/// Inclusive range of sequence ids seen across a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeqSpan {
    pub lo: u64,
    pub hi: u64,
}

impl SeqSpan {
    pub fn new(lo: u64, hi: u64) -> Self {
        Self {
            lo: lo.min(hi),
            hi: lo.max(hi),
        }
    }

    /// Smallest span covering every level, or `None` for no levels.
    pub fn covering<'a>(levels: impl IntoIterator<Item = &'a PriceLevel>) -> Option<Self> {
        levels.into_iter().fold(None, |acc, level| {
            Some(match acc {
                None => SeqSpan::new(level.min_seq_id, level.max_seq_id),
                Some(span) => SeqSpan {
                    lo: span.lo.min(level.min_seq_id),
                    hi: span.hi.max(level.max_seq_id),
                },
            })
        })
    }

    pub fn width(&self) -> u64 {
        self.hi - self.lo
    }
}

/// Map a level's sequence range onto `[0, 100]` relative to `span`.
///
/// `min` marks where the oldest contribution sits in the span and `max`
/// where the newest does, so the band width grows with the level's own range
/// and `max` grows with recency. A zero-width span paints the full band.
pub fn color_weight(min_seq_id: u64, max_seq_id: u64, span: SeqSpan) -> ColorWeight {
    let width = span.width();
    if width == 0 {
        return ColorWeight::FULL;
    }
    let position = |seq: u64| 100.0 * seq.saturating_sub(span.lo) as f64 / width as f64;
    ColorWeight::new(position(min_seq_id), position(max_seq_id))
}

#[derive(Debug, Clone)]
pub struct DepthMerger {
    depth: usize,
}

impl DepthMerger {
    pub fn new(depth: usize) -> Self {
        Self { depth }
    }

    pub fn depth(&self) -> usize {
        self.depth
    }

    /// Merge a payload and the trades fetched alongside it into a snapshot.
    pub fn merge(&self, payload: &DepthPayload, mut trades: Vec<Trade>) -> MergeOutcome {
        let mut dropped = Vec::new();

        let feeds: Vec<(FeedName, Vec<PriceLevel>, Vec<PriceLevel>)> = payload
            .depth_stream
            .iter()
            .map(|(name, (bids, asks))| {
                let feed = FeedName::new(name.as_str());
                let bids = validate(Some(&feed), Side::Bid, bids, &mut dropped);
                let asks = validate(Some(&feed), Side::Ask, asks, &mut dropped);
                (feed, bids, asks)
            })
            .collect();

        let (fallback_bids, fallback_asks) = if feeds.is_empty() {
            (
                validate(None, Side::Bid, &payload.bids, &mut dropped),
                validate(None, Side::Ask, &payload.asks, &mut dropped),
            )
        } else {
            (Vec::new(), Vec::new())
        };

        let all_levels = feeds
            .iter()
            .flat_map(|(_, bids, asks)| bids.iter().chain(asks.iter()))
            .chain(fallback_bids.iter())
            .chain(fallback_asks.iter());
        let span = SeqSpan::covering(all_levels).unwrap_or(SeqSpan::new(0, 0));

        let combined = if feeds.is_empty() {
            self.ladder(None, fallback_bids.iter(), fallback_asks.iter(), span, &mut dropped)
        } else {
            self.ladder(
                None,
                feeds.iter().flat_map(|(_, bids, _)| bids.iter()),
                feeds.iter().flat_map(|(_, _, asks)| asks.iter()),
                span,
                &mut dropped,
            )
        };

        let mut per_feed: BTreeMap<FeedName, Ladder> = BTreeMap::new();
        for (feed, bids, asks) in &feeds {
            let ladder = self.ladder(Some(feed), bids.iter(), asks.iter(), span, &mut dropped);
            per_feed.insert(feed.clone(), ladder);
        }

        // Stable: trades sharing a timestamp keep their arrival order.
        trades.sort_by_key(|t| t.timestamp_ms);

        debug!(
            symbol = %payload.symbol,
            feeds = per_feed.len(),
            bids = combined.bids.len(),
            asks = combined.asks.len(),
            trades = trades.len(),
            dropped = dropped.len(),
            "Payload merged"
        );

        MergeOutcome {
            snapshot: Snapshot {
                combined,
                per_feed,
                trades_delta: trades,
            },
            dropped,
        }
    }

    fn ladder<'a>(
        &self,
        feed: Option<&FeedName>,
        bids: impl Iterator<Item = &'a PriceLevel>,
        asks: impl Iterator<Item = &'a PriceLevel>,
        span: SeqSpan,
        dropped: &mut Vec<MalformedLevel>,
    ) -> Ladder {
        Ladder {
            bids: self.side(feed, bids, Side::Bid, span, dropped),
            asks: self.side(feed, asks, Side::Ask, span, dropped),
        }
    }

    /// Group by price, color, sort best-first and truncate one side.
    ///
    /// A level whose quantity would overflow its group is dropped; the group
    /// keeps what it had summed so far.
    fn side<'a>(
        &self,
        feed: Option<&FeedName>,
        levels: impl Iterator<Item = &'a PriceLevel>,
        side: Side,
        span: SeqSpan,
        dropped: &mut Vec<MalformedLevel>,
    ) -> Vec<PriceLevel> {
        let mut groups: BTreeMap<Price, PriceLevel> = BTreeMap::new();
        for level in levels {
            let Some(group) = groups.get_mut(&level.price) else {
                groups.insert(level.price, level.clone());
                continue;
            };
            match group.quantity.checked_add(level.quantity) {
                Some(total) => {
                    group.quantity = total;
                    group.min_seq_id = group.min_seq_id.min(level.min_seq_id);
                    group.max_seq_id = group.max_seq_id.max(level.max_seq_id);
                }
                None => {
                    let malformed = MalformedLevel {
                        feed: feed.cloned(),
                        side,
                        error: LevelError::QuantityOverflow {
                            price: level.price.as_decimal(),
                        },
                    };
                    warn!(error = %malformed, "Dropping price level");
                    dropped.push(malformed);
                }
            }
        }

        let colored = groups
            .into_values()
            .filter(|group| !group.quantity.is_zero())
            .map(|mut group| {
                group.color = color_weight(group.min_seq_id, group.max_seq_id, span);
                group
            });

        // BTreeMap iterates ascending: best ask first, best bid last.
        match side {
            Side::Bid => colored.rev().take(self.depth).collect(),
            Side::Ask => colored.take(self.depth).collect(),
        }
    }
}

fn validate(
    feed: Option<&FeedName>,
    side: Side,
    raw: &[RawLevel],
    dropped: &mut Vec<MalformedLevel>,
) -> Vec<PriceLevel> {
    raw.iter()
        .filter_map(|r| match PriceLevel::try_new(r.p, r.q, r.min_seq_id, r.max_seq_id) {
            Ok(level) => Some(level),
            Err(error) => {
                let malformed = MalformedLevel {
                    feed: feed.cloned(),
                    side,
                    error,
                };
                warn!(error = %malformed, "Dropping malformed price level");
                dropped.push(malformed);
                None
            }
        })
        .collect()
}
