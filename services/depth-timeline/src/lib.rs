//! Depth Timeline Engine
//!
//! Polls a depth backend and keeps a scrubbable history of merged order-book
//! snapshots for a live market-depth viewer:
//! - Tick-counted polling with an adjustable interval and suspend toggle
//! - At most one backend fetch in flight
//! - Multi-feed depth merge into sorted, recency-colored ladders
//! - Append-only (optionally bounded) snapshot history with a chunked,
//!   shareable trade log
//! - Live-follow / paused playback with scrub and step
//!
//! # Architecture
//!
//! ```text
//!  TickScheduler
//!        │ tick
//!    ┌───▼────────┐
//!    │PollThrottle│  ← counts ticks, gates fetches
//!    └───┬────────┘
//!        │ fetch due
//!  ┌─────▼──────────┐      ┌────────────┐
//!  │SnapshotFetcher │ ───▶ │DepthSource │  (backend, external)
//!  └─────┬──────────┘      └────────────┘
//!        │ payload + trades
//!   ┌────▼──────┐
//!   │DepthMerger│  ← validate, group, color, sort, truncate
//!   └────┬──────┘
//!        │ Snapshot
//!   ┌────▼────┐      ┌──────────────────┐
//!   │ History │ ───▶ │PlaybackController│
//!   └─────────┘      └────────┬─────────┘
//!                             │
//!                      TimelineView  → host UI
//! ```

pub mod config;
pub mod engine;
pub mod fetcher;
pub mod history;
pub mod merge;
pub mod metrics;
pub mod playback;
pub mod scheduler;
pub mod source;
pub mod throttle;
pub mod trade_log;
pub mod view;

pub use config::{ConfigError, TimelineConfig};
pub use engine::{TimelineEngine, TimelineHandle, TimelineState};
pub use fetcher::{FetchError, SnapshotFetcher};
pub use history::{History, HistoryError};
pub use playback::{PlaybackController, PlaybackMode};
pub use source::{DepthPayload, DepthSource, RawLevel, RawTrade};
pub use trade_log::{TradeLog, TradeSlice};
pub use view::TimelineView;

// Library version
pub const SERVICE_VERSION: &str = "0.1.0";
