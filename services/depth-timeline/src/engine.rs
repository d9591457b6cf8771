//! Timeline engine
//!
//! One tokio task drives the whole timeline:
//!
//! ```text
//!   loop select! (biased)
//!     ├─ shutdown signal ──────────────▶ close state, drop in-flight fetch, exit
//!     ├─ in-flight fetch completes ────▶ lock state: settle throttle, append, follow live edge
//!     └─ scheduler tick ───────────────▶ lock state: throttle.on_tick()
//!                                          └─ FetchDue ─▶ start the single in-flight fetch
//! ```
//!
//! The fetch future is polled by the same task, so ticks keep counting while
//! it is pending. All timeline state sits in one [`TimelineState`] behind one
//! mutex; each tick, completion and user action takes the lock once and
//! never holds it across an `.await`.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, info, warn};
use types::ladder::Snapshot;

use crate::config::{ConfigError, TimelineConfig};
use crate::fetcher::{FetchError, SnapshotFetcher};
use crate::history::{History, HistoryError};
use crate::merge::MergeOutcome;
use crate::metrics::TimelineMetrics;
use crate::playback::{Bounds, PlaybackController, PlaybackMode};
use crate::scheduler::TickScheduler;
use crate::source::DepthSource;
use crate::throttle::{PollThrottle, TickOutcome};
use crate::view::TimelineView;

/// Everything that must change atomically per tick or user action.
pub struct TimelineState {
    history: History,
    playback: PlaybackController,
    throttle: PollThrottle,
    stale: bool,
    closed: bool,
}

impl TimelineState {
    pub fn new(config: &TimelineConfig) -> Self {
        Self {
            history: History::with_capacity(config.history_capacity),
            playback: PlaybackController::new(),
            throttle: PollThrottle::new(config.interval_ticks, config.start_suspended),
            stale: false,
            closed: false,
        }
    }

    fn bounds(&self) -> Bounds {
        Bounds::new(self.history.first_index(), self.history.len())
    }

    pub fn on_tick(&mut self) -> TickOutcome {
        self.throttle.on_tick()
    }

    /// Append a fetched snapshot and move the cursor if following live.
    /// Returns `None` once the engine is closed; the snapshot is discarded.
    pub fn append_fetched(&mut self, snapshot: Snapshot) -> Option<usize> {
        self.throttle.on_fetch_settled();
        if self.closed {
            return None;
        }
        let index = self.history.append(snapshot);
        self.stale = false;
        let bounds = self.bounds();
        self.playback.on_append(bounds);
        Some(index)
    }

    pub fn fetch_failed(&mut self) {
        self.throttle.on_fetch_settled();
        self.stale = true;
    }

    pub fn close(&mut self) {
        self.closed = true;
    }

    pub fn is_closed(&self) -> bool {
        self.closed
    }

    pub fn toggle_live(&mut self) -> PlaybackMode {
        let bounds = self.bounds();
        self.playback.toggle_live(bounds)
    }

    pub fn scrub_to(&mut self, index: i64) -> Option<usize> {
        let bounds = self.bounds();
        self.playback.scrub_to(index, bounds)
    }

    pub fn step(&mut self, delta: i64) -> Option<usize> {
        let bounds = self.bounds();
        self.playback.step(delta, bounds)
    }

    pub fn history(&self) -> &History {
        &self.history
    }

    pub fn playback(&self) -> &PlaybackController {
        &self.playback
    }

    pub fn throttle(&self) -> &PollThrottle {
        &self.throttle
    }

    pub fn throttle_mut(&mut self) -> &mut PollThrottle {
        &mut self.throttle
    }

    pub fn view(&self) -> TimelineView {
        let cursor = self.playback.cursor();
        let snapshot = cursor.and_then(|i| self.history.get(i).ok().cloned());
        let trades = cursor
            .and_then(|i| self.history.trades_until(i).ok())
            .unwrap_or_default();

        TimelineView {
            mode: self.playback.mode(),
            cursor,
            first_index: self.history.first_index(),
            len: self.history.len(),
            elapsed_ticks: self.throttle.elapsed_ticks(),
            interval_ticks: self.throttle.interval_ticks(),
            suspended: self.throttle.is_suspended(),
            stale: self.stale,
            snapshot,
            trades,
        }
    }
}

struct Shared {
    state: Mutex<TimelineState>,
    metrics: TimelineMetrics,
    shutdown: watch::Sender<bool>,
}

impl Shared {
    /// Poisoning is ignored.
    fn lock(&self) -> MutexGuard<'_, TimelineState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Cloneable control surface for the host UI.
#[derive(Clone)]
pub struct TimelineHandle {
    shared: Arc<Shared>,
}

impl TimelineHandle {
    pub fn toggle_live(&self) -> PlaybackMode {
        self.shared.lock().toggle_live()
    }

    /// Jump to `index`, clamped to the retained range. Pauses playback.
    pub fn scrub_to(&self, index: i64) -> Option<usize> {
        self.shared.lock().scrub_to(index)
    }

    pub fn step(&self, delta: i64) -> Option<usize> {
        self.shared.lock().step(delta)
    }

    pub fn set_interval_ticks(&self, interval_ticks: u64) {
        self.shared.lock().throttle_mut().set_interval_ticks(interval_ticks);
    }

    pub fn set_suspended(&self, suspended: bool) {
        self.shared.lock().throttle_mut().set_suspended(suspended);
    }

    pub fn toggle_suspended(&self) -> bool {
        self.shared.lock().throttle_mut().toggle_suspended()
    }

    pub fn view(&self) -> TimelineView {
        self.shared.lock().view()
    }

    /// Direct indexed read; fails loudly outside the retained range.
    pub fn snapshot(&self, index: usize) -> Result<Arc<Snapshot>, HistoryError> {
        self.shared.lock().history().get(index).cloned()
    }

    pub fn verify(&self, index: usize) -> Result<bool, HistoryError> {
        self.shared.lock().history().verify(index)
    }

    pub fn metrics(&self) -> &TimelineMetrics {
        &self.shared.metrics
    }

    /// Stop ticking and abandon any in-flight fetch. Idempotent.
    pub fn shutdown(&self) {
        self.shared.lock().close();
        self.shared.shutdown.send_replace(true);
    }

    pub fn is_shut_down(&self) -> bool {
        self.shared.lock().is_closed()
    }
}

type FetchFuture = Pin<Box<dyn Future<Output = Result<MergeOutcome, FetchError>> + Send>>;

struct InFlight {
    started: Instant,
    future: FetchFuture,
}

/// Resolves with the in-flight fetch, or never when there is none.
async fn settle(in_flight: &mut Option<InFlight>) -> (Instant, Result<MergeOutcome, FetchError>) {
    match in_flight {
        Some(fetch) => (fetch.started, fetch.future.as_mut().await),
        None => std::future::pending().await,
    }
}

pub struct TimelineEngine<S> {
    fetcher: SnapshotFetcher<S>,
    scheduler: TickScheduler,
    shutdown: watch::Receiver<bool>,
    shared: Arc<Shared>,
    config: TimelineConfig,
}

impl<S: DepthSource> TimelineEngine<S> {
    /// Validate `config`, start the engine task and return its handle.
    pub fn spawn(
        config: TimelineConfig,
        source: Arc<S>,
    ) -> Result<(TimelineHandle, JoinHandle<()>), ConfigError> {
        config.validate()?;

        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared {
            state: Mutex::new(TimelineState::new(&config)),
            metrics: TimelineMetrics::new(),
            shutdown: shutdown_tx,
        });

        let engine = TimelineEngine {
            fetcher: SnapshotFetcher::new(source, config.depth),
            scheduler: TickScheduler::new(config.tick_period(), shutdown_rx.clone()),
            shutdown: shutdown_rx,
            shared: Arc::clone(&shared),
            config,
        };

        let task = tokio::spawn(engine.run());
        Ok((TimelineHandle { shared }, task))
    }

    async fn run(mut self) {
        info!(
            tick_ms = self.config.tick_ms,
            interval_ticks = self.config.interval_ticks,
            depth = self.config.depth,
            history_capacity = ?self.config.history_capacity,
            "Timeline engine started"
        );

        let mut in_flight: Option<InFlight> = None;

        loop {
            if *self.shutdown.borrow() {
                break;
            }

            tokio::select! {
                biased;

                _ = self.shutdown.changed() => break,

                (started, result) = settle(&mut in_flight) => {
                    in_flight = None;
                    self.on_fetch_complete(started, result);
                }

                tick = self.scheduler.next_tick() => {
                    let Some(tick) = tick else { break };
                    if let Some(fetch) = self.on_tick(tick) {
                        in_flight = Some(fetch);
                    }
                }
            }
        }

        self.shared.lock().close();
        self.scheduler.stop();
        if in_flight.is_some() {
            debug!("Abandoned in-flight fetch on shutdown");
        }
        info!(
            ticks = self.scheduler.ticks_emitted(),
            snapshots = self.shared.lock().history().len(),
            "Timeline engine stopped"
        );
    }

    fn on_tick(&self, tick: u64) -> Option<InFlight> {
        self.shared.metrics.record_tick();
        let outcome = self.shared.lock().on_tick();

        match outcome {
            TickOutcome::FetchDue => {
                self.shared.metrics.record_fetch_issued();
                debug!(tick, "Fetch issued");
                let fetcher = self.fetcher.clone();
                Some(InFlight {
                    started: Instant::now(),
                    future: Box::pin(async move { fetcher.fetch().await }),
                })
            }
            TickOutcome::DroppedInFlight => {
                self.shared.metrics.record_dropped_in_flight();
                debug!(tick, "Fetch due while previous fetch in flight, cycle dropped");
                None
            }
            TickOutcome::Counting | TickOutcome::Suspended => None,
        }
    }

    fn on_fetch_complete(&self, started: Instant, result: Result<MergeOutcome, FetchError>) {
        let metrics = &self.shared.metrics;

        match result {
            Ok(outcome) => {
                let latency_us = started.elapsed().as_micros() as u64;
                metrics.record_fetch_succeeded(latency_us, outcome.dropped.len() as u64);

                let appended = self.shared.lock().append_fetched(outcome.snapshot);
                match appended {
                    Some(index) => {
                        metrics.record_appended();
                        debug!(index, latency_us, "Snapshot appended");
                    }
                    None => {
                        metrics.record_late_discard();
                        warn!("Fetch completed after shutdown, snapshot discarded");
                    }
                }
            }
            Err(e) => {
                metrics.record_fetch_failed();
                self.shared.lock().fetch_failed();
                warn!(error = %e, "Fetch cycle failed, retrying next cycle");
            }
        }
    }
}
