//! Fixed-granularity tick source
//!
//! Emits a parameterless tick every `period` until stopped. It knows nothing
//! about fetching; the poll throttle decides what a tick means. Stopping is
//! either explicit (`stop`) or via the shared shutdown channel, and after
//! either no further tick is ever produced.

use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{interval, Interval, MissedTickBehavior};
use tracing::debug;

pub struct TickScheduler {
    interval: Interval,
    shutdown: watch::Receiver<bool>,
    ticks_emitted: u64,
    stopped: bool,
}

impl TickScheduler {
    pub fn new(period: Duration, shutdown: watch::Receiver<bool>) -> Self {
        let mut interval = interval(period);
        // A stalled loop skips missed ticks instead of bursting them.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self {
            interval,
            shutdown,
            ticks_emitted: 0,
            stopped: false,
        }
    }

    /// Wait for the next tick. Returns the running tick count, or `None`
    /// once the scheduler has been stopped.
    pub async fn next_tick(&mut self) -> Option<u64> {
        if self.stopped || *self.shutdown.borrow() {
            self.stopped = true;
            return None;
        }

        tokio::select! {
            biased;
            // A value change or a dropped sender both mean shutdown.
            _ = self.shutdown.changed() => {
                self.stopped = true;
                debug!(ticks_emitted = self.ticks_emitted, "Tick scheduler stopped");
                None
            }
            _ = self.interval.tick() => {
                self.ticks_emitted += 1;
                Some(self.ticks_emitted)
            }
        }
    }

    pub fn stop(&mut self) {
        self.stopped = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }

    pub fn ticks_emitted(&self) -> u64 {
        self.ticks_emitted
    }
}
