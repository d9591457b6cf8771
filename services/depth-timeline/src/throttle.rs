//! Poll throttle
//!
//! Turns scheduler ticks into fetch-due signals. Each tick bumps an elapsed
//! counter; once the counter exceeds `interval_ticks` (and polling is not
//! suspended) a fetch is due and the counter resets to zero. The counter is
//! readable at any time and interval changes apply from the next tick.
//!
//! ```text
//!            set_suspended(false)
//!    ┌──────┐ ───────────────▶ ┌─────────┐   counter > interval   ┌──────────┐
//!    │ Idle │                  │ Waiting │ ─────────────────────▶ │ Fetching │
//!    └──────┘ ◀─────────────── └─────────┘ ◀───────────────────── └──────────┘
//!            set_suspended(true)            on_fetch_settled()
//! ```
//!
//! While `Fetching`, a due cycle is reported as [`TickOutcome::DroppedInFlight`]
//! and not queued, so at most one fetch is ever outstanding.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThrottlePhase {
    /// Suspended with nothing outstanding.
    Idle,
    /// Counting toward the next fetch.
    Waiting,
    /// One fetch outstanding.
    Fetching,
}

/// What a single tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Counter advanced, nothing due yet.
    Counting,
    /// Counter advanced while suspended; never fires.
    Suspended,
    /// Caller must start a fetch now.
    FetchDue,
    /// A cycle came due while the previous fetch is still pending.
    DroppedInFlight,
}

#[derive(Debug, Clone)]
pub struct PollThrottle {
    elapsed_ticks: u64,
    interval_ticks: u64,
    suspended: bool,
    phase: ThrottlePhase,
    cycles_dropped: u64,
}

impl PollThrottle {
    pub fn new(interval_ticks: u64, suspended: bool) -> Self {
        Self {
            elapsed_ticks: 0,
            interval_ticks,
            suspended,
            phase: if suspended {
                ThrottlePhase::Idle
            } else {
                ThrottlePhase::Waiting
            },
            cycles_dropped: 0,
        }
    }

    pub fn on_tick(&mut self) -> TickOutcome {
        self.elapsed_ticks = self.elapsed_ticks.saturating_add(1);

        if self.suspended {
            return TickOutcome::Suspended;
        }
        if self.elapsed_ticks <= self.interval_ticks {
            return TickOutcome::Counting;
        }

        self.elapsed_ticks = 0;
        match self.phase {
            ThrottlePhase::Fetching => {
                self.cycles_dropped += 1;
                TickOutcome::DroppedInFlight
            }
            ThrottlePhase::Idle | ThrottlePhase::Waiting => {
                self.phase = ThrottlePhase::Fetching;
                TickOutcome::FetchDue
            }
        }
    }

    /// The outstanding fetch finished, successfully or not.
    pub fn on_fetch_settled(&mut self) {
        if self.phase == ThrottlePhase::Fetching {
            self.phase = if self.suspended {
                ThrottlePhase::Idle
            } else {
                ThrottlePhase::Waiting
            };
        }
    }

    /// Takes effect on the next tick; the current counter is kept as is.
    pub fn set_interval_ticks(&mut self, interval_ticks: u64) {
        self.interval_ticks = interval_ticks;
    }

    pub fn set_suspended(&mut self, suspended: bool) {
        self.suspended = suspended;
        self.phase = match (self.phase, suspended) {
            (ThrottlePhase::Fetching, _) => ThrottlePhase::Fetching,
            (_, true) => ThrottlePhase::Idle,
            (_, false) => ThrottlePhase::Waiting,
        };
    }

    pub fn toggle_suspended(&mut self) -> bool {
        self.set_suspended(!self.suspended);
        self.suspended
    }

    pub fn elapsed_ticks(&self) -> u64 {
        self.elapsed_ticks
    }

    pub fn interval_ticks(&self) -> u64 {
        self.interval_ticks
    }

    pub fn is_suspended(&self) -> bool {
        self.suspended
    }

    pub fn phase(&self) -> ThrottlePhase {
        self.phase
    }

    /// Due cycles dropped because a fetch was already in flight.
    pub fn cycles_dropped(&self) -> u64 {
        self.cycles_dropped
    }
}
