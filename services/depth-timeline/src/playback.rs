//! Playback controller
//!
//! Picks which history index is on screen. Mode changes are decided by one
//! transition table ([`next_mode`]); cursor movement is a separate rule per
//! event.
//!
//! | mode \ event | ToggleLive | ScrubTo | Step   | Appended |
//! |--------------|------------|---------|--------|----------|
//! | Live         | Paused     | Paused  | Paused | Live     |
//! | Paused       | Live       | Paused  | Paused | Paused   |
//!
//! Scrub and step against an empty history change nothing, mode included.
//!
//! The cursor is `None` only while the history is empty. The first append
//! defines it in either mode: Live moves it to the newest index, Paused
//! lifts an undefined cursor to the oldest retained index. A paused cursor
//! whose snapshot was evicted is lifted to the oldest retained index too.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PlaybackMode {
    /// Following the newest snapshot.
    Live,
    /// Cursor frozen where the user left it.
    Paused,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackEvent {
    ToggleLive,
    ScrubTo(i64),
    Step(i64),
    Appended,
}

/// Mode transition table.
pub fn next_mode(mode: PlaybackMode, event: PlaybackEvent) -> PlaybackMode {
    use PlaybackEvent::*;
    use PlaybackMode::*;

    match (mode, event) {
        (Live, ToggleLive) => Paused,
        (Paused, ToggleLive) => Live,
        (_, ScrubTo(_)) | (_, Step(_)) => Paused,
        (mode, Appended) => mode,
    }
}

/// Retained index window of the history: `[first, len)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds {
    pub first: usize,
    pub len: usize,
}

impl Bounds {
    pub fn new(first: usize, len: usize) -> Self {
        Self { first, len }
    }

    pub fn is_empty(&self) -> bool {
        self.len <= self.first
    }

    pub fn last(&self) -> Option<usize> {
        (!self.is_empty()).then(|| self.len - 1)
    }

    /// Clamp any signed position into the window.
    pub fn clamp(&self, index: i64) -> Option<usize> {
        let last = self.last()?;
        let clamped = index.clamp(self.first as i64, last as i64);
        Some(clamped as usize)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackController {
    mode: PlaybackMode,
    cursor: Option<usize>,
}

impl PlaybackController {
    pub fn new() -> Self {
        Self {
            mode: PlaybackMode::Live,
            cursor: None,
        }
    }

    pub fn mode(&self) -> PlaybackMode {
        self.mode
    }

    pub fn is_live(&self) -> bool {
        self.mode == PlaybackMode::Live
    }

    /// `None` exactly while the history is empty.
    pub fn cursor(&self) -> Option<usize> {
        self.cursor
    }

    pub fn apply(&mut self, event: PlaybackEvent, bounds: Bounds) {
        let target = match event {
            PlaybackEvent::ToggleLive => match next_mode(self.mode, event) {
                PlaybackMode::Live => bounds.last().or(self.cursor),
                PlaybackMode::Paused => self.cursor,
            },
            PlaybackEvent::ScrubTo(index) => match bounds.clamp(index) {
                Some(index) => Some(index),
                None => return,
            },
            PlaybackEvent::Step(delta) => {
                let Some(last) = bounds.last() else {
                    return;
                };
                let anchor = self.cursor.unwrap_or(last) as i64;
                bounds.clamp(anchor.saturating_add(delta))
            }
            PlaybackEvent::Appended => match self.mode {
                PlaybackMode::Live => bounds.last(),
                PlaybackMode::Paused if bounds.is_empty() => self.cursor,
                PlaybackMode::Paused => {
                    Some(self.cursor.map_or(bounds.first, |c| c.max(bounds.first)))
                }
            },
        };

        self.mode = next_mode(self.mode, event);
        self.cursor = target;
    }

    pub fn toggle_live(&mut self, bounds: Bounds) -> PlaybackMode {
        self.apply(PlaybackEvent::ToggleLive, bounds);
        self.mode
    }

    pub fn scrub_to(&mut self, index: i64, bounds: Bounds) -> Option<usize> {
        self.apply(PlaybackEvent::ScrubTo(index), bounds);
        self.cursor
    }

    pub fn step(&mut self, delta: i64, bounds: Bounds) -> Option<usize> {
        self.apply(PlaybackEvent::Step(delta), bounds);
        self.cursor
    }

    /// Call after every history append, with the post-append bounds.
    pub fn on_append(&mut self, bounds: Bounds) {
        self.apply(PlaybackEvent::Appended, bounds);
    }
}

impl Default for PlaybackController {
    fn default() -> Self {
        Self::new()
    }
}
