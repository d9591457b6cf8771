//! Identifier types for depth feeds
//!
//! Feeds are named after the upstream stream that produced them, usually in
//! `symbol@stream` form (e.g. `btcusdt@depth`, `btcusdt@bookTicker`).

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of one upstream depth feed.
///
/// Ordered lexicographically so per-feed ladders iterate deterministically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedName(String);

impl FeedName {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Try to create a FeedName, returning None for blank names
    pub fn try_new(name: impl Into<String>) -> Option<Self> {
        let s = name.into();
        if s.trim().is_empty() {
            None
        } else {
            Some(Self(s))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Symbol part of a `symbol@stream` name, or the whole name.
    pub fn symbol(&self) -> &str {
        self.0.split('@').next().unwrap_or(&self.0)
    }

    /// Stream part of a `symbol@stream` name, if present.
    pub fn stream(&self) -> Option<&str> {
        self.0.split_once('@').map(|(_, stream)| stream)
    }
}

impl fmt::Display for FeedName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for FeedName {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}
