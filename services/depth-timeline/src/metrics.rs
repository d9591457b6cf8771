//! Observability counters for the timeline engine
//!
//! Tracks tick throughput, fetch outcomes, dropped fetch-due cycles and
//! merge rejects. Counters are lock-free atomics; fetch latency goes through
//! a bounded [`LatencyTracker`]. `export()` produces a sorted map the host
//! can scrape or print.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

pub struct TimelineMetrics {
    // Scheduling
    pub ticks: AtomicU64,
    pub fetches_dropped_in_flight: AtomicU64,

    // Fetching
    pub fetches_issued: AtomicU64,
    pub fetches_succeeded: AtomicU64,
    pub fetches_failed: AtomicU64,
    pub fetch_latency_us: Mutex<LatencyTracker>,

    // History
    pub snapshots_appended: AtomicU64,
    pub late_snapshots_discarded: AtomicU64,

    // Merge
    pub malformed_levels: AtomicU64,
}

impl TimelineMetrics {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            fetches_dropped_in_flight: AtomicU64::new(0),
            fetches_issued: AtomicU64::new(0),
            fetches_succeeded: AtomicU64::new(0),
            fetches_failed: AtomicU64::new(0),
            fetch_latency_us: Mutex::new(LatencyTracker::new(1000)),
            snapshots_appended: AtomicU64::new(0),
            late_snapshots_discarded: AtomicU64::new(0),
            malformed_levels: AtomicU64::new(0),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_fetch_issued(&self) {
        self.fetches_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_dropped_in_flight(&self) {
        self.fetches_dropped_in_flight.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a fetch that returned a snapshot, with its round-trip time.
    pub fn record_fetch_succeeded(&self, latency_us: u64, malformed_levels: u64) {
        self.fetches_succeeded.fetch_add(1, Ordering::Relaxed);
        self.malformed_levels
            .fetch_add(malformed_levels, Ordering::Relaxed);
        if let Ok(mut tracker) = self.fetch_latency_us.lock() {
            tracker.record(latency_us);
        }
    }

    pub fn record_fetch_failed(&self) {
        self.fetches_failed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_appended(&self) {
        self.snapshots_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_late_discard(&self) {
        self.late_snapshots_discarded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn fetch_latency_percentile(&self, p: usize) -> Option<u64> {
        self.fetch_latency_us
            .lock()
            .ok()
            .and_then(|tracker| tracker.percentile(p))
    }

    pub fn export(&self) -> BTreeMap<String, u64> {
        let mut m = BTreeMap::new();
        m.insert("ticks".to_string(), self.ticks.load(Ordering::Relaxed));
        m.insert("fetches_issued".to_string(), self.fetches_issued.load(Ordering::Relaxed));
        m.insert("fetches_succeeded".to_string(), self.fetches_succeeded.load(Ordering::Relaxed));
        m.insert("fetches_failed".to_string(), self.fetches_failed.load(Ordering::Relaxed));
        m.insert(
            "fetches_dropped_in_flight".to_string(),
            self.fetches_dropped_in_flight.load(Ordering::Relaxed),
        );
        m.insert("snapshots_appended".to_string(), self.snapshots_appended.load(Ordering::Relaxed));
        m.insert(
            "late_snapshots_discarded".to_string(),
            self.late_snapshots_discarded.load(Ordering::Relaxed),
        );
        m.insert("malformed_levels".to_string(), self.malformed_levels.load(Ordering::Relaxed));
        if let Some(p50) = self.fetch_latency_percentile(50) {
            m.insert("fetch_latency_p50_us".to_string(), p50);
        }
        if let Some(p99) = self.fetch_latency_percentile(99) {
            m.insert("fetch_latency_p99_us".to_string(), p99);
        }
        m
    }
}

impl Default for TimelineMetrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Sliding window of latency samples for percentile queries.
pub struct LatencyTracker {
    samples: std::collections::VecDeque<u64>,
    max_samples: usize,
}

impl LatencyTracker {
    pub fn new(max_samples: usize) -> Self {
        Self {
            samples: std::collections::VecDeque::with_capacity(max_samples),
            max_samples: max_samples.max(1),
        }
    }

    pub fn record(&mut self, value: u64) {
        if self.samples.len() >= self.max_samples {
            self.samples.pop_front();
        }
        self.samples.push_back(value);
    }

    /// Get a percentile value (0-100).
    pub fn percentile(&self, p: usize) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }

        let mut sorted: Vec<u64> = self.samples.iter().copied().collect();
        sorted.sort_unstable();

        let idx = (p.min(100) as f64 / 100.0 * (sorted.len() - 1) as f64) as usize;
        Some(sorted[idx.min(sorted.len() - 1)])
    }

    pub fn average(&self) -> Option<u64> {
        if self.samples.is_empty() {
            return None;
        }
        let sum: u64 = self.samples.iter().sum();
        Some(sum / self.samples.len() as u64)
    }

    pub fn count(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_outcomes_exported() {
        let metrics = TimelineMetrics::new();

        metrics.record_fetch_issued();
        metrics.record_fetch_issued();
        metrics.record_fetch_succeeded(250, 3);
        metrics.record_fetch_failed();
        metrics.record_appended();

        let exported = metrics.export();
        assert_eq!(exported["fetches_issued"], 2);
        assert_eq!(exported["fetches_succeeded"], 1);
        assert_eq!(exported["fetches_failed"], 1);
        assert_eq!(exported["malformed_levels"], 3);
        assert_eq!(exported["snapshots_appended"], 1);
        assert_eq!(exported["fetch_latency_p50_us"], 250);
    }

    #[test]
    fn test_latency_keys_absent_without_samples() {
        let exported = TimelineMetrics::new().export();
        assert!(!exported.contains_key("fetch_latency_p99_us"));
        assert_eq!(exported["ticks"], 0);
    }

    #[test]
    fn test_scheduling_counters() {
        let metrics = TimelineMetrics::new();
        for _ in 0..5 {
            metrics.record_tick();
        }
        metrics.record_dropped_in_flight();
        metrics.record_late_discard();

        let exported = metrics.export();
        assert_eq!(exported["ticks"], 5);
        assert_eq!(exported["fetches_dropped_in_flight"], 1);
        assert_eq!(exported["late_snapshots_discarded"], 1);
    }

    #[test]
    fn test_latency_tracker_percentile() {
        let mut tracker = LatencyTracker::new(100);
        for i in 1..=100 {
            tracker.record(i);
        }

        let p50 = tracker.percentile(50).unwrap();
        assert!((49..=51).contains(&p50));
        let p99 = tracker.percentile(99).unwrap();
        assert!((98..=100).contains(&p99));
    }

    #[test]
    fn test_latency_tracker_window_eviction() {
        let mut tracker = LatencyTracker::new(3);
        tracker.record(10);
        tracker.record(20);
        tracker.record(30);
        tracker.record(40);

        assert_eq!(tracker.count(), 3);
        assert_eq!(tracker.average().unwrap(), 30);
    }
}
