use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::time::Duration;

use super::{clamp_steering, now_secs};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSample {
    pub value: f64,
    /// Producer-supplied time, seconds since the Unix epoch. Informational.
    pub timestamp: f64,
    /// Local arrival time, seconds since the Unix epoch. Staleness is judged
    /// on this.
    pub received_at: f64,
}

/// Per-source bounded history of recent steering samples.
///
/// Sources are created on first update and keep at most `capacity` samples,
/// oldest evicted first.
#[derive(Debug, Clone)]
pub struct SourceRegistry {
    capacity: usize,
    sources: BTreeMap<String, VecDeque<SourceSample>>,
}

impl SourceRegistry {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            sources: BTreeMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record a value for `source`, clamped to [-1.0, 1.0]. A missing
    /// timestamp means "now".
    pub fn update(&mut self, source: &str, value: f64, timestamp: Option<f64>) {
        self.update_at(source, value, timestamp, now_secs());
    }

    /// Same as [`update`](Self::update) with an explicit arrival time.
    pub fn update_at(&mut self, source: &str, value: f64, timestamp: Option<f64>, received_at: f64) {
        let sample = SourceSample {
            value: clamp_steering(value),
            timestamp: timestamp.unwrap_or(received_at),
            received_at,
        };

        let capacity = self.capacity;
        let history = self
            .sources
            .entry(source.to_string())
            .or_insert_with(|| VecDeque::with_capacity(capacity));

        if history.len() == capacity {
            history.pop_front();
        }
        history.push_back(sample);
    }

    pub fn latest(&self, source: &str) -> Option<f64> {
        self.latest_sample(source).map(|s| s.value)
    }

    pub fn latest_sample(&self, source: &str) -> Option<SourceSample> {
        self.sources.get(source).and_then(|h| h.back().copied())
    }

    pub fn history(&self, source: &str) -> Option<&VecDeque<SourceSample>> {
        self.sources.get(source)
    }

    pub fn active_sources(&self) -> BTreeSet<String> {
        self.sources
            .iter()
            .filter(|(_, h)| !h.is_empty())
            .map(|(name, _)| name.clone())
            .collect()
    }

    pub fn active_count(&self) -> usize {
        self.sources.values().filter(|h| !h.is_empty()).count()
    }

    /// Latest value of every active source.
    pub fn snapshot(&self) -> BTreeMap<String, f64> {
        self.sources
            .iter()
            .filter_map(|(name, h)| h.back().map(|s| (name.clone(), s.value)))
            .collect()
    }

    /// Drop sources whose newest sample arrived more than `max_age` before
    /// `now`. Returns the removed names.
    pub fn evict_stale(&mut self, now: f64, max_age: Duration) -> Vec<String> {
        let cutoff = now - max_age.as_secs_f64();
        let stale: Vec<String> = self
            .sources
            .iter()
            .filter(|(_, h)| h.back().map_or(true, |s| s.received_at < cutoff))
            .map(|(name, _)| name.clone())
            .collect();

        for name in &stale {
            self.sources.remove(name);
        }
        stale
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_creates_source_implicitly() {
        let mut registry = SourceRegistry::new(5);
        assert!(registry.latest("webcam").is_none());

        registry.update("webcam", 0.4, Some(1.0));
        assert_eq!(registry.latest("webcam"), Some(0.4));
        assert_eq!(registry.active_count(), 1);
    }

    #[test]
    fn test_update_clamps_out_of_range() {
        let mut registry = SourceRegistry::new(5);
        registry.update("a", 5.0, None);
        registry.update("b", -3.5, None);

        assert_eq!(registry.latest("a"), Some(1.0));
        assert_eq!(registry.latest("b"), Some(-1.0));
    }

    #[test]
    fn test_eviction_keeps_window_and_latest() {
        let mut registry = SourceRegistry::new(5);
        for i in 0..6 {
            registry.update("phone", i as f64 / 10.0, Some(i as f64));
        }

        assert_eq!(registry.active_sources().len(), 1);
        assert_eq!(registry.latest("phone"), Some(0.5));

        let history = registry.history("phone").unwrap();
        assert_eq!(history.len(), 5);
        assert_eq!(history.front().unwrap().value, 0.1);
    }

    #[test]
    fn test_zero_capacity_is_raised_to_one() {
        let mut registry = SourceRegistry::new(0);
        registry.update("a", 0.2, None);
        registry.update("a", 0.3, None);

        assert_eq!(registry.capacity(), 1);
        assert_eq!(registry.latest("a"), Some(0.3));
    }

    #[test]
    fn test_missing_timestamp_uses_wall_clock() {
        let mut registry = SourceRegistry::new(3);
        let before = now_secs();
        registry.update("a", 0.0, None);

        let sample = registry.latest_sample("a").unwrap();
        assert!(sample.timestamp >= before - 1.0);
        assert_eq!(sample.timestamp, sample.received_at);
    }

    #[test]
    fn test_snapshot_reports_latest_per_source() {
        let mut registry = SourceRegistry::new(5);
        registry.update("webcam", 0.1, None);
        registry.update("webcam", 0.2, None);
        registry.update("phone", -0.7, None);

        let snapshot = registry.snapshot();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot["webcam"], 0.2);
        assert_eq!(snapshot["phone"], -0.7);
    }

    #[test]
    fn test_evict_stale_removes_only_old_sources() {
        let mut registry = SourceRegistry::new(5);
        registry.update_at("old", 0.5, None, 100.0);
        registry.update_at("fresh", -0.5, None, 109.0);

        let removed = registry.evict_stale(110.0, Duration::from_secs(5));

        assert_eq!(removed, vec!["old".to_string()]);
        assert!(registry.latest("old").is_none());
        assert_eq!(registry.latest("fresh"), Some(-0.5));
    }

    #[test]
    fn test_evict_stale_ignores_producer_clock() {
        let mut registry = SourceRegistry::new(5);
        // Relative clock from the producer, far behind wall time
        registry.update("phone", 0.5, Some(12.0));
        // Producer clock far ahead of wall time
        registry.update_at("webcam", 0.1, Some(1.0e12), 100.0);

        let removed = registry.evict_stale(now_secs(), Duration::from_secs(2));

        assert_eq!(removed, vec!["webcam".to_string()]);
        assert_eq!(registry.latest("phone"), Some(0.5));
        assert_eq!(registry.latest_sample("phone").unwrap().timestamp, 12.0);
    }
}
