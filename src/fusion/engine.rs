use std::collections::{BTreeMap, HashMap, VecDeque};
use std::time::Duration;

use tracing::debug;

use super::registry::SourceRegistry;
use super::{clamp_steering, now_secs};

pub const DEFAULT_SMOOTHING_WINDOW: usize = 5;
pub const DEFAULT_SMOOTHING_ALPHA: f64 = 0.3;

#[derive(Debug, Clone)]
pub struct FusionConfig {
    /// Per-source weights. Sources not listed weigh 1.0 and non-finite
    /// weights count as 0. Weights are renormalised by their sum; when the
    /// sum is not positive every source weighs 1/N.
    pub weights: HashMap<String, f64>,
    pub smoothing_window: usize,
    pub smoothing_enabled: bool,
    /// Exponential smoothing factor, higher is more responsive.
    pub smoothing_alpha: f64,
    /// Sources silent for longer than this are dropped. `None` keeps them forever.
    pub stale_after: Option<Duration>,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            weights: HashMap::new(),
            smoothing_window: DEFAULT_SMOOTHING_WINDOW,
            smoothing_enabled: true,
            smoothing_alpha: DEFAULT_SMOOTHING_ALPHA,
            stale_after: None,
        }
    }
}

/// Combines the latest value of every active source into one steering value.
///
/// Pipeline per [`recompute`](Self::recompute):
/// weighted mean of latest values, then exponential smoothing, then a
/// mean over the last `smoothing_window` outputs, then a final clamp.
/// Disabling smoothing skips only the exponential pass.
#[derive(Debug, Clone)]
pub struct FusionEngine {
    config: FusionConfig,
    registry: SourceRegistry,
    last_smoothed: Option<f64>,
    output_history: VecDeque<f64>,
    instant: f64,
    merged: f64,
}

impl FusionEngine {
    pub fn new(mut config: FusionConfig) -> Self {
        config.smoothing_window = config.smoothing_window.max(1);
        config.smoothing_alpha = if config.smoothing_alpha.is_finite() {
            config.smoothing_alpha.clamp(0.0, 1.0)
        } else {
            DEFAULT_SMOOTHING_ALPHA
        };

        Self {
            registry: SourceRegistry::new(config.smoothing_window),
            output_history: VecDeque::with_capacity(config.smoothing_window),
            last_smoothed: None,
            instant: 0.0,
            merged: 0.0,
            config,
        }
    }

    pub fn config(&self) -> &FusionConfig {
        &self.config
    }

    pub fn registry(&self) -> &SourceRegistry {
        &self.registry
    }

    pub fn update(&mut self, source: &str, value: f64, timestamp: Option<f64>) {
        self.registry.update(source, value, timestamp);
    }

    pub fn update_at(&mut self, source: &str, value: f64, timestamp: Option<f64>, received_at: f64) {
        self.registry.update_at(source, value, timestamp, received_at);
    }

    pub fn recompute(&mut self) -> f64 {
        let current = self.registry.snapshot();
        if current.is_empty() {
            self.instant = 0.0;
            self.merged = 0.0;
            return self.merged;
        }

        self.instant = clamp_steering(self.weighted_mean(&current));

        let mut result = self.instant;
        if self.config.smoothing_enabled {
            let alpha = self.config.smoothing_alpha;
            result = match self.last_smoothed {
                Some(last) => alpha * self.instant + (1.0 - alpha) * last,
                None => self.instant,
            };
            self.last_smoothed = Some(result);
        }

        if self.output_history.len() == self.config.smoothing_window {
            self.output_history.pop_front();
        }
        self.output_history.push_back(result);

        if self.output_history.len() > 1 {
            result = self.output_history.iter().sum::<f64>() / self.output_history.len() as f64;
        }

        self.merged = clamp_steering(result);
        debug!(
            sources = ?current,
            instant = self.instant,
            merged = self.merged,
            "Steering recomputed"
        );
        self.merged
    }

    /// Last value produced by [`recompute`](Self::recompute).
    pub fn merged_value(&self) -> f64 {
        self.merged
    }

    /// Weighted mean from the last recompute, before any smoothing.
    pub fn instant_value(&self) -> f64 {
        self.instant
    }

    pub fn source_snapshot(&self) -> BTreeMap<String, f64> {
        self.registry.snapshot()
    }

    pub fn active_source_count(&self) -> usize {
        self.registry.active_count()
    }

    /// Remove sources that have not been heard from within the staleness
    /// limit, judged by arrival time relative to `now`.
    /// No-op when staleness eviction is disabled.
    pub fn evict_stale(&mut self, now: f64) -> Vec<String> {
        match self.config.stale_after {
            Some(max_age) => self.registry.evict_stale(now, max_age),
            None => Vec::new(),
        }
    }

    pub fn evict_stale_now(&mut self) -> Vec<String> {
        self.evict_stale(now_secs())
    }

    fn weighted_mean(&self, values: &BTreeMap<String, f64>) -> f64 {
        let weights: Vec<f64> = values
            .keys()
            .map(|source| {
                let w = self.config.weights.get(source).copied().unwrap_or(1.0);
                if w.is_finite() { w } else { 0.0 }
            })
            .collect();

        let total: f64 = weights.iter().sum();
        let n = values.len() as f64;

        values
            .values()
            .zip(weights.iter())
            .map(|(v, w)| {
                let normalized = if total > 0.0 { w / total } else { 1.0 / n };
                v * normalized
            })
            .sum()
    }
}

impl Default for FusionEngine {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}
