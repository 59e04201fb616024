use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use super::engine::{FusionConfig, FusionEngine};
use crate::error::IngestError;

#[derive(Debug, Clone, Serialize)]
pub struct SteeringSnapshot {
    pub merged_steering: f64,
    pub instant_steering: f64,
    pub sources: BTreeMap<String, f64>,
    pub source_count: usize,
}

/// Shared handle to one fusion engine, safe to clone across connections.
///
/// Writers take the lock for one update plus one recompute; nothing awaits
/// while it is held.
#[derive(Clone)]
pub struct SteeringHub {
    engine: Arc<RwLock<FusionEngine>>,
}

impl SteeringHub {
    pub fn new(config: FusionConfig) -> Self {
        Self {
            engine: Arc::new(RwLock::new(FusionEngine::new(config))),
        }
    }

    /// Apply one inbound sample and return the new merged value.
    pub async fn ingest(
        &self,
        source: &str,
        value: f64,
        timestamp: Option<f64>,
    ) -> Result<f64, IngestError> {
        if !value.is_finite() {
            return Err(IngestError::NonFiniteSteering(value));
        }

        let mut engine = self.engine.write().await;
        engine.update(source, value, timestamp);
        Ok(engine.recompute())
    }

    pub async fn merged_value(&self) -> f64 {
        self.engine.read().await.merged_value()
    }

    pub async fn source_snapshot(&self) -> BTreeMap<String, f64> {
        self.engine.read().await.source_snapshot()
    }

    pub async fn active_source_count(&self) -> usize {
        self.engine.read().await.active_source_count()
    }

    pub async fn snapshot(&self) -> SteeringSnapshot {
        let engine = self.engine.read().await;
        SteeringSnapshot {
            merged_steering: engine.merged_value(),
            instant_steering: engine.instant_value(),
            sources: engine.source_snapshot(),
            source_count: engine.active_source_count(),
        }
    }

    /// Drop stale sources and recompute if any were removed.
    pub async fn evict_stale(&self) -> Vec<String> {
        let mut engine = self.engine.write().await;
        let removed = engine.evict_stale_now();
        if !removed.is_empty() {
            let merged = engine.recompute();
            info!(removed = ?removed, merged, "Evicted stale steering sources");
        }
        removed
    }

    /// Periodically evict stale sources. Returns `None` when staleness
    /// eviction is not configured.
    pub async fn spawn_stale_sweeper(&self, every: Duration) -> Option<JoinHandle<()>> {
        let stale_after = self.engine.read().await.config().stale_after?;
        let hub = self.clone();

        info!(
            "🧹 Stale source sweeper running every {:?} (max age {:?})",
            every, stale_after
        );

        Some(tokio::spawn(async move {
            let mut interval = tokio::time::interval(every);
            loop {
                interval.tick().await;
                let removed = hub.evict_stale().await;
                if removed.is_empty() {
                    debug!("No stale sources");
                }
            }
        }))
    }
}

impl Default for SteeringHub {
    fn default() -> Self {
        Self::new(FusionConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fusion::now_secs;

    #[tokio::test]
    async fn test_ingest_returns_merged_value() {
        let hub = SteeringHub::default();
        let merged = hub.ingest("phone", 0.6, None).await.unwrap();

        assert!((merged - 0.6).abs() < 1e-9);
        assert_eq!(hub.merged_value().await, merged);
        assert_eq!(hub.active_source_count().await, 1);
    }

    #[tokio::test]
    async fn test_non_finite_rejected() {
        let hub = SteeringHub::default();

        assert!(matches!(
            hub.ingest("a", f64::NAN, None).await,
            Err(IngestError::NonFiniteSteering(_))
        ));
        assert!(hub.ingest("a", f64::INFINITY, None).await.is_err());
        assert_eq!(hub.active_source_count().await, 0);
        assert_eq!(hub.merged_value().await, 0.0);
    }

    #[tokio::test]
    async fn test_concurrent_producers() {
        let hub = SteeringHub::default();
        let mut handles = Vec::new();

        for i in 0..8 {
            let hub = hub.clone();
            handles.push(tokio::spawn(async move {
                let source = format!("source-{}", i);
                for step in 0..50 {
                    let value = if step % 2 == 0 { 1.0 } else { -1.0 };
                    hub.ingest(&source, value, None).await.unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let snapshot = hub.snapshot().await;
        assert_eq!(snapshot.source_count, 8);
        assert!((-1.0..=1.0).contains(&snapshot.merged_steering));
        // Every producer ended on an odd step
        assert!(snapshot.sources.values().all(|v| *v == -1.0));
    }

    #[tokio::test]
    async fn test_evict_stale_recomputes() {
        let hub = SteeringHub::new(FusionConfig {
            stale_after: Some(Duration::from_secs(1)),
            ..Default::default()
        });
        hub.engine
            .write()
            .await
            .update_at("old", 0.8, None, now_secs() - 60.0);
        hub.ingest("live", -0.2, None).await.unwrap();

        let removed = hub.evict_stale().await;

        assert_eq!(removed, vec!["old".to_string()]);
        assert_eq!(hub.active_source_count().await, 1);
        assert_eq!(hub.snapshot().await.instant_steering, -0.2);
    }

    #[tokio::test]
    async fn test_producer_timestamp_does_not_expire_source() {
        let hub = SteeringHub::new(FusionConfig {
            stale_after: Some(Duration::from_secs(2)),
            ..Default::default()
        });
        // Seconds since page load rather than since the epoch
        hub.ingest("phone", 0.5, Some(12.0)).await.unwrap();

        assert!(hub.evict_stale().await.is_empty());
        assert_eq!(hub.active_source_count().await, 1);
        assert!((hub.merged_value().await - 0.5).abs() < 1e-9);
    }

    #[tokio::test]
    async fn test_sweeper_not_spawned_without_staleness() {
        let hub = SteeringHub::default();
        assert!(hub
            .spawn_stale_sweeper(Duration::from_millis(10))
            .await
            .is_none());
    }
}
