use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::connection::{ClientRole, ConnectionManager, ConnectionStats};
use crate::fusion::SteeringHub;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthState {
    Healthy,
    /// Input slots exhausted; new producers are being turned away.
    Degraded,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SteeringHealth {
    pub merged: f64,
    pub sources: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthStatus {
    pub status: HealthState,
    pub version: String,
    pub uptime_seconds: u64,
    pub steering: SteeringHealth,
    pub connections: ConnectionStats,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone)]
pub struct HealthChecker {
    start_time: std::time::Instant,
    hub: SteeringHub,
    connections: Arc<ConnectionManager>,
}

impl HealthChecker {
    pub fn new(hub: SteeringHub, connections: Arc<ConnectionManager>) -> Self {
        Self {
            start_time: std::time::Instant::now(),
            hub,
            connections,
        }
    }

    pub async fn get_status(&self) -> HealthStatus {
        let steering = SteeringHealth {
            merged: self.hub.merged_value().await,
            sources: self.hub.source_snapshot().await,
        };
        let connections = self.connections.get_stats().await;

        HealthStatus {
            status: if self.connections.is_full(ClientRole::Input).await {
                HealthState::Degraded
            } else {
                HealthState::Healthy
            },
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_seconds: self.start_time.elapsed().as_secs(),
            steering,
            connections,
            timestamp: Utc::now(),
        }
    }
}
