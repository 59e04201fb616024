use std::sync::Arc;

use crate::connection::ConnectionManager;
use crate::core::{Config, HealthChecker};
use crate::fusion::SteeringHub;
use crate::ingest::IngestMetrics;

/// Everything a request handler needs, cheap to clone per connection.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub hub: SteeringHub,
    pub connections: Arc<ConnectionManager>,
    pub metrics: IngestMetrics,
    pub health: HealthChecker,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self, prometheus::Error> {
        let hub = SteeringHub::new(config.fusion_config());
        let connections = Arc::new(ConnectionManager::new(
            config.connections.max_input_clients,
            config.connections.max_game_clients,
        ));
        let health = HealthChecker::new(hub.clone(), connections.clone());

        Ok(Self {
            config: Arc::new(config),
            hub,
            connections,
            metrics: IngestMetrics::new()?,
            health,
        })
    }
}
