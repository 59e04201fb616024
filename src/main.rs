use anyhow::Result;
use std::time::Duration;

use vr_racing_control::api::{self, AppState};
use vr_racing_control::core::{init_logging, Config};

const STATUS_REPORT_INTERVAL: Duration = Duration::from_secs(60);

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::from_env()?;

    // Initialize logging
    init_logging(&config.logging.level, config.logging.format);

    tracing::info!("🚀 Headless VR racing control backend starting...");
    tracing::info!("Version: {}", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        "Fusion: weights={:?} window={} smoothing={} alpha={}",
        config.fusion.weights,
        config.fusion.smoothing_window,
        config.fusion.smoothing_enabled,
        config.fusion.smoothing_alpha
    );

    let sweep_interval = config.fusion.stale_sweep_interval;
    let state = AppState::new(config)?;

    state.hub.spawn_stale_sweeper(sweep_interval).await;

    let health = state.health.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(STATUS_REPORT_INTERVAL);
        interval.tick().await;
        loop {
            interval.tick().await;
            let status = health.get_status().await;
            tracing::info!(
                "Backend status: {:?} (uptime: {}s, merged: {:.3}, sources: {}, inputs: {}/{})",
                status.status,
                status.uptime_seconds,
                status.steering.merged,
                status.steering.sources.len(),
                status.connections.input_clients,
                status.connections.max_input_clients
            );
        }
    });

    api::serve(state).await
}
