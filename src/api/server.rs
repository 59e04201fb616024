use anyhow::{Context, Result};
use tracing::info;

use super::routes::routes;
use super::state::AppState;

/// Bind the configured address and serve until Ctrl-C.
pub async fn serve(state: AppState) -> Result<()> {
    let server = &state.config.server;
    let addr = tokio::net::lookup_host((server.host.as_str(), server.port))
        .await
        .with_context(|| format!("Failed to resolve {}:{}", server.host, server.port))?
        .next()
        .with_context(|| format!("No address for {}:{}", server.host, server.port))?;

    let (bound, server_future) = warp::serve(routes(state.clone()))
        .try_bind_with_graceful_shutdown(addr, async {
            tokio::signal::ctrl_c().await.ok();
            info!("🛑 Shutdown signal received");
        })
        .context("Failed to bind server")?;

    info!("✅ Listening on http://{}", bound);
    info!(
        "   • Input WebSocket: ws://{}/{}",
        bound, state.config.server.ws_input_endpoint
    );
    info!(
        "   • Game WebSocket:  ws://{}/{}",
        bound, state.config.server.ws_game_endpoint
    );

    server_future.await;
    Ok(())
}
