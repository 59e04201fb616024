use futures_util::{SinkExt, StreamExt};
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use warp::ws::{Message, WebSocket};

use super::state::AppState;
use crate::connection::ClientRole;
use crate::error::IngestError;
use crate::ingest::message::{preview, GameUpdateMessage, SteeringMessage};

/// Policy-violation close code sent when a role is at capacity.
const CLOSE_POLICY_VIOLATION: u16 = 1008;
const LOG_PREVIEW_CHARS: usize = 100;

/// Parse one text frame and feed it to the fusion hub.
pub async fn process_input_frame(state: &AppState, raw: &str) -> Result<f64, IngestError> {
    let message = SteeringMessage::parse(raw)?;
    let merged = state
        .hub
        .ingest(&message.source, message.steering, message.timestamp)
        .await?;

    let active = state.hub.active_source_count().await;
    state.metrics.record_fusion(merged, active);
    debug!(
        source = %message.source,
        steering = message.steering,
        merged,
        "Steering updated"
    );
    Ok(merged)
}

/// Input producer loop: every text frame is one steering sample.
pub async fn serve_input_client(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut write, mut read) = socket.split();

    if !admit(&state, ClientRole::Input, connection_id).await {
        let _ = write
            .send(Message::close_with(
                CLOSE_POLICY_VIOLATION,
                "Input client limit reached",
            ))
            .await;
        return;
    }

    while let Some(frame) = read.next().await {
        let msg = match frame {
            Ok(msg) => msg,
            Err(e) => {
                warn!(%connection_id, "Input socket error: {}", e);
                break;
            }
        };

        if msg.is_close() {
            info!(%connection_id, "Input client disconnected");
            break;
        }

        // Binary, ping and pong frames carry no steering data
        let Ok(text) = msg.to_str() else {
            continue;
        };

        state.metrics.increment_messages_received();
        if let Err(e) = process_input_frame(&state, text).await {
            state.metrics.increment_messages_rejected(e.reason());
            warn!(
                %connection_id,
                raw_data = %preview(text, LOG_PREVIEW_CHARS),
                "Dropped input message: {}",
                e
            );
        }
    }

    leave(&state, ClientRole::Input, connection_id).await;
}

/// Consumer loop: push the merged value at the configured rate until the
/// client goes away.
pub async fn serve_game_client(socket: WebSocket, state: AppState) {
    let connection_id = Uuid::new_v4();
    let (mut write, mut read) = socket.split();

    if !admit(&state, ClientRole::Game, connection_id).await {
        let _ = write
            .send(Message::close_with(
                CLOSE_POLICY_VIOLATION,
                "Game client limit reached",
            ))
            .await;
        return;
    }

    let mut ticker = tokio::time::interval(state.config.game_update_interval());

    loop {
        tokio::select! {
            frame = read.next() => match frame {
                None => break,
                Some(Ok(msg)) if msg.is_close() => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    warn!(%connection_id, "Game socket error: {}", e);
                    break;
                }
            },
            _ = ticker.tick() => {
                let update = GameUpdateMessage::now(state.hub.merged_value().await);
                let text = match serde_json::to_string(&update) {
                    Ok(text) => text,
                    Err(e) => {
                        error!(%connection_id, "Failed to encode game update: {}", e);
                        break;
                    }
                };
                if let Err(e) = write.send(Message::text(text)).await {
                    debug!(%connection_id, "Game client send failed: {}", e);
                    break;
                }
            }
        }
    }

    leave(&state, ClientRole::Game, connection_id).await;
}

async fn admit(state: &AppState, role: ClientRole, connection_id: Uuid) -> bool {
    if !state.connections.try_acquire(role).await {
        state.metrics.increment_connections_rejected(role);
        warn!(%connection_id, "{} client connection rejected: limit reached", role);
        return false;
    }

    let stats = state.connections.get_stats().await;
    state.metrics.record_connections(&stats);
    info!(%connection_id, ?stats, "{} client connected", role);
    true
}

async fn leave(state: &AppState, role: ClientRole, connection_id: Uuid) {
    state.connections.release(role).await;
    let stats = state.connections.get_stats().await;
    state.metrics.record_connections(&stats);
    info!(%connection_id, ?stats, "{} client cleaned up", role);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Config;

    #[tokio::test]
    async fn test_process_input_frame_updates_hub() {
        let state = AppState::new(Config::default()).unwrap();

        let merged = process_input_frame(&state, r#"{"source":"phone","steering":0.6}"#)
            .await
            .unwrap();

        assert!((merged - 0.6).abs() < 1e-9);
        assert_eq!(state.hub.active_source_count().await, 1);
    }

    #[tokio::test]
    async fn test_process_input_frame_rejects_garbage() {
        let state = AppState::new(Config::default()).unwrap();

        let err = process_input_frame(&state, r#"{"source":"phone","steering":"x"}"#)
            .await
            .unwrap_err();

        assert_eq!(err.reason(), "non_numeric");
        assert_eq!(state.hub.active_source_count().await, 0);
    }
}
