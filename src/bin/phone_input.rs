//! Send steering samples to the backend as if from a phone.
//!
//! ```text
//! phone_input --steering 0.5
//! phone_input --source webcam --steering -0.3 --repeat 20 --interval-ms 50
//! ```

use anyhow::{Context, Result};
use clap::Parser;
use futures_util::{SinkExt, StreamExt};
use std::time::Duration;
use tokio_tungstenite::{connect_async, tungstenite::Message};

use vr_racing_control::core::{init_logging, Config, LogFormat};
use vr_racing_control::ingest::SteeringMessage;

#[derive(Debug, Parser)]
#[command(name = "phone_input", about = "Send steering input to the racing control backend")]
struct Args {
    /// WebSocket URI of the input endpoint (defaults to the local server)
    #[arg(long, env = "RACING_CV_INPUT_URI")]
    uri: Option<String>,

    /// Source name reported with each sample
    #[arg(long, default_value = "phone")]
    source: String,

    /// Steering value; the server clamps it to [-1, 1]
    #[arg(long, allow_hyphen_values = true)]
    steering: f64,

    /// Number of samples to send
    #[arg(long, default_value_t = 1)]
    repeat: u32,

    /// Delay between samples
    #[arg(long, default_value_t = 100)]
    interval_ms: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging("info", LogFormat::Text);

    let uri = match args.uri {
        Some(uri) => uri,
        None => Config::from_env()?.input_ws_uri(),
    };

    let (ws_stream, _) = connect_async(uri.as_str())
        .await
        .with_context(|| format!("Failed to connect to {}", uri))?;
    tracing::info!("Phone input connected to {}", uri);

    let (mut write, mut read) = ws_stream.split();
    let message = serde_json::to_string(&SteeringMessage::new(args.source, args.steering))?;

    for i in 0..args.repeat {
        write.send(Message::Text(message.clone())).await?;
        tracing::info!("Sent steering {} ({}/{})", args.steering, i + 1, args.repeat);

        if i + 1 < args.repeat {
            tokio::time::sleep(Duration::from_millis(args.interval_ms)).await;
        }
    }

    write.send(Message::Close(None)).await?;

    // Drain until the server acknowledges the close or rejected us up front.
    while let Some(msg) = read.next().await {
        match msg {
            Ok(Message::Close(frame)) => {
                if let Some(frame) = frame {
                    tracing::info!("Server closed connection: {} {}", frame.code, frame.reason);
                }
                break;
            }
            Ok(_) => {}
            Err(e) => {
                tracing::debug!("Connection ended: {}", e);
                break;
            }
        }
    }

    Ok(())
}
