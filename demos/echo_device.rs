//! Echo Device - answers every command with its own arguments.
//!
//! This example demonstrates:
//! - Loading the device configuration from a TOML file
//! - Driving the client event loop
//! - Answering requests and reconnecting after a disconnect
//!
//! # Running
//!
//! ```text
//! $ cat device.toml
//! server_address = "ws://127.0.0.1:8000"
//! device_id = "echo-1"
//! device_psk = "secret"
//!
//! $ RUST_LOG=clubby_client=debug cargo run --example echo_device -- device.toml
//! ```

use std::time::Duration;

use clubby_client::{Client, ClientBuilder, ClientConfig, Command, Event, Response};
use serde_json::Value;
use tracing_subscriber::EnvFilter;

const RECONNECT_DELAY: Duration = Duration::from_secs(3);

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "device.toml".to_string());
    let config = ClientConfig::load(&path)?;
    tracing::info!("device {} -> {}", config.device_id, config.server_address);

    let mut client = ClientBuilder::from_config(config).start().await?;

    while let Some(event) = client.next_event().await {
        match event {
            Event::Connected => {
                let id = client.call(Command::new("/v1/Hello"))?;
                tracing::info!("connected, sent hello #{}", id);
            }
            Event::Request(request) => {
                let args: Option<Value> = request.args().unwrap_or(None);
                tracing::info!("{} from {} (#{})", request.cmd, request.src, request.id);
                let mut response = Response::ok(request.id);
                if let Some(args) = args {
                    response = response.with_resp(args);
                }
                client.respond(&request, response)?;
            }
            Event::Response(reply) => {
                tracing::info!("reply #{} status={}", reply.id, reply.status);
            }
            Event::NetConnect { success: false } | Event::Disconnected => {
                tracing::warn!("connection lost, retrying in {:?}", RECONNECT_DELAY);
                reconnect(&mut client).await;
            }
            Event::NetConnect { success: true } | Event::Frame(_) => {}
        }
    }
    Ok(())
}

async fn reconnect(client: &mut Client) {
    tokio::time::sleep(RECONNECT_DELAY).await;
    if let Err(e) = client.connect() {
        tracing::error!("reconnect failed: {}", e);
    }
}
