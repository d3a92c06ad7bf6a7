//! CLI for GeoPulse
//!
//! Subcommands:
//! - `server`: run the WebSocket server
//! - `client`: run a simple client (useful for smoke tests)

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use geopulse::auth::{IdentityVerifier, JwtVerifier};
use geopulse::config::{Settings, load_config};
use geopulse::transport::{Hub, start_websocket_server};
use geopulse::utils::logging;
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "geopulse")]
enum Command {
    /// Start the WebSocket server
    Server,
    /// Run the smoke-test client (auth, subscribe, one location update)
    Client {
        /// WebSocket server URL to connect to
        #[arg(long, default_value = "ws://127.0.0.1:8080")]
        url: String,
        /// Bearer token presented in the `auth` frame
        #[arg(long)]
        token: String,
        #[arg(long, default_value_t = 12.97)]
        lat: f64,
        #[arg(long, default_value_t = 77.59)]
        lng: f64,
    },
}

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cmd = Command::parse();

    match cmd {
        Command::Server => {
            let config = match load_config() {
                Ok(config) => config,
                Err(e) => {
                    logging::init("error");
                    error!("Invalid configuration: {}", e);
                    return;
                }
            };
            logging::init(&config.server.log_level);
            if let Err(e) = run_server(config).await {
                error!("Server failed: {}", e);
            }
        }
        Command::Client {
            url,
            token,
            lat,
            lng,
        } => {
            logging::init("info");
            if let Err(e) = run_client(&url, &token, lat, lng).await {
                error!("Client failed: {}", e);
            }
        }
    }
}

async fn run_server(config: Settings) -> Result<(), Box<dyn std::error::Error>> {
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let hub = Hub::shared(config.fanout.clone());
    let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwtVerifier::new(&config.server.jwt_secret));
    let auth_timeout = Duration::from_millis(config.server.auth_timeout_ms);

    if config.fanout.offline_grace_secs > 0 {
        let interval = Duration::from_millis(config.fanout.grace_sweep_interval_ms);
        tokio::spawn(Hub::start_grace_loop(hub.clone(), interval));
    }

    tokio::select! {
        result = start_websocket_server(addr, hub, verifier, auth_timeout) => {
            result?;
            error!("WebSocket server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    Ok(())
}

async fn run_client(
    url: &str,
    token: &str,
    lat: f64,
    lng: f64,
) -> Result<(), Box<dyn std::error::Error>> {
    use futures_util::{SinkExt, StreamExt};
    use serde_json::json;
    use tokio_tungstenite::connect_async;
    use tokio_tungstenite::tungstenite::Message as WsMessage;

    let (mut ws_stream, _response) = connect_async(url).await?;

    // 1. Auth
    let auth = json!({ "type": "auth", "token": token });
    ws_stream
        .send(WsMessage::Text(auth.to_string().into()))
        .await?;
    if let Some(Ok(WsMessage::Text(msg))) = ws_stream.next().await {
        println!("Auth response: {msg}");
        let v: serde_json::Value = serde_json::from_str(&msg)?;
        if v.get("type").and_then(|t| t.as_str()) != Some("authenticated") {
            return Err("authentication rejected".into());
        }
    }

    // 2. Subscribe to broadcast
    let subscribe = json!({ "type": "subscribe", "topic": "broadcast" });
    ws_stream
        .send(WsMessage::Text(subscribe.to_string().into()))
        .await?;

    // 3. Report a position
    let update = json!({ "type": "location_update", "lat": lat, "lng": lng, "status": "available" });
    ws_stream
        .send(WsMessage::Text(update.to_string().into()))
        .await?;

    // Print everything until the server or the user ends the session
    loop {
        tokio::select! {
            frame = ws_stream.next() => match frame {
                Some(Ok(WsMessage::Text(incoming))) => println!("Incoming: {incoming}"),
                Some(Ok(WsMessage::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => return Err(e.into()),
            },
            _ = tokio::signal::ctrl_c() => {
                ws_stream.close(None).await?;
                break;
            }
        }
    }

    Ok(())
}
