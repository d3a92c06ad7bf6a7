//! WebSocket transport
//!
//! This file implements the WebSocket server that translates protocol JSON
//! frames into hub operations. Responsibilities:
//! - Accept TCP/WebSocket connections
//! - Create a `Client` for each connection and attach it to the `Hub`
//! - Enforce auth-first ordering: the first accepted frame must be `auth`
//! - Verify credentials through the `IdentityVerifier` without holding the
//!   hub lock, so a slow verifier never stalls other connections
//! - Close connections that do not authenticate within the configured timeout
//! - Detach the connection exactly once when either half of the socket
//!   closes, including when a handler panics

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::spawn;
use tokio::sync::mpsc;
use tokio::time::{Instant, timeout_at};
use tokio_tungstenite::accept_async;
use tracing::{debug, info, warn};
use tungstenite::protocol::Message as WsMessage;

use super::hub::{Hub, SharedHub};
use super::message::{ClientMessage, ServerMessage};
use crate::auth::IdentityVerifier;
use crate::client::Client;
use crate::utils::FanoutError;

pub async fn start_websocket_server(
    addr: String,
    hub: SharedHub,
    verifier: Arc<dyn IdentityVerifier>,
    auth_timeout: Duration,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(&addr).await?;
    info!("WebSocket server listening on ws://{addr}");
    serve(listener, hub, verifier, auth_timeout).await
}

/// Accept loop over an already bound listener. A connection that has not
/// authenticated within `auth_timeout` is closed.
pub async fn serve(
    listener: TcpListener,
    hub: SharedHub,
    verifier: Arc<dyn IdentityVerifier>,
    auth_timeout: Duration,
) -> std::io::Result<()> {
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!("Accepted TCP connection from {peer}");
                spawn(handle_connection(
                    stream,
                    hub.clone(),
                    verifier.clone(),
                    auth_timeout,
                ));
            }
            Err(e) => warn!("Failed to accept connection: {e}"),
        }
    }
}

/// Detaches the connection from the hub exactly once, whichever half of the
/// socket finishes first. Also runs when a handler unwinds.
#[derive(Clone)]
struct Cleanup {
    hub: SharedHub,
    client_id: String,
    called: Arc<AtomicBool>,
}

impl Cleanup {
    fn run(&self) {
        if !self.called.swap(true, Ordering::SeqCst) {
            Hub::lock(&self.hub).detach(&self.client_id);
        }
    }
}

impl Drop for Cleanup {
    fn drop(&mut self) {
        self.run();
    }
}

async fn handle_connection(
    stream: TcpStream,
    hub: SharedHub,
    verifier: Arc<dyn IdentityVerifier>,
    auth_timeout: Duration,
) {
    let ws_stream = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake error: {e}");
            return;
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<WsMessage>();
    let client = Client::new(tx);
    let client_id = client.id.clone();
    Hub::lock(&hub).attach(client);

    let cleanup = Cleanup {
        hub: hub.clone(),
        client_id: client_id.clone(),
        called: Arc::new(AtomicBool::new(false)),
    };

    {
        let client_id = client_id.clone();
        let cleanup = cleanup.clone();

        spawn(async move {
            while let Some(msg) = rx.recv().await {
                if let Err(e) = ws_sender.send(msg).await {
                    debug!("Failed to send message to {client_id}: {e}");
                    break;
                }
            }

            cleanup.run();
            let _ = ws_sender.close().await;
            debug!("Send loop closed for {client_id}");
        });
    }

    let auth_deadline = Instant::now() + auth_timeout;
    let mut authenticated = false;

    loop {
        let next = if authenticated {
            ws_receiver.next().await
        } else {
            match timeout_at(auth_deadline, ws_receiver.next()).await {
                Ok(next) => next,
                Err(_) => {
                    warn!("{client_id} did not authenticate within {auth_timeout:?}");
                    Hub::lock(&hub).reply(
                        &client_id,
                        &ServerMessage::error("auth", "authentication timed out"),
                    );
                    break;
                }
            }
        };
        let Some(Ok(msg)) = next else {
            break;
        };

        if msg.is_close() {
            break;
        }
        if !msg.is_text() {
            continue;
        }
        let Ok(text) = msg.to_text() else {
            continue;
        };

        let parsed = match serde_json::from_str::<ClientMessage>(text) {
            Ok(parsed) => parsed,
            Err(err) => {
                let preview: String = text.chars().take(100).collect();
                warn!("Invalid client message from {client_id}: {err} | {preview}");
                Hub::lock(&hub).report(
                    &client_id,
                    &FanoutError::validation(format!("malformed message: {err}")),
                );
                continue;
            }
        };

        match parsed {
            ClientMessage::Auth { token } => {
                // verified off-lock
                match verifier.verify(&token).await {
                    Ok(identity) => {
                        let mut state = Hub::lock(&hub);
                        match state.authenticate(&client_id, identity) {
                            Ok(()) => authenticated = true,
                            Err(err) => state.report(&client_id, &err),
                        }
                    }
                    Err(err) => {
                        warn!("{client_id} authentication failed: {err}");
                        Hub::lock(&hub).reply(
                            &client_id,
                            &ServerMessage::error("auth", "authentication failed"),
                        );
                        break;
                    }
                }
            }
            other => {
                let mut state = Hub::lock(&hub);
                if !state.is_authenticated(&client_id) {
                    warn!("Client {client_id} sent message before authentication");
                    state.reply(
                        &client_id,
                        &ServerMessage::error("auth", "must authenticate first"),
                    );
                    break;
                }
                if let Err(err) = state.handle(&client_id, other) {
                    state.report(&client_id, &err);
                }
            }
        }
    }

    cleanup.run();
}
