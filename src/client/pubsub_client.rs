use std::collections::HashMap;

use tokio::sync::mpsc::UnboundedSender;
use tracing::debug;
use tungstenite::protocol::Message as WsMessage;
use uuid::Uuid;

use crate::auth::Identity;
use crate::presence::ConnectionId;

/// Represents a connected WebSocket client.
///
/// Each client is uniquely identified by an `id` and has a channel (`sender`)
/// for sending messages to the client over WebSocket.
#[derive(Debug)]
pub struct Client {
    /// Connection id handed to the engine. Never reused.
    pub id: ConnectionId,

    /// Channel to send WebSocket messages to the client.
    pub sender: UnboundedSender<WsMessage>,

    /// Set once the `auth` frame was verified.
    pub identity: Option<Identity>,
}

impl Client {
    pub fn new(sender: UnboundedSender<WsMessage>) -> Self {
        Self {
            id: format!("conn-{}", Uuid::new_v4()),
            sender,
            identity: None,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.identity.is_some()
    }

    /// Best effort: a closed channel means the connection is already gone.
    pub fn send(&self, msg: WsMessage) -> bool {
        match self.sender.send(msg) {
            Ok(()) => true,
            Err(e) => {
                debug!("Dropped frame for {}: {e}", self.id);
                false
            }
        }
    }
}

#[derive(Debug, Default)]
pub struct ClientTable {
    clients: HashMap<ConnectionId, Client>,
}

impl ClientTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, client: Client) {
        self.clients.insert(client.id.clone(), client);
    }

    pub fn remove(&mut self, id: &str) -> Option<Client> {
        self.clients.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&Client> {
        self.clients.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Client> {
        self.clients.get_mut(id)
    }

    /// Returns `false` when the target is unknown or its channel is closed.
    pub fn send(&self, id: &str, msg: WsMessage) -> bool {
        match self.clients.get(id) {
            Some(client) => client.send(msg),
            None => {
                debug!("No client registered with id: {id}");
                false
            }
        }
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }
}
