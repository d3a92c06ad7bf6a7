//! Hub
//!
//! `Hub` pairs the `FanoutEngine` with the `ClientTable` so engine output
//! can be turned into frames on the right channels. The transport holds it
//! as `Arc<Mutex<Hub>>`; callers must not hold the lock across an `.await`.
//!
//! Delivery is at-most-once: a frame for a connection that is already gone
//! is dropped and never retried.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use tracing::{debug, info, warn};

use super::message::{ClientMessage, ServerMessage};
use crate::auth::Identity;
use crate::client::{Client, ClientTable};
use crate::config::FanoutSettings;
use crate::fanout::{Delivery, FanoutEngine};
use crate::router::Topic;
use crate::utils::FanoutError;

pub type SharedHub = Arc<Mutex<Hub>>;

#[derive(Debug, Default)]
pub struct Hub {
    engine: FanoutEngine,
    clients: ClientTable,
}

impl Hub {
    pub fn new(settings: FanoutSettings) -> Self {
        Self {
            engine: FanoutEngine::new(settings),
            clients: ClientTable::new(),
        }
    }

    pub fn shared(settings: FanoutSettings) -> SharedHub {
        Arc::new(Mutex::new(Self::new(settings)))
    }

    /// Locks the hub. A panic in another event's handling leaves the state
    /// consistent at event granularity, so poisoning is ignored.
    pub fn lock(hub: &SharedHub) -> MutexGuard<'_, Hub> {
        hub.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn engine(&self) -> &FanoutEngine {
        &self.engine
    }

    pub fn clients(&self) -> &ClientTable {
        &self.clients
    }

    /// Registers a freshly accepted connection. It stays unauthenticated
    /// until `authenticate` succeeds.
    pub fn attach(&mut self, client: Client) {
        debug!("Attached connection {}", client.id);
        self.clients.register(client);
    }

    pub fn authenticate(&mut self, connection_id: &str, identity: Identity) -> Result<(), FanoutError> {
        if self.clients.get(connection_id).is_none() {
            return Err(FanoutError::not_found(format!("connection {connection_id}")));
        }

        let deliveries = self.engine.connect(connection_id, identity.clone())?;
        if let Some(client) = self.clients.get_mut(connection_id) {
            client.identity = Some(identity.clone());
        }
        self.deliver(deliveries);

        info!(
            "{connection_id} authenticated as {} ({})",
            identity.subscriber_id, identity.role
        );
        self.reply(
            connection_id,
            &ServerMessage::Authenticated {
                subscriber_id: identity.subscriber_id,
                role: identity.role,
            },
        );
        Ok(())
    }

    pub fn is_authenticated(&self, connection_id: &str) -> bool {
        self.clients
            .get(connection_id)
            .is_some_and(Client::is_authenticated)
    }

    /// Applies one inbound frame from an authenticated connection and acks
    /// it. `auth` frames are handled by the transport, which has to verify
    /// the credential without holding the lock.
    pub fn handle(&mut self, connection_id: &str, msg: ClientMessage) -> Result<(), FanoutError> {
        let action = msg.action();

        let deliveries = match &msg {
            ClientMessage::Auth { .. } => {
                return Err(FanoutError::internal("auth frames are verified by the transport"));
            }
            ClientMessage::LocationUpdate { .. } => {
                let update = msg
                    .location_update()
                    .ok_or_else(|| FanoutError::internal("location update payload missing"))?;
                self.engine.location_update(connection_id, update)?
            }
            ClientMessage::Subscribe { topic } => {
                let topic: Topic = topic.parse()?;
                self.engine.subscribe_topic(connection_id, topic)?;
                Vec::new()
            }
            ClientMessage::Unsubscribe { topic } => {
                let topic: Topic = topic.parse()?;
                self.engine.unsubscribe_topic(connection_id, &topic)?;
                Vec::new()
            }
            ClientMessage::EmergencyAlert { .. } => {
                let alert = msg
                    .emergency_alert()
                    .ok_or_else(|| FanoutError::internal("alert payload missing"))?;
                self.engine.emergency_alert(connection_id, alert)?
            }
        };

        self.deliver(deliveries);
        self.reply(
            connection_id,
            &ServerMessage::Ack {
                action: action.to_string(),
            },
        );
        Ok(())
    }

    /// Reports a rejected frame to its originator only. Disconnect races are
    /// logged and swallowed.
    pub fn report(&self, connection_id: &str, err: &FanoutError) {
        if err.is_benign() {
            debug!("Ignoring event from {connection_id}: {err}");
            return;
        }
        match err {
            FanoutError::Internal { .. } => tracing::error!("Event from {connection_id} failed: {err}"),
            _ => warn!("Rejected event from {connection_id}: {err}"),
        }
        self.reply(connection_id, &ServerMessage::from(err));
    }

    /// Removes the connection from the engine and the directory. Safe to
    /// call more than once.
    pub fn detach(&mut self, connection_id: &str) {
        let deliveries = self.engine.disconnect(connection_id);
        self.deliver(deliveries);
        if self.clients.remove(connection_id).is_some() {
            info!("{connection_id} disconnected");
        }
    }

    pub fn expire_grace(&mut self, now: DateTime<Utc>) -> usize {
        let deliveries = self.engine.expire_grace(now);
        self.deliver(deliveries)
    }

    /// Pushes engine output to the target channels. Returns how many frames
    /// were handed to a live channel.
    pub fn deliver(&self, deliveries: Vec<Delivery>) -> usize {
        let mut delivered = 0;
        for Delivery {
            connection_id,
            event,
        } in deliveries
        {
            let name = event.name();
            match ServerMessage::Event(event).to_ws() {
                Ok(frame) => {
                    if self.clients.send(&connection_id, frame) {
                        delivered += 1;
                    }
                }
                Err(e) => tracing::error!("Failed to serialize {name} for {connection_id}: {e}"),
            }
        }
        delivered
    }

    pub fn reply(&self, connection_id: &str, msg: &ServerMessage) {
        match msg.to_ws() {
            Ok(frame) => {
                self.clients.send(connection_id, frame);
            }
            Err(e) => tracing::error!("Failed to serialize reply for {connection_id}: {e}"),
        }
    }

    /// Periodically finalizes subscribers whose offline grace period ended.
    /// Designed to run as a background task.
    pub async fn start_grace_loop(hub: SharedHub, interval: std::time::Duration) {
        loop {
            tokio::time::sleep(interval).await;

            let delivered = Hub::lock(&hub).expire_grace(Utc::now());
            if delivered > 0 {
                debug!("Grace sweep delivered {delivered} offline notices");
            }
        }
    }
}
