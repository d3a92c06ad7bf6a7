//! Fanout engine
//!
//! The engine is the only component that mutates subscriber and location
//! state. It owns the `GeoIndex`, the `PresenceRegistry` and the `Router`
//! and turns each inbound event into a list of deliveries:
//!
//! | Inbound | Emits |
//! |---|---|
//! | `connect` | `presence.online` to broadcast + role room, first connection only |
//! | `location_update` | `location.updated` to broadcast, role room and nearby subscribers; `responder.nearby` to nearby non-responders when a responder moves |
//! | `subscribe_topic` | nothing |
//! | `emergency_alert` | `emergency.alert` to each responder in range, point to point |
//! | `disconnect` | `presence.offline` to broadcast + role room, last connection only |
//!
//! Concurrency notes:
//! - The API is synchronous and designed to be held behind a lock by the
//!   transport. One lock means every mutation is linearized and a proximity
//!   query never observes a half-applied update.
//! - Identity verification happens before `connect` is called and outside
//!   the lock.
//! - Disconnect is terminal for a connection: later events carrying its id
//!   fail with `NotFound` and change nothing.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use super::event::{Delivery, EmergencyAlert, LocationUpdate, OutboundEvent};
use crate::auth::{Identity, Role, SubscriberId};
use crate::config::FanoutSettings;
use crate::geo::{GeoIndex, LocationRecord, Status, validate_coordinates};
use crate::presence::{ConnectionId, PresenceRegistry};
use crate::router::{Router, Topic};
use crate::utils::FanoutError;

/// A subscriber whose last connection dropped inside the grace period.
#[derive(Debug, Clone)]
struct PendingOffline {
    role: Role,
    deadline: DateTime<Utc>,
}

#[derive(Debug)]
pub struct FanoutEngine {
    settings: FanoutSettings,
    geo: GeoIndex,
    presence: PresenceRegistry,
    router: Router,
    pending_offline: HashMap<SubscriberId, PendingOffline>,
}

impl Default for FanoutEngine {
    fn default() -> Self {
        Self::new(FanoutSettings::default())
    }
}

impl FanoutEngine {
    pub fn new(settings: FanoutSettings) -> Self {
        Self {
            settings,
            geo: GeoIndex::new(),
            presence: PresenceRegistry::new(),
            router: Router::new(),
            pending_offline: HashMap::new(),
        }
    }

    pub fn settings(&self) -> &FanoutSettings {
        &self.settings
    }

    pub fn geo(&self) -> &GeoIndex {
        &self.geo
    }

    pub fn presence(&self) -> &PresenceRegistry {
        &self.presence
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    /// Attaches a verified identity to a transport connection and joins it
    /// to its `user:` and `role:` topics.
    pub fn connect(
        &mut self,
        connection_id: &str,
        identity: Identity,
    ) -> Result<Vec<Delivery>, FanoutError> {
        if connection_id.is_empty() {
            return Err(FanoutError::validation("connection id must not be empty"));
        }
        if identity.subscriber_id.is_empty() {
            return Err(FanoutError::validation("subscriber id must not be empty"));
        }

        let mut deliveries = Vec::new();

        // Re-authentication on a live connection.
        if let Some(current) = self.presence.subscriber_of(connection_id) {
            if current.id == identity.subscriber_id {
                let old_role = current.role;
                self.presence
                    .register_connection(&identity.subscriber_id, identity.role, connection_id);
                self.refresh_role(&identity.subscriber_id, old_role, identity.role);
                return Ok(deliveries);
            }
            deliveries = self.disconnect(connection_id);
        }

        let Identity {
            subscriber_id,
            role,
        } = identity;

        let pending = self.pending_offline.remove(&subscriber_id);
        let resumed = pending.is_some();
        let previous_role = self
            .presence
            .role_of(&subscriber_id)
            .or(pending.map(|p| p.role));

        let registration = self
            .presence
            .register_connection(&subscriber_id, role, connection_id);
        self.router
            .subscribe(connection_id, Topic::user(subscriber_id.clone()));
        self.router.subscribe(connection_id, Topic::Role(role));
        if let Some(old_role) = previous_role {
            self.refresh_role(&subscriber_id, old_role, role);
        }

        if registration.went_online && !resumed {
            info!("{subscriber_id} ({role}) is online via {connection_id}");
            let event = OutboundEvent::PresenceOnline {
                subscriber_id: subscriber_id.clone(),
                role,
            };
            let targets = self.audience(&[Topic::Broadcast, Topic::Role(role)], &subscriber_id);
            deliveries.extend(fan(targets, event));
        } else if resumed {
            info!("{subscriber_id} resumed within grace period via {connection_id}");
        } else {
            debug!("{subscriber_id} added connection {connection_id}");
        }

        Ok(deliveries)
    }

    pub fn location_update(
        &mut self,
        connection_id: &str,
        update: LocationUpdate,
    ) -> Result<Vec<Delivery>, FanoutError> {
        self.location_update_at(connection_id, update, Utc::now())
    }

    /// `location_update` with an explicit clock, used for both the default
    /// timestamp and the freshness cutoff.
    pub fn location_update_at(
        &mut self,
        connection_id: &str,
        update: LocationUpdate,
        now: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, FanoutError> {
        validate_coordinates(update.lat, update.lng)?;
        let (subscriber_id, role) = self.identity_of(connection_id)?;

        // A client clock ahead of ours must not pin the record in the future.
        let timestamp = update.timestamp.map_or(now, |ts| ts.min(now));
        let applied = self.geo.upsert(
            &subscriber_id,
            role,
            update.lat,
            update.lng,
            update.status,
            timestamp,
        );
        if !applied {
            debug!("Ignored stale location update from {subscriber_id} at {timestamp}");
            return Ok(Vec::new());
        }

        let mut targets = self.router.resolve_all(
            [&Topic::Broadcast, &Topic::Role(role)],
            &self.presence,
        );
        let mut nearby_events = Vec::new();

        if self.settings.is_responder(role) && update.status != Status::Offline {
            let nearby = self.geo.query_nearby_at(
                update.lat,
                update.lng,
                self.settings.notify_radius_meters,
                self.settings.freshness_window(),
                now,
            );

            for (record, distance) in nearby {
                if record.subscriber_id == subscriber_id {
                    continue;
                }
                let user = Topic::user(record.subscriber_id.clone());
                let connections = self.router.resolve(&user, &self.presence);
                targets.extend(connections.iter().cloned());

                if !self.settings.is_responder(record.role) {
                    let event = OutboundEvent::ResponderNearby {
                        subscriber_id: subscriber_id.clone(),
                        role,
                        distance_meters: distance,
                    };
                    nearby_events.extend(fan(connections, event));
                }
            }
        }

        for own in self.presence.connections_of(&subscriber_id) {
            targets.remove(&own);
        }

        let event = OutboundEvent::LocationUpdated {
            subscriber_id: subscriber_id.clone(),
            role,
            lat: update.lat,
            lng: update.lng,
            status: update.status,
        };

        debug!(
            "{subscriber_id} moved: {} location deliveries, {} nearby notices",
            targets.len(),
            nearby_events.len()
        );

        let mut deliveries = fan(targets, event);
        deliveries.extend(nearby_events);
        Ok(deliveries)
    }

    pub fn subscribe_topic(&mut self, connection_id: &str, topic: Topic) -> Result<(), FanoutError> {
        let (subscriber_id, _) = self.identity_of(connection_id)?;

        if let Topic::User(id) = &topic {
            if *id != subscriber_id {
                return Err(FanoutError::validation(format!(
                    "cannot subscribe to another subscriber's channel '{topic}'"
                )));
            }
            // already implied by presence
            return Ok(());
        }

        info!("{connection_id} subscribed to {topic}");
        self.router.subscribe(connection_id, topic);
        Ok(())
    }

    pub fn unsubscribe_topic(
        &mut self,
        connection_id: &str,
        topic: &Topic,
    ) -> Result<(), FanoutError> {
        self.identity_of(connection_id)?;
        self.router.unsubscribe(connection_id, topic);
        info!("{connection_id} unsubscribed from {topic}");
        Ok(())
    }

    pub fn emergency_alert(
        &mut self,
        connection_id: &str,
        alert: EmergencyAlert,
    ) -> Result<Vec<Delivery>, FanoutError> {
        let (subscriber_id, _) = self.identity_of(connection_id)?;
        self.raise_alert_at(&subscriber_id, alert, Utc::now())
    }

    /// Sends `emergency.alert` to every responder within the alert radius,
    /// one `user:` topic at a time.
    pub fn raise_alert_at(
        &mut self,
        subscriber_id: &str,
        alert: EmergencyAlert,
        now: DateTime<Utc>,
    ) -> Result<Vec<Delivery>, FanoutError> {
        validate_alert(&alert)?;
        if !self.is_online(subscriber_id) {
            return Err(FanoutError::not_found(format!("subscriber {subscriber_id}")));
        }

        let responders: Vec<(LocationRecord, f64)> = self
            .geo
            .query_nearby_at(
                alert.lat,
                alert.lng,
                self.settings.alert_radius_meters,
                self.settings.freshness_window(),
                now,
            )
            .into_iter()
            .filter(|(record, _)| {
                record.subscriber_id != subscriber_id && self.settings.is_responder(record.role)
            })
            .collect();

        let mut deliveries = Vec::new();
        for (record, distance) in &responders {
            let event = OutboundEvent::EmergencyAlert {
                subscriber_id: subscriber_id.to_string(),
                lat: alert.lat,
                lng: alert.lng,
                alert_type: alert.alert_type.clone(),
                distance_meters: *distance,
            };
            let connections = self
                .router
                .resolve(&Topic::user(record.subscriber_id.clone()), &self.presence);
            deliveries.extend(fan(connections, event));
        }

        info!(
            "{subscriber_id} raised '{}' alert: {} responders in range",
            alert.alert_type,
            responders.len()
        );
        Ok(deliveries)
    }

    /// Detaches a connection. Idempotent: unknown connections produce no
    /// deliveries.
    pub fn disconnect(&mut self, connection_id: &str) -> Vec<Delivery> {
        self.disconnect_at(connection_id, Utc::now())
    }

    pub fn disconnect_at(&mut self, connection_id: &str, now: DateTime<Utc>) -> Vec<Delivery> {
        self.router.unsubscribe_all(connection_id);

        let Some(departure) = self.presence.remove_connection(connection_id) else {
            debug!("Disconnect for unknown connection {connection_id}");
            return Vec::new();
        };

        if !departure.went_offline {
            debug!(
                "{} dropped {connection_id}, still online",
                departure.subscriber_id
            );
            return Vec::new();
        }

        let grace = self.settings.offline_grace();
        if grace > chrono::Duration::zero() {
            let deadline = now
                .checked_add_signed(grace)
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            debug!(
                "{} entering grace period until {deadline}",
                departure.subscriber_id
            );
            self.pending_offline.insert(
                departure.subscriber_id,
                PendingOffline {
                    role: departure.role,
                    deadline,
                },
            );
            return Vec::new();
        }

        self.go_offline(&departure.subscriber_id, departure.role)
    }

    /// Finalizes subscribers whose grace period ended at or before `now`.
    pub fn expire_grace(&mut self, now: DateTime<Utc>) -> Vec<Delivery> {
        let expired: BTreeMap<SubscriberId, Role> = self
            .pending_offline
            .iter()
            .filter(|(_, pending)| pending.deadline <= now)
            .map(|(id, pending)| (id.clone(), pending.role))
            .collect();

        let mut deliveries = Vec::new();
        for (subscriber_id, role) in expired {
            self.pending_offline.remove(&subscriber_id);
            info!("Grace period for {subscriber_id} expired");
            deliveries.extend(self.go_offline(&subscriber_id, role));
        }
        deliveries
    }

    /// Online, or offline but still inside the grace period.
    pub fn is_online(&self, subscriber_id: &str) -> bool {
        self.presence.is_online(subscriber_id) || self.pending_offline.contains_key(subscriber_id)
    }

    pub fn location_of(&self, subscriber_id: &str) -> Option<&LocationRecord> {
        self.geo.get(subscriber_id)
    }

    pub fn active(&self, role: Option<Role>) -> Vec<LocationRecord> {
        self.geo
            .query_active(role, self.settings.freshness_window())
    }

    fn go_offline(&mut self, subscriber_id: &str, role: Role) -> Vec<Delivery> {
        self.geo.mark_offline(subscriber_id);
        info!("{subscriber_id} ({role}) is offline");

        let event = OutboundEvent::PresenceOffline {
            subscriber_id: subscriber_id.to_string(),
        };
        let targets = self.audience(&[Topic::Broadcast, Topic::Role(role)], subscriber_id);
        fan(targets, event)
    }

    /// Moves every connection of the subscriber from the old role room to
    /// the new one and rewrites the role on its stored location.
    fn refresh_role(&mut self, subscriber_id: &str, old_role: Role, new_role: Role) {
        if old_role == new_role {
            return;
        }
        for connection_id in self.presence.connections_of(subscriber_id) {
            self.router
                .unsubscribe(&connection_id, &Topic::Role(old_role));
            self.router
                .subscribe(&connection_id, Topic::Role(new_role));
        }
        self.geo.set_role(subscriber_id, new_role);
        info!("{subscriber_id} changed role from {old_role} to {new_role}");
    }

    fn identity_of(&self, connection_id: &str) -> Result<(SubscriberId, Role), FanoutError> {
        self.presence
            .subscriber_of(connection_id)
            .map(|s| (s.id.clone(), s.role))
            .ok_or_else(|| FanoutError::not_found(format!("connection {connection_id}")))
    }

    /// Connections subscribed to any of `topics`, minus the subject's own.
    fn audience(&self, topics: &[Topic], subject: &str) -> BTreeSet<ConnectionId> {
        let mut targets = self.router.resolve_all(topics, &self.presence);
        for own in self.presence.connections_of(subject) {
            targets.remove(&own);
        }
        targets
    }
}

fn validate_alert(alert: &EmergencyAlert) -> Result<(), FanoutError> {
    validate_coordinates(alert.lat, alert.lng)?;
    if alert.alert_type.trim().is_empty() {
        return Err(FanoutError::validation("alert type is required"));
    }
    Ok(())
}

fn fan(targets: BTreeSet<ConnectionId>, event: OutboundEvent) -> Vec<Delivery> {
    targets
        .into_iter()
        .map(|connection_id| Delivery {
            connection_id,
            event: event.clone(),
        })
        .collect()
}
