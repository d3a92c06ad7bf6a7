use std::collections::{BTreeSet, HashMap};

use crate::auth::{Role, SubscriberId};

/// Opaque transport connection handle.
pub type ConnectionId = String;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscriber {
    pub id: SubscriberId,
    pub role: Role,
    pub connections: BTreeSet<ConnectionId>,
}

/// Outcome of `register_connection`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Registration {
    /// First connection of a subscriber that was offline.
    pub went_online: bool,
}

/// Outcome of `remove_connection` for a known connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub subscriber_id: SubscriberId,
    pub role: Role,
    /// The removed connection was the subscriber's last one.
    pub went_offline: bool,
}

#[derive(Debug, Default)]
pub struct PresenceRegistry {
    subscribers: HashMap<SubscriberId, Subscriber>,
    by_connection: HashMap<ConnectionId, SubscriberId>,
}

impl PresenceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Idempotent add. A connection already owned by another subscriber is
    /// moved; callers that care about the old owner must remove it first.
    pub fn register_connection(
        &mut self,
        subscriber_id: &str,
        role: Role,
        connection_id: &str,
    ) -> Registration {
        let owned_by_other = self
            .by_connection
            .get(connection_id)
            .is_some_and(|owner| owner != subscriber_id);
        if owned_by_other {
            self.remove_connection(connection_id);
        }

        let subscriber = self
            .subscribers
            .entry(subscriber_id.to_string())
            .or_insert_with(|| Subscriber {
                id: subscriber_id.to_string(),
                role,
                connections: BTreeSet::new(),
            });

        subscriber.role = role;
        let went_online = subscriber.connections.is_empty();
        subscriber.connections.insert(connection_id.to_string());
        self.by_connection
            .insert(connection_id.to_string(), subscriber_id.to_string());

        Registration { went_online }
    }

    /// Removes the mapping. Unknown connections return `None`: disconnect
    /// races are expected.
    pub fn remove_connection(&mut self, connection_id: &str) -> Option<Departure> {
        let subscriber_id = self.by_connection.remove(connection_id)?;
        let subscriber = self.subscribers.get_mut(&subscriber_id)?;
        subscriber.connections.remove(connection_id);

        let role = subscriber.role;
        let went_offline = subscriber.connections.is_empty();
        if went_offline {
            self.subscribers.remove(&subscriber_id);
        }

        Some(Departure {
            subscriber_id,
            role,
            went_offline,
        })
    }

    pub fn connections_of(&self, subscriber_id: &str) -> BTreeSet<ConnectionId> {
        self.subscribers
            .get(subscriber_id)
            .map(|s| s.connections.clone())
            .unwrap_or_default()
    }

    pub fn subscriber_of(&self, connection_id: &str) -> Option<&Subscriber> {
        self.by_connection
            .get(connection_id)
            .and_then(|id| self.subscribers.get(id))
    }

    pub fn role_of(&self, subscriber_id: &str) -> Option<Role> {
        self.subscribers.get(subscriber_id).map(|s| s.role)
    }

    pub fn is_online(&self, subscriber_id: &str) -> bool {
        self.subscribers.contains_key(subscriber_id)
    }

    pub fn online_count(&self) -> usize {
        self.subscribers.len()
    }
}
