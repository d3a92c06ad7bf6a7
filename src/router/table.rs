//! Subscription table
//!
//! `Router` maps topics to subscribed connections, with a reverse index so
//! `unsubscribe_all` on disconnect does not scan every topic. It does not
//! check that a connection is registered; the engine enforces that before
//! calling in.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::topic::{Topic, TopicMembers};
use crate::presence::{ConnectionId, PresenceRegistry};

#[derive(Debug, Default)]
pub struct Router {
    topics: HashMap<Topic, TopicMembers>,
    by_connection: HashMap<ConnectionId, HashSet<Topic>>,
}

impl Router {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&mut self, connection_id: &str, topic: Topic) {
        self.topics
            .entry(topic.clone())
            .or_insert_with(|| TopicMembers::new(topic.clone()))
            .subscribe(connection_id);
        self.by_connection
            .entry(connection_id.to_string())
            .or_default()
            .insert(topic);
    }

    /// No-op if the connection was not subscribed.
    pub fn unsubscribe(&mut self, connection_id: &str, topic: &Topic) {
        if let Some(members) = self.topics.get_mut(topic) {
            members.unsubscribe(connection_id);
            if members.is_empty() {
                self.topics.remove(topic);
            }
        }
        if let Some(topics) = self.by_connection.get_mut(connection_id) {
            topics.remove(topic);
            if topics.is_empty() {
                self.by_connection.remove(connection_id);
            }
        }
    }

    pub fn unsubscribe_all(&mut self, connection_id: &str) {
        let Some(topics) = self.by_connection.remove(connection_id) else {
            return;
        };
        for topic in topics {
            if let Some(members) = self.topics.get_mut(&topic) {
                members.unsubscribe(connection_id);
                if members.is_empty() {
                    self.topics.remove(&topic);
                }
            }
            debug!("Unsubscribed {connection_id} from {topic}");
        }
    }

    /// Connections an event on `topic` reaches. `user:<id>` resolves to every
    /// connection the subscriber currently holds, subscription or not.
    pub fn resolve(&self, topic: &Topic, presence: &PresenceRegistry) -> BTreeSet<ConnectionId> {
        match topic {
            Topic::User(id) => presence.connections_of(id),
            _ => self
                .topics
                .get(topic)
                .map(|members| members.connections.clone())
                .unwrap_or_default(),
        }
    }

    /// Union of `resolve` over several topics, without duplicates.
    pub fn resolve_all<'a>(
        &self,
        topics: impl IntoIterator<Item = &'a Topic>,
        presence: &PresenceRegistry,
    ) -> BTreeSet<ConnectionId> {
        topics
            .into_iter()
            .flat_map(|topic| self.resolve(topic, presence))
            .collect()
    }

    pub fn topics_of(&self, connection_id: &str) -> HashSet<Topic> {
        self.by_connection
            .get(connection_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn is_subscribed(&self, connection_id: &str, topic: &Topic) -> bool {
        self.topics
            .get(topic)
            .is_some_and(|members| members.connections.contains(connection_id))
    }
}
