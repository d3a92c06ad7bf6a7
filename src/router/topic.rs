//! Topics
//!
//! A `Topic` is a typed delivery channel. Role and broadcast topics need an
//! explicit subscription; `user:<id>` topics are derived from presence so a
//! message for a subscriber reaches every device it has connected.
//!
//! `TopicMembers` holds the connection ids that subscribed to one topic.
//! Duplicate subscriptions are a no-op.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::auth::{Role, SubscriberId};
use crate::presence::ConnectionId;
use crate::utils::FanoutError;

#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Topic {
    Role(Role),
    User(SubscriberId),
    #[default]
    Broadcast,
}

impl Topic {
    pub fn user(id: impl Into<SubscriberId>) -> Self {
        Topic::User(id.into())
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Topic::Role(role) => write!(f, "role:{role}"),
            Topic::User(id) => write!(f, "user:{id}"),
            Topic::Broadcast => f.write_str("broadcast"),
        }
    }
}

impl FromStr for Topic {
    type Err = FanoutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "broadcast" {
            return Ok(Topic::Broadcast);
        }

        match s.split_once(':') {
            Some(("role", role)) => role
                .parse::<Role>()
                .map(Topic::Role)
                .map_err(FanoutError::validation),
            Some(("user", id)) if !id.is_empty() => Ok(Topic::User(id.to_string())),
            Some(("user", _)) => Err(FanoutError::validation("user topic needs an id")),
            _ => Err(FanoutError::validation(format!("unknown topic kind '{s}'"))),
        }
    }
}

impl TryFrom<String> for Topic {
    type Error = FanoutError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Topic> for String {
    fn from(topic: Topic) -> Self {
        topic.to_string()
    }
}

#[derive(Debug, Default)]
pub struct TopicMembers {
    pub topic: Topic,
    pub connections: BTreeSet<ConnectionId>,
}

impl TopicMembers {
    pub fn new(topic: Topic) -> Self {
        Self {
            topic,
            connections: BTreeSet::new(),
        }
    }

    pub fn subscribe(&mut self, id: &str) {
        self.connections.insert(id.to_string());
    }

    pub fn unsubscribe(&mut self, id: &str) {
        self.connections.remove(id);
    }

    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }
}
