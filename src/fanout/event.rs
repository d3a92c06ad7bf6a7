//! Event definitions for the engine
//!
//! Inbound commands carry what a client sends; `OutboundEvent` is what the
//! engine fans out. Outbound events serialize with the dotted event names
//! (`presence.online`, `emergency.alert`, ...) and camelCase fields.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Role, SubscriberId};
use crate::geo::Status;
use crate::presence::ConnectionId;

#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub lat: f64,
    pub lng: f64,
    pub status: Status,
    /// Client-side capture time. `None` means "now".
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmergencyAlert {
    pub lat: f64,
    pub lng: f64,
    pub alert_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event")]
pub enum OutboundEvent {
    #[serde(rename = "presence.online", rename_all = "camelCase")]
    PresenceOnline {
        subscriber_id: SubscriberId,
        role: Role,
    },

    #[serde(rename = "presence.offline", rename_all = "camelCase")]
    PresenceOffline { subscriber_id: SubscriberId },

    #[serde(rename = "location.updated", rename_all = "camelCase")]
    LocationUpdated {
        subscriber_id: SubscriberId,
        role: Role,
        lat: f64,
        lng: f64,
        status: Status,
    },

    #[serde(rename = "responder.nearby", rename_all = "camelCase")]
    ResponderNearby {
        subscriber_id: SubscriberId,
        role: Role,
        distance_meters: f64,
    },

    #[serde(rename = "emergency.alert", rename_all = "camelCase")]
    EmergencyAlert {
        subscriber_id: SubscriberId,
        lat: f64,
        lng: f64,
        #[serde(rename = "type")]
        alert_type: String,
        distance_meters: f64,
    },
}

impl OutboundEvent {
    pub fn name(&self) -> &'static str {
        match self {
            OutboundEvent::PresenceOnline { .. } => "presence.online",
            OutboundEvent::PresenceOffline { .. } => "presence.offline",
            OutboundEvent::LocationUpdated { .. } => "location.updated",
            OutboundEvent::ResponderNearby { .. } => "responder.nearby",
            OutboundEvent::EmergencyAlert { .. } => "emergency.alert",
        }
    }
}

/// One event addressed to one connection.
#[derive(Debug, Clone, PartialEq)]
pub struct Delivery {
    pub connection_id: ConnectionId,
    pub event: OutboundEvent,
}
