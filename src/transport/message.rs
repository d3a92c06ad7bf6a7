use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tungstenite::protocol::Message as WsMessage;

use crate::auth::{Role, SubscriberId};
use crate::fanout::{EmergencyAlert, LocationUpdate, OutboundEvent};
use crate::geo::Status;
use crate::utils::FanoutError;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ClientMessage {
    #[serde(rename = "auth")]
    Auth { token: String },

    #[serde(rename = "location_update")]
    LocationUpdate {
        lat: f64,
        lng: f64,
        status: Status,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        timestamp: Option<DateTime<Utc>>,
    },

    #[serde(rename = "subscribe")]
    Subscribe { topic: String },

    #[serde(rename = "unsubscribe")]
    Unsubscribe { topic: String },

    #[serde(rename = "emergency_alert")]
    EmergencyAlert {
        lat: f64,
        lng: f64,
        alert_type: String,
    },
}

impl ClientMessage {
    /// Name echoed back in the `ack` frame.
    pub fn action(&self) -> &'static str {
        match self {
            ClientMessage::Auth { .. } => "auth",
            ClientMessage::LocationUpdate { .. } => "location_update",
            ClientMessage::Subscribe { .. } => "subscribe",
            ClientMessage::Unsubscribe { .. } => "unsubscribe",
            ClientMessage::EmergencyAlert { .. } => "emergency_alert",
        }
    }

    pub fn location_update(&self) -> Option<LocationUpdate> {
        match self {
            ClientMessage::LocationUpdate {
                lat,
                lng,
                status,
                timestamp,
            } => Some(LocationUpdate {
                lat: *lat,
                lng: *lng,
                status: *status,
                timestamp: *timestamp,
            }),
            _ => None,
        }
    }

    pub fn emergency_alert(&self) -> Option<EmergencyAlert> {
        match self {
            ClientMessage::EmergencyAlert {
                lat,
                lng,
                alert_type,
            } => Some(EmergencyAlert {
                lat: *lat,
                lng: *lng,
                alert_type: alert_type.clone(),
            }),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(tag = "type")]
pub enum ServerMessage {
    #[serde(rename = "authenticated")]
    Authenticated {
        subscriber_id: SubscriberId,
        role: Role,
    },
    #[serde(rename = "ack")]
    Ack { action: String },
    #[serde(rename = "error")]
    Error { kind: String, message: String },
    #[serde(rename = "event")]
    Event(OutboundEvent),
}

impl ServerMessage {
    pub fn error(kind: &str, message: impl Into<String>) -> Self {
        ServerMessage::Error {
            kind: kind.to_string(),
            message: message.into(),
        }
    }

    pub fn to_ws(&self) -> Result<WsMessage, FanoutError> {
        Ok(WsMessage::text(serde_json::to_string(self)?))
    }
}

impl From<&FanoutError> for ServerMessage {
    fn from(err: &FanoutError) -> Self {
        ServerMessage::error(err.kind(), err.to_string())
    }
}
