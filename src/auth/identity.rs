use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Opaque subscriber identity, stable across reconnects.
pub type SubscriberId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Police,
    Ambulance,
    Fire,
    Parent,
    Citizen,
    Admin,
}

impl Role {
    pub const ALL: [Role; 6] = [
        Role::Police,
        Role::Ambulance,
        Role::Fire,
        Role::Parent,
        Role::Citizen,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Police => "police",
            Role::Ambulance => "ambulance",
            Role::Fire => "fire",
            Role::Parent => "parent",
            Role::Citizen => "citizen",
            Role::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| format!("unknown role '{s}'"))
    }
}

/// What the verifier vouches for: who is connecting and in which role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub subscriber_id: SubscriberId,
    pub role: Role,
}

impl Identity {
    pub fn new(subscriber_id: impl Into<SubscriberId>, role: Role) -> Self {
        Self {
            subscriber_id: subscriber_id.into(),
            role,
        }
    }
}
