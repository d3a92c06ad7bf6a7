use chrono::Duration;
use serde::Deserialize;

use crate::auth::Role;

/// Upper bound accepted for `fanout.freshness_window_secs` (one week).
pub const MAX_FRESHNESS_WINDOW_SECS: u64 = 7 * 24 * 60 * 60;
/// Upper bound accepted for `fanout.offline_grace_secs` (one day).
pub const MAX_OFFLINE_GRACE_SECS: u64 = 24 * 60 * 60;

/// Top-level configuration settings for the service.
///
/// Includes settings for both the server and the fanout engine.
#[derive(Debug, Default, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub fanout: FanoutSettings,
}

/// Configuration settings for the server.
///
/// Defines the bind address, the token secret, the log level and how long
/// a fresh connection may stay unauthenticated.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub log_level: String,
    pub auth_timeout_ms: u64,
}

/// Configuration settings for the fanout engine.
#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct FanoutSettings {
    pub notify_radius_meters: f64,
    pub alert_radius_meters: f64,
    pub freshness_window_secs: u64,
    /// How long a subscriber whose last connection dropped stays online
    /// before `presence.offline` goes out. Zero disables the grace period.
    pub offline_grace_secs: u64,
    pub grace_sweep_interval_ms: u64,
    pub responder_roles: Vec<Role>,
}

impl FanoutSettings {
    /// Saturates at `Duration::MAX` for values chrono cannot represent.
    pub fn freshness_window(&self) -> Duration {
        seconds(self.freshness_window_secs)
    }

    pub fn offline_grace(&self) -> Duration {
        seconds(self.offline_grace_secs)
    }

    pub fn is_responder(&self, role: Role) -> bool {
        self.responder_roles.contains(&role)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Allows partial specification of settings. Missing values can be filled using defaults.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub fanout: Option<PartialFanoutSettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub jwt_secret: Option<String>,
    pub log_level: Option<String>,
    pub auth_timeout_ms: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct PartialFanoutSettings {
    pub notify_radius_meters: Option<f64>,
    pub alert_radius_meters: Option<f64>,
    pub freshness_window_secs: Option<u64>,
    pub offline_grace_secs: Option<u64>,
    pub grace_sweep_interval_ms: Option<u64>,
    pub responder_roles: Option<Vec<Role>>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            jwt_secret: "secret".to_string(),
            log_level: "info".to_string(),
            auth_timeout_ms: 10_000,
        }
    }
}

impl Default for FanoutSettings {
    fn default() -> Self {
        Self {
            notify_radius_meters: 5_000.0,
            alert_radius_meters: 10_000.0,
            freshness_window_secs: 300,
            offline_grace_secs: 0,
            grace_sweep_interval_ms: 1_000,
            responder_roles: vec![Role::Police, Role::Ambulance, Role::Fire],
        }
    }
}

fn seconds(secs: u64) -> Duration {
    i64::try_from(secs)
        .ok()
        .and_then(Duration::try_seconds)
        .unwrap_or(Duration::MAX)
}
