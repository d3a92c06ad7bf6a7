mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{
    FanoutSettings, MAX_FRESHNESS_WINDOW_SECS, MAX_OFFLINE_GRACE_SECS, ServerSettings, Settings,
};

/// Loads the configuration from the default file and environment variables
/// (`GEOPULSE__SERVER__PORT=9000`), merged over the default values.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("GEOPULSE")
                .prefix_separator("__")
                .separator("__")
                .list_separator(",")
                .with_list_parse_key("fanout.responder_roles")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;
    let default = Settings::default();

    let server = partial.server;
    let fanout = partial.fanout;

    let settings = Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            jwt_secret: server
                .as_ref()
                .and_then(|s| s.jwt_secret.clone())
                .unwrap_or(default.server.jwt_secret),
            log_level: server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
            auth_timeout_ms: server
                .as_ref()
                .and_then(|s| s.auth_timeout_ms)
                .unwrap_or(default.server.auth_timeout_ms),
        },
        fanout: FanoutSettings {
            notify_radius_meters: fanout
                .as_ref()
                .and_then(|f| f.notify_radius_meters)
                .unwrap_or(default.fanout.notify_radius_meters),
            alert_radius_meters: fanout
                .as_ref()
                .and_then(|f| f.alert_radius_meters)
                .unwrap_or(default.fanout.alert_radius_meters),
            freshness_window_secs: fanout
                .as_ref()
                .and_then(|f| f.freshness_window_secs)
                .unwrap_or(default.fanout.freshness_window_secs),
            offline_grace_secs: fanout
                .as_ref()
                .and_then(|f| f.offline_grace_secs)
                .unwrap_or(default.fanout.offline_grace_secs),
            grace_sweep_interval_ms: fanout
                .as_ref()
                .and_then(|f| f.grace_sweep_interval_ms)
                .unwrap_or(default.fanout.grace_sweep_interval_ms),
            responder_roles: fanout
                .as_ref()
                .and_then(|f| f.responder_roles.clone())
                .unwrap_or(default.fanout.responder_roles),
        },
    };

    settings.validate()?;
    Ok(settings)
}

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let fanout = &self.fanout;
        for (name, radius) in [
            ("notify_radius_meters", fanout.notify_radius_meters),
            ("alert_radius_meters", fanout.alert_radius_meters),
        ] {
            if !radius.is_finite() || radius <= 0.0 {
                return Err(ConfigError::Message(format!(
                    "fanout.{name} must be a positive number, got {radius}"
                )));
            }
        }
        if fanout.responder_roles.is_empty() {
            return Err(ConfigError::Message(
                "fanout.responder_roles must not be empty".to_string(),
            ));
        }
        if fanout.freshness_window_secs > MAX_FRESHNESS_WINDOW_SECS {
            return Err(ConfigError::Message(format!(
                "fanout.freshness_window_secs must be at most {MAX_FRESHNESS_WINDOW_SECS}, got {}",
                fanout.freshness_window_secs
            )));
        }
        if fanout.offline_grace_secs > MAX_OFFLINE_GRACE_SECS {
            return Err(ConfigError::Message(format!(
                "fanout.offline_grace_secs must be at most {MAX_OFFLINE_GRACE_SECS}, got {}",
                fanout.offline_grace_secs
            )));
        }
        if self.server.auth_timeout_ms == 0 {
            return Err(ConfigError::Message(
                "server.auth_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if fanout.grace_sweep_interval_ms == 0 {
            return Err(ConfigError::Message(
                "fanout.grace_sweep_interval_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
