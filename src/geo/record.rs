use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::auth::{Role, SubscriberId};
use crate::utils::FanoutError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    Available,
    Busy,
    Offline,
}

/// Latest known position of a subscriber. At most one per subscriber.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationRecord {
    pub subscriber_id: SubscriberId,
    pub role: Role,
    pub latitude: f64,
    pub longitude: f64,
    pub status: Status,
    pub updated_at: DateTime<Utc>,
}

impl LocationRecord {
    pub fn is_active(&self, cutoff: DateTime<Utc>) -> bool {
        self.status != Status::Offline && self.updated_at >= cutoff
    }
}

/// Rejects coordinates outside lat [-90, 90] / lng [-180, 180], and NaN.
pub fn validate_coordinates(lat: f64, lng: f64) -> Result<(), FanoutError> {
    if !lat.is_finite() || !(-90.0..=90.0).contains(&lat) {
        return Err(FanoutError::validation(format!(
            "latitude {lat} out of range [-90, 90]"
        )));
    }
    if !lng.is_finite() || !(-180.0..=180.0).contains(&lng) {
        return Err(FanoutError::validation(format!(
            "longitude {lng} out of range [-180, 180]"
        )));
    }
    Ok(())
}
