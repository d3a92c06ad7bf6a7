//! Geo index
//!
//! In-memory map of `SubscriberId -> LocationRecord`. Records are never
//! physically removed while the process runs; `mark_offline` flips the
//! status and freshness filtering happens at query time.
//!
//! The index does not validate coordinates. The engine rejects bad input
//! before it gets here.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};

use super::distance::haversine_meters;
use super::record::{LocationRecord, Status};
use crate::auth::{Role, SubscriberId};

#[derive(Debug, Default)]
pub struct GeoIndex {
    records: HashMap<SubscriberId, LocationRecord>,
}

impl GeoIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores the record unless an existing one is strictly newer.
    ///
    /// Returns `false` when the update was stale and ignored. Transport does
    /// not guarantee ordering, so stale input is not an error.
    pub fn upsert(
        &mut self,
        subscriber_id: &str,
        role: Role,
        lat: f64,
        lng: f64,
        status: Status,
        timestamp: DateTime<Utc>,
    ) -> bool {
        if let Some(existing) = self.records.get(subscriber_id) {
            if timestamp < existing.updated_at {
                return false;
            }
        }

        self.records.insert(
            subscriber_id.to_string(),
            LocationRecord {
                subscriber_id: subscriber_id.to_string(),
                role,
                latitude: lat,
                longitude: lng,
                status,
                updated_at: timestamp,
            },
        );
        true
    }

    /// Sets the status to offline and keeps the last known position.
    pub fn mark_offline(&mut self, subscriber_id: &str) {
        if let Some(record) = self.records.get_mut(subscriber_id) {
            record.status = Status::Offline;
        }
    }

    /// Rewrites the role on the stored record, if any. Position, status and
    /// timestamp are untouched.
    pub fn set_role(&mut self, subscriber_id: &str, role: Role) {
        if let Some(record) = self.records.get_mut(subscriber_id) {
            record.role = role;
        }
    }

    pub fn get(&self, subscriber_id: &str) -> Option<&LocationRecord> {
        self.records.get(subscriber_id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn query_active(&self, role: Option<Role>, freshness: Duration) -> Vec<LocationRecord> {
        self.query_active_at(role, freshness, Utc::now())
    }

    /// Non-offline records updated within `freshness` of `now`, most recent
    /// first, ties by subscriber id.
    pub fn query_active_at(
        &self,
        role: Option<Role>,
        freshness: Duration,
        now: DateTime<Utc>,
    ) -> Vec<LocationRecord> {
        let cutoff = freshness_cutoff(now, freshness);
        let mut active: Vec<LocationRecord> = self
            .records
            .values()
            .filter(|r| r.is_active(cutoff))
            .filter(|r| role.is_none_or(|wanted| r.role == wanted))
            .cloned()
            .collect();

        active.sort_by(|a, b| {
            b.updated_at
                .cmp(&a.updated_at)
                .then_with(|| a.subscriber_id.cmp(&b.subscriber_id))
        });
        active
    }

    pub fn query_nearby(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: f64,
        freshness: Duration,
    ) -> Vec<(LocationRecord, f64)> {
        self.query_nearby_at(lat, lng, radius_meters, freshness, Utc::now())
    }

    /// Active records within `radius_meters` (inclusive), nearest first.
    pub fn query_nearby_at(
        &self,
        lat: f64,
        lng: f64,
        radius_meters: f64,
        freshness: Duration,
        now: DateTime<Utc>,
    ) -> Vec<(LocationRecord, f64)> {
        let cutoff = freshness_cutoff(now, freshness);
        let mut nearby: Vec<(LocationRecord, f64)> = self
            .records
            .values()
            .filter(|r| r.is_active(cutoff))
            .filter_map(|r| {
                let distance = haversine_meters(lat, lng, r.latitude, r.longitude);
                (distance <= radius_meters).then(|| (r.clone(), distance))
            })
            .collect();

        nearby.sort_by(|(a, da), (b, db)| {
            da.partial_cmp(db)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.subscriber_id.cmp(&b.subscriber_id))
        });
        nearby
    }
}

/// Oldest `updated_at` still considered fresh. A window reaching past the
/// representable range keeps every record.
fn freshness_cutoff(now: DateTime<Utc>, freshness: Duration) -> DateTime<Utc> {
    now.checked_sub_signed(freshness)
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
