//! The `geo` module keeps the latest position and status of every
//! subscriber and answers proximity queries over them.
//!
//! Proximity is a linear scan with the haversine formula. At the expected
//! scale (hundreds of concurrent responders) this is fast enough and keeps
//! the index trivially consistent.

pub mod distance;
pub mod index;
pub mod record;

pub use distance::{EARTH_RADIUS_METERS, haversine_meters};
pub use index::GeoIndex;
pub use record::{LocationRecord, Status, validate_coordinates};
