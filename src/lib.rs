//! # GeoPulse
//!
//! `geopulse` is an in-memory presence and location fanout service for
//! emergency dispatch. Responders and citizens connect over WebSockets,
//! stream their positions, and the service pushes targeted notifications:
//! presence changes to role rooms, nearby-responder notices to citizens and
//! emergency alerts to the responders in range.
//!
//! ## Core Modules
//!
//! - `auth`: verified identities, roles and the `IdentityVerifier` seam.
//! - `geo`: latest position per subscriber and haversine proximity queries.
//! - `presence`: connection to subscriber mapping and online tracking.
//! - `router`: typed topics and delivery-set resolution.
//! - `fanout`: the engine that turns inbound events into deliveries.
//! - `client`: a connected WebSocket client and its outbound channel.
//! - `config`: loading and merging service configuration.
//! - `transport`: the JSON protocol and the WebSocket server.
//! - `utils`: error taxonomy and logging setup.

pub mod auth;
pub mod client;
pub mod config;
pub mod fanout;
pub mod geo;
pub mod presence;
pub mod router;
pub mod transport;
pub mod utils;
