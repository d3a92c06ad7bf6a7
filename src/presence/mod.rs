//! The `presence` module tracks which transport connections belong to
//! which subscriber.
//!
//! A subscriber is online while it holds at least one connection. Extra
//! connections (more devices) only reference-count the online state.

pub mod registry;

pub use registry::{ConnectionId, Departure, PresenceRegistry, Registration};

#[cfg(test)]
mod tests;
