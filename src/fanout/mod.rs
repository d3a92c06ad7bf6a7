//! The `fanout` module is the orchestrator of the service.
//!
//! `FanoutEngine` receives inbound events, applies them to the geo index,
//! the presence registry and the router, and returns the list of
//! `Delivery` values the transport has to push out. It performs no I/O, so
//! every flow can be tested synchronously.

pub mod engine;
pub mod event;

pub use engine::FanoutEngine;
pub use event::{Delivery, EmergencyAlert, LocationUpdate, OutboundEvent};
