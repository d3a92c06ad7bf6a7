//! The `transport` module is responsible for handling network communication
//! with clients via WebSockets.
//!
//! It defines the JSON protocol spoken with clients, the `Hub` that couples
//! the fanout engine with the connection directory, and the WebSocket server
//! that authenticates connections and forwards their frames to the hub.

pub mod hub;
pub mod message;
pub mod websocket;

pub use hub::{Hub, SharedHub};
pub use message::{ClientMessage, ServerMessage};
pub use websocket::{serve, start_websocket_server};
