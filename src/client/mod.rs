//! The `client` module defines the representation of a connected client.
//!
//! It provides the `Client` struct, which holds a connection's identifier,
//! the channel used to push frames to it and the identity it authenticated
//! as, and `ClientTable`, the transport's connection directory.

pub mod pubsub_client;
pub use pubsub_client::{Client, ClientTable};

#[cfg(test)]
mod tests;
