//! The `auth` module turns a bearer credential into a verified identity.
//!
//! Credential issuance lives outside this service. The fanout core only
//! consumes the `IdentityVerifier` capability, so the transport can plug in
//! `JwtVerifier` in production and `StaticVerifier` in tests.

pub mod identity;
pub mod verifier;

pub use identity::{Identity, Role, SubscriberId};
pub use verifier::{AuthError, Claims, IdentityVerifier, JwtVerifier, StaticVerifier};

#[cfg(test)]
mod tests;
