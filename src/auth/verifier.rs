//! Identity verification
//!
//! `IdentityVerifier` is the seam between the transport and whatever issues
//! credentials. Verification is async so a remote verifier never blocks the
//! processing of unrelated connections; the transport calls it without
//! holding the hub lock.

use std::collections::HashMap;

use async_trait::async_trait;
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::identity::{Identity, Role};

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AuthError {
    #[error("invalid or expired token")]
    InvalidToken,

    #[error("unknown role '{0}'")]
    UnknownRole(String),

    #[error("credential rejected: {reason}")]
    Rejected { reason: String },
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError>;
}

/// JWT claims accepted by `JwtVerifier`.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: usize,
}

/// Verifies HS256 tokens signed with a shared secret.
pub struct JwtVerifier {
    key: DecodingKey,
    validation: Validation,
}

impl JwtVerifier {
    pub fn new(secret: &str) -> Self {
        Self {
            key: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::default(),
        }
    }
}

impl std::fmt::Debug for JwtVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtVerifier")
            .field("key", &"<redacted>")
            .finish()
    }
}

#[async_trait]
impl IdentityVerifier for JwtVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        let data = decode::<Claims>(credential, &self.key, &self.validation)
            .map_err(|_| AuthError::InvalidToken)?;
        let claims = data.claims;

        if claims.sub.trim().is_empty() {
            return Err(AuthError::Rejected {
                reason: "empty subject".to_string(),
            });
        }

        let role: Role = claims
            .role
            .parse()
            .map_err(|_| AuthError::UnknownRole(claims.role.clone()))?;

        Ok(Identity::new(claims.sub, role))
    }
}

/// Fixed credential table. Useful for embedding and tests.
#[derive(Debug, Default, Clone)]
pub struct StaticVerifier {
    identities: HashMap<String, Identity>,
}

impl StaticVerifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, credential: impl Into<String>, identity: Identity) -> Self {
        self.identities.insert(credential.into(), identity);
        self
    }
}

#[async_trait]
impl IdentityVerifier for StaticVerifier {
    async fn verify(&self, credential: &str) -> Result<Identity, AuthError> {
        self.identities
            .get(credential)
            .cloned()
            .ok_or(AuthError::InvalidToken)
    }
}
