//! The `error` module defines the error taxonomy of the fanout service.
//!
//! Every inbound event either succeeds or fails with exactly one
//! `FanoutError`. Errors are handled per event: the originating connection
//! receives an error frame, nobody else is affected.

use thiserror::Error;

use crate::auth::AuthError;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum FanoutError {
    /// Malformed coordinates, unknown topic kind, missing field.
    #[error("validation failed: {message}")]
    Validation { message: String },

    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Reference to a connection or subscriber that is no longer registered.
    #[error("{what} not found")]
    NotFound { what: String },

    #[error("internal error: {message}")]
    Internal { message: String },
}

impl FanoutError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Wire name carried in the `error` server message.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "validation",
            Self::Auth(_) => "auth",
            Self::NotFound { .. } => "not_found",
            Self::Internal { .. } => "internal",
        }
    }

    /// Disconnect races surface as `NotFound`; they are expected under load
    /// and are not reported back to the client.
    pub fn is_benign(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl From<serde_json::Error> for FanoutError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("serialization: {err}"))
    }
}
