// ── Core error types ──
//
// Domain errors from switchyard-core. Callers above the dispatcher never
// see raw HTTP statuses: the `From<switchyard_api::Error>` impl folds
// transport-layer errors into the error kinds the workflows act on.

use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

/// Coarse error taxonomy surfaced to job status consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
pub enum ErrorKind {
    NotFound,
    Unauthorized,
    ServiceUnavailable,
    BadRequest,
    InternalError,
    /// Cooperative cancellation was observed. Not a failure.
    Stopped,
}

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Lookup errors ────────────────────────────────────────────────
    #[error("{entity_type} not found: {identifier}")]
    NotFound {
        entity_type: String,
        identifier: String,
    },

    // ── Device errors ────────────────────────────────────────────────
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    #[error("Service unavailable: {message}")]
    ServiceUnavailable { message: String },

    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Southbound failure with no dedicated kind (transport, decoding).
    #[error("Southbound call failed: {0}")]
    Southbound(#[source] switchyard_api::Error),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Control flow ─────────────────────────────────────────────────
    #[error("Operation stopped")]
    Stopped,

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub fn not_found(entity_type: impl Into<String>, identifier: impl Into<String>) -> Self {
        Self::NotFound {
            entity_type: entity_type.into(),
            identifier: identifier.into(),
        }
    }

    /// The taxonomy kind of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Unauthorized { .. } => ErrorKind::Unauthorized,
            Self::ServiceUnavailable { .. } => ErrorKind::ServiceUnavailable,
            Self::BadRequest { .. } | Self::Config { .. } => ErrorKind::BadRequest,
            Self::Stopped => ErrorKind::Stopped,
            Self::Southbound(_) | Self::Internal(_) => ErrorKind::InternalError,
        }
    }

    /// Returns `true` if this is the cooperative-cancellation marker.
    pub fn is_stopped(&self) -> bool {
        matches!(self, Self::Stopped)
    }

    /// Returns `true` if the capability, action, or resource is absent.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<switchyard_api::Error> for CoreError {
    fn from(err: switchyard_api::Error) -> Self {
        match err {
            switchyard_api::Error::Unauthorized { message } => Self::Unauthorized { message },
            switchyard_api::Error::ServiceUnavailable { message } => {
                Self::ServiceUnavailable { message }
            }
            switchyard_api::Error::NotFound { resource } => Self::not_found("resource", resource),
            switchyard_api::Error::BadRequest { message } => Self::BadRequest { message },
            switchyard_api::Error::UnsupportedAction { action, reason } => {
                Self::not_found("action", format!("{action} ({reason})"))
            }
            other => Self::Southbound(other),
        }
    }
}
