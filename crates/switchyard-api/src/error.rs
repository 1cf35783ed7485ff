use thiserror::Error;

/// Top-level error type for the `switchyard-api` crate.
///
/// Covers every failure mode a southbound protocol client can report:
/// session, transport, device-side status, and payload decoding.
/// `switchyard-core` maps these into its own error kinds.
#[derive(Debug, Error)]
pub enum Error {
    // ── Session ─────────────────────────────────────────────────────
    /// The device rejected the session token or the login credentials.
    #[error("Unauthorized: {message}")]
    Unauthorized { message: String },

    // ── Device status ───────────────────────────────────────────────
    /// The device is temporarily unable to serve the request (HTTP 503 or equivalent).
    #[error("Service temporarily unavailable: {message}")]
    ServiceUnavailable { message: String },

    /// The requested resource does not exist on the device.
    #[error("Not found: {resource}")]
    NotFound { resource: String },

    /// The device refused the request payload.
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// Any other non-success status reported by the device.
    #[error("Device returned HTTP {status}: {body}")]
    Http { status: u16, body: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS configuration or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },

    /// The capability binding did not carry usable parameters for the action.
    #[error("Action '{action}' is not usable: {reason}")]
    UnsupportedAction { action: String, reason: String },

    /// Protocol-level failure reported by a non-HTTP client.
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl Error {
    /// Returns `true` if the session token is no longer accepted
    /// and a fresh login might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        matches!(self, Self::Unauthorized { .. })
    }

    /// Returns `true` if the device asked the caller to come back later.
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::ServiceUnavailable { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::SERVICE_UNAVAILABLE),
            _ => false,
        }
    }

    /// Returns `true` if this is a "not found" error.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_status_errors() {
        let unauthorized = Error::Unauthorized {
            message: "token expired".into(),
        };
        assert!(unauthorized.is_auth_expired());
        assert!(!unauthorized.is_unavailable());

        let busy = Error::ServiceUnavailable {
            message: "busy".into(),
        };
        assert!(busy.is_unavailable());
        assert!(!busy.is_auth_expired());

        let missing = Error::NotFound {
            resource: "/api/v1/vlans".into(),
        };
        assert!(missing.is_not_found());
    }

    #[test]
    fn other_http_errors_are_not_retryable() {
        let err = Error::Http {
            status: 500,
            body: "boom".into(),
        };
        assert!(!err.is_auth_expired());
        assert!(!err.is_unavailable());
        assert!(!err.is_not_found());
    }
}
