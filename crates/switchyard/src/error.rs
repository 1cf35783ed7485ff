//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` into user-facing errors with
//! actionable help text and stable exit codes.

use miette::Diagnostic;
use thiserror::Error;

use switchyard_config::ConfigError;
use switchyard_core::CoreError;

pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNAVAILABLE: i32 = 7;
    pub const INTERRUPTED: i32 = 130;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Device ───────────────────────────────────────────────────────
    #[error("Device did not answer: {message}")]
    #[diagnostic(
        code(swyd::unavailable),
        help("Check that the switch is reachable and its management services are enabled.")
    )]
    Unavailable { message: String },

    #[error("Authentication failed: {message}")]
    #[diagnostic(
        code(swyd::auth_failed),
        help("Verify the account credentials.\nRun: swyd config show")
    )]
    AuthFailed { message: String },

    #[error("{resource_type} '{identifier}' not found")]
    #[diagnostic(code(swyd::not_found))]
    NotFound {
        resource_type: String,
        identifier: String,
    },

    #[error("No known profile for model '{model}'")]
    #[diagnostic(
        code(swyd::unknown_model),
        help("Discover its capabilities first.\nRun: swyd probe {address}")
    )]
    UnknownModel { model: String, address: String },

    #[error("Device rejected the request: {message}")]
    #[diagnostic(code(swyd::rejected))]
    Rejected { message: String },

    #[error("{message}")]
    #[diagnostic(code(swyd::internal))]
    Internal { message: String },

    #[error("Operation was stopped")]
    #[diagnostic(code(swyd::stopped))]
    Stopped,

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(swyd::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile store not found")]
    #[diagnostic(
        code(swyd::no_profiles),
        help("Pass --profiles or set profiles_path in the config file.\nExpected at: {path}")
    )]
    NoProfiles { path: String },

    #[error(transparent)]
    #[diagnostic(
        code(swyd::config),
        help("Run: swyd config path to locate the config file")
    )]
    Config(#[from] ConfigError),

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(swyd::json), help("Check the file contents and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Invalid YAML payload: {0}")]
    #[diagnostic(code(swyd::yaml), help("Check the file contents and try again."))]
    Yaml(#[from] serde_yaml::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Unavailable { .. } => exit_code::UNAVAILABLE,
            Self::AuthFailed { .. } => exit_code::AUTH,
            Self::NotFound { .. } | Self::UnknownModel { .. } | Self::NoProfiles { .. } => {
                exit_code::NOT_FOUND
            }
            Self::Validation { .. } | Self::Config(ConfigError::Validation { .. }) => exit_code::USAGE,
            Self::Stopped => exit_code::INTERRUPTED,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::NotFound {
                entity_type,
                identifier,
            } => CliError::NotFound {
                resource_type: entity_type,
                identifier,
            },
            CoreError::Unauthorized { message } => CliError::AuthFailed { message },
            CoreError::ServiceUnavailable { message } => CliError::Unavailable { message },
            CoreError::BadRequest { message } => CliError::Rejected { message },
            CoreError::Config { message } => CliError::Validation {
                field: "profile store".into(),
                reason: message,
            },
            CoreError::Stopped => CliError::Stopped,
            other @ (CoreError::Southbound(_) | CoreError::Internal(_)) => CliError::Internal {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn core_errors_map_to_exit_codes() {
        let cases = [
            (CoreError::not_found("VLAN", "30"), exit_code::NOT_FOUND),
            (
                CoreError::ServiceUnavailable {
                    message: "busy".into(),
                },
                exit_code::UNAVAILABLE,
            ),
            (
                CoreError::Unauthorized {
                    message: "expired".into(),
                },
                exit_code::AUTH,
            ),
            (CoreError::Stopped, exit_code::INTERRUPTED),
            (CoreError::Internal("full".into()), exit_code::GENERAL),
        ];
        for (core, code) in cases {
            assert_eq!(CliError::from(core).exit_code(), code);
        }
    }
}
