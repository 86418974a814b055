//! CLI error types with miette diagnostics.
//!
//! Maps core, config and hotspot failures into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use zealnet_config::ConfigError;
use zealnet_core::{CoreError, HotspotError, StorageError};

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const REJECTED: i32 = 6;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not reach the portal at {url}")]
    #[diagnostic(
        code(zealnet::connection_failed),
        help(
            "Check that the portal is reachable from this network.\n\
             Queued actions stay on disk and can be replayed with: zealnet queue process"
        )
    )]
    ConnectionFailed { url: String, reason: String },

    #[error("Request timed out")]
    #[diagnostic(
        code(zealnet::timeout),
        help("Increase the timeout with --timeout or check the portal's responsiveness.")
    )]
    Timeout,

    #[error("Socket connection failed after {attempts} reconnection attempts")]
    #[diagnostic(
        code(zealnet::socket_failed),
        help("Check socket_url in your profile, or the portal's /ws endpoint.")
    )]
    SocketFailed { attempts: u32 },

    // ── Portal responses ─────────────────────────────────────────────
    #[error("Portal rejected the request (HTTP {status}): {message}")]
    #[diagnostic(
        code(zealnet::rejected),
        help("If this is an authorization failure, store a fresh token with: zealnet auth set-token")
    )]
    Rejected { status: u16, message: String },

    #[error("API error: {message}")]
    #[diagnostic(code(zealnet::api_error))]
    Api { message: String },

    // ── Hotspot ──────────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(zealnet::hotspot),
        help("Pass the full URL the router redirected to, including its query string.")
    )]
    Hotspot(#[from] HotspotError),

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(zealnet::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("No portal configured")]
    #[diagnostic(
        code(zealnet::no_config),
        help(
            "Create a profile with: zealnet config init\n\
             Expected at: {path}\n\
             Or pass --api-url (ZEALNET_API_URL)."
        )
    )]
    NoConfig { path: String },

    #[error(transparent)]
    #[diagnostic(code(zealnet::config))]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(code(zealnet::config))]
    Figment(Box<figment::Error>),

    // ── Local state ──────────────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(
        code(zealnet::storage),
        help("Check permissions on the data directory (--data-dir).")
    )]
    Storage(#[from] StorageError),

    // ── Interactive ──────────────────────────────────────────────────
    #[error("Destructive operation '{action}' requires confirmation")]
    #[diagnostic(
        code(zealnet::confirmation_required),
        help("Use --yes (-y) to skip confirmation in non-interactive contexts.")
    )]
    NonInteractiveRequiresYes { action: String },

    // ── IO / Serialization ───────────────────────────────────────────
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Invalid JSON payload: {0}")]
    #[diagnostic(code(zealnet::json), help("Check the JSON payload and try again."))]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    #[diagnostic(code(zealnet::internal))]
    Internal(String),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. }
            | Self::SocketFailed { .. }
            | Self::Hotspot(HotspotError::Navigation { .. }) => exit_code::CONNECTION,
            Self::Timeout => exit_code::TIMEOUT,
            Self::Rejected { status: 401 | 403, .. } => exit_code::AUTH,
            Self::Rejected { .. } => exit_code::REJECTED,
            Self::Hotspot(_)
            | Self::Validation { .. }
            | Self::NonInteractiveRequiresYes { .. }
            | Self::Json(_) => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionFailed { url, reason } => Self::ConnectionFailed { url, reason },
            CoreError::Timeout => Self::Timeout,
            CoreError::Rejected { status, message } => Self::Rejected { status, message },
            CoreError::Api { message } => Self::Api { message },
            CoreError::Storage(e) => Self::Storage(e),
            CoreError::Hotspot(e) => Self::Hotspot(e),
            CoreError::Config { message } => Self::Validation {
                field: "config".into(),
                reason: message,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_class() {
        let unauthorized: CliError = CoreError::Rejected {
            status: 401,
            message: "expired".into(),
        }
        .into();
        assert_eq!(unauthorized.exit_code(), exit_code::AUTH);

        let conflict: CliError = CoreError::Rejected {
            status: 409,
            message: "duplicate".into(),
        }
        .into();
        assert_eq!(conflict.exit_code(), exit_code::REJECTED);

        assert_eq!(CliError::from(CoreError::Timeout).exit_code(), exit_code::TIMEOUT);
        assert_eq!(
            CliError::from(HotspotError::MissingLoginUrl).exit_code(),
            exit_code::USAGE
        );
        assert_eq!(CliError::SocketFailed { attempts: 5 }.exit_code(), exit_code::CONNECTION);
        assert_eq!(
            CliError::from(HotspotError::Navigation {
                url: "http://10.5.50.1/login".into(),
                reason: "connection refused".into(),
            })
            .exit_code(),
            exit_code::CONNECTION
        );
    }
}
