// ── Core error types ──
//
// User-facing errors from zealnet-core. Consumers never see reqwest or
// tungstenite errors directly: the `From<zealnet_api::Error>` impl
// translates transport-layer failures into domain variants.

use thiserror::Error;

use crate::hotspot::HotspotError;
use crate::storage::StorageError;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Connection errors ────────────────────────────────────────────
    #[error("Cannot reach portal at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("Portal request timed out")]
    Timeout,

    // ── API errors (wrapped, not exposed raw) ────────────────────────
    #[error("Portal rejected the request (HTTP {status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("API error: {message}")]
    Api { message: String },

    // ── Local state ──────────────────────────────────────────────────
    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Hotspot(#[from] HotspotError),

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl CoreError {
    /// Returns `true` if retrying the same request later could succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } | Self::Timeout => true,
            Self::Rejected { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<zealnet_api::Error> for CoreError {
    fn from(err: zealnet_api::Error) -> Self {
        match err {
            zealnet_api::Error::Transport(ref e) => {
                if e.is_timeout() {
                    CoreError::Timeout
                } else if e.is_connect() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                    }
                }
            }
            zealnet_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            zealnet_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            zealnet_api::Error::InvalidHeader(msg) => CoreError::Config {
                message: format!("Invalid header value: {msg}"),
            },
            zealnet_api::Error::Api { status, message } => CoreError::Rejected { status, message },
            zealnet_api::Error::WebSocketConnect(reason) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("WebSocket connection failed: {reason}"),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_status_maps_to_rejected() {
        let err: CoreError = zealnet_api::Error::Api {
            status: 409,
            message: "duplicate payment".into(),
        }
        .into();
        assert!(matches!(err, CoreError::Rejected { status: 409, .. }));
        assert!(!err.is_transient());
    }

    #[test]
    fn server_errors_are_transient() {
        let err: CoreError = zealnet_api::Error::Api {
            status: 502,
            message: String::new(),
        }
        .into();
        assert!(err.is_transient());
    }
}
