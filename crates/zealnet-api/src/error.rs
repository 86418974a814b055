use thiserror::Error;

/// Top-level error type for the `zealnet-api` crate.
///
/// Covers every failure mode of the transport layer: HTTP, URL handling,
/// TLS setup, and the WebSocket handshake. `zealnet-core` maps these into
/// domain-level errors.
#[derive(Debug, Error)]
pub enum Error {
    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    /// A configured header value (e.g. the auth token) is not valid HTTP.
    #[error("Invalid header value: {0}")]
    InvalidHeader(String),

    // ── Portal API ──────────────────────────────────────────────────
    /// The portal answered with a non-success HTTP status.
    #[error("Portal API error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── WebSocket ───────────────────────────────────────────────────
    /// WebSocket connection failed.
    #[error("WebSocket connection failed: {0}")]
    WebSocketConnect(String),
}
