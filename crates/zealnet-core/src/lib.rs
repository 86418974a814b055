//! Client-side core of the ZealNet captive-portal platform.
//!
//! Three independent utilities, wired together by [`Portal`]:
//!
//! - **[`SocketClient`]**: one logical WebSocket connection to the portal
//!   with bounded auto-reconnect and callback dispatch of `{type, data}`
//!   messages. Built on [`zealnet_api::SocketHandle`].
//!
//! - **[`OfflineQueue`]**: durable FIFO of mutations (payment, plan
//!   purchase, profile update) replayed at least once, in order, when the
//!   [`Connectivity`] monitor reports the portal reachable again.
//!
//! - **[`hotspot`]**: parsing of MikroTik redirect parameters and
//!   construction of the login URL back to the access controller.
//!
//! State shared between them lives in a [`KeyValueStore`]: the queue under
//! its own key, the auth token read by the socket client and REST client.

pub mod config;
pub mod connectivity;
pub mod error;
pub mod hotspot;
pub mod portal;
mod query;
pub mod queue;
pub mod socket;
pub mod storage;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{PortalConfig, TlsVerification};
pub use connectivity::Connectivity;
pub use error::CoreError;
pub use hotspot::{
    HotspotError, HotspotParams, HttpNavigator, NavigationOutcome, Navigator, build_login_url,
    format_mac, generate_session_password, is_hotspot_redirect, is_hotspot_url,
    redirect_to_login, user_identifier,
};
pub use portal::{Portal, PortalQueue};
pub use queue::{
    ActionDispatcher, ActionKind, DEFAULT_MAX_RETRIES, DrainReport, HttpDispatcher, OfflineQueue,
    QueuedAction,
};
pub use socket::{SocketCallbacks, SocketClient, SocketOptions, default_socket_url};
pub use storage::{FileStore, KeyValueStore, MemoryStore, StorageError};

// Transport types that appear in this crate's public API.
pub use zealnet_api::{
    Backoff, ConnectionState, ReconnectConfig, SocketEvent, SocketMessage, TlsMode, TransportConfig,
};
