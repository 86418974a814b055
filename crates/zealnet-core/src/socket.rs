// ── Portal socket client ──
//
// Callback-style facade over `zealnet_api::SocketHandle`. Owns at most one
// live connection; `connect` while already connected replaces it. Events
// from the connection loop are forwarded to the registered callbacks by a
// dispatcher task tied to that connection only.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use arc_swap::ArcSwap;
use secrecy::ExposeSecret;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use url::Url;

use zealnet_api::{
    ConnectionState, ReconnectConfig, SocketEvent, SocketHandle, SocketMessage, TlsConnector,
};

use crate::error::CoreError;
use crate::query::set_query_params;
use crate::storage::{KeyValueStore, read_auth_token};

const EVENT_CHANNEL_SIZE: usize = 256;

type OpenFn = Arc<dyn Fn() + Send + Sync>;
type MessageFn = Arc<dyn Fn(&SocketMessage) + Send + Sync>;
type CloseFn = Arc<dyn Fn(Option<u16>, &str) + Send + Sync>;
type ErrorFn = Arc<dyn Fn(&str) + Send + Sync>;

// ── Callbacks ────────────────────────────────────────────────────

/// Handlers invoked for the lifecycle of a connection. All optional.
#[derive(Clone, Default)]
pub struct SocketCallbacks {
    on_open: Option<OpenFn>,
    on_message: Option<MessageFn>,
    on_close: Option<CloseFn>,
    on_error: Option<ErrorFn>,
}

impl SocketCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_open(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_open = Some(Arc::new(f));
        self
    }

    /// Called for every well-formed inbound message, whatever its `type`.
    #[must_use]
    pub fn on_message(mut self, f: impl Fn(&SocketMessage) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_close(mut self, f: impl Fn(Option<u16>, &str) + Send + Sync + 'static) -> Self {
        self.on_close = Some(Arc::new(f));
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    fn dispatch(&self, event: &SocketEvent) {
        match event {
            SocketEvent::Open => {
                if let Some(f) = &self.on_open {
                    f();
                }
            }
            SocketEvent::Message(message) => {
                if let Some(f) = &self.on_message {
                    f(message.as_ref());
                }
            }
            SocketEvent::Close { code, reason } => {
                if let Some(f) = &self.on_close {
                    f(*code, reason.as_str());
                }
            }
            SocketEvent::Error(error) => {
                if let Some(f) = &self.on_error {
                    f(error.as_str());
                }
            }
        }
    }
}

impl fmt::Debug for SocketCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketCallbacks")
            .field("on_open", &self.on_open.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_close", &self.on_close.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

/// Per-call connection options.
#[derive(Debug, Clone, Default)]
pub struct SocketOptions {
    /// Overrides the client's default endpoint.
    pub url: Option<Url>,
    /// Overrides the client's reconnection policy.
    pub reconnect: Option<ReconnectConfig>,
}

// ── SocketClient ─────────────────────────────────────────────────

struct ActiveConnection {
    handle: SocketHandle,
    dispatcher: JoinHandle<()>,
}

/// A single logical connection to the portal socket endpoint.
pub struct SocketClient {
    default_url: Url,
    reconnect: ReconnectConfig,
    tls: Option<TlsConnector>,
    store: Arc<dyn KeyValueStore>,
    callbacks: Arc<ArcSwap<SocketCallbacks>>,
    active: Mutex<Option<ActiveConnection>>,
    cancel: CancellationToken,
    idle_state: watch::Sender<ConnectionState>,
    idle_events: broadcast::Sender<SocketEvent>,
}

impl SocketClient {
    /// `cancel` is the parent token; every connection runs on a child of it.
    pub fn new(
        default_url: Url,
        reconnect: ReconnectConfig,
        store: Arc<dyn KeyValueStore>,
        cancel: CancellationToken,
    ) -> Self {
        let (idle_state, _) = watch::channel(ConnectionState::Disconnected);
        let (idle_events, _) = broadcast::channel(1);
        Self {
            default_url,
            reconnect,
            tls: None,
            store,
            callbacks: Arc::new(ArcSwap::from_pointee(SocketCallbacks::default())),
            active: Mutex::new(None),
            cancel,
            idle_state,
            idle_events,
        }
    }

    /// Use `tls` for `wss://` handshakes instead of the bundled web PKI roots.
    #[must_use]
    pub fn with_tls(mut self, tls: Option<TlsConnector>) -> Self {
        self.tls = tls;
        self
    }

    /// Open a connection, replacing any existing one.
    ///
    /// The previous connection is shut down without invoking the new
    /// callbacks for its teardown. The stored auth token, if any, is sent
    /// as the `token` query parameter. Must be called within a tokio runtime.
    pub fn connect(
        &self,
        callbacks: SocketCallbacks,
        options: SocketOptions,
    ) -> Result<(), CoreError> {
        let mut active = self.active();
        if let Some(previous) = active.take() {
            debug!("replacing existing socket connection");
            previous.handle.shutdown();
            previous.dispatcher.abort();
        }

        self.callbacks.store(Arc::new(callbacks));

        let mut url = options.url.unwrap_or_else(|| self.default_url.clone());
        if let Some(token) = read_auth_token(self.store.as_ref())? {
            set_query_params(&mut url, &[("token", token.expose_secret())]);
        }
        let reconnect = options.reconnect.unwrap_or_else(|| self.reconnect.clone());

        let (events, mut rx) = broadcast::channel(EVENT_CHANNEL_SIZE);
        let handle = SocketHandle::connect_with_tls(
            url,
            reconnect,
            self.tls.clone(),
            self.cancel.child_token(),
            events,
        );

        let callbacks = Arc::clone(&self.callbacks);
        let dispatcher = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => callbacks.load().dispatch(&event),
                    Err(broadcast::error::RecvError::Lagged(n)) => {
                        warn!(skipped = n, "socket callbacks lagged, events dropped");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        *active = Some(ActiveConnection { handle, dispatcher });
        info!("socket client connecting");
        Ok(())
    }

    /// Transmit `message` if the connection is open; `false` otherwise.
    pub fn send(&self, message: &SocketMessage) -> bool {
        match self.active().as_ref() {
            Some(conn) => conn.handle.send(message),
            None => {
                warn!(kind = %message.kind, "socket not connected, dropping message");
                false
            }
        }
    }

    /// Close the connection and stop reconnecting.
    pub fn disconnect(&self) {
        if let Some(conn) = self.active().as_ref() {
            conn.handle.shutdown();
            info!("socket client disconnected");
        }
    }

    pub fn is_connected(&self) -> bool {
        self.active()
            .as_ref()
            .is_some_and(|conn| conn.handle.is_connected())
    }

    pub fn state(&self) -> ConnectionState {
        self.active()
            .as_ref()
            .map_or(ConnectionState::Disconnected, |conn| conn.handle.state())
    }

    /// Watch the state of the current connection.
    ///
    /// A later `connect` starts a new connection with its own channel; call
    /// this again after reconnecting manually.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.active()
            .as_ref()
            .map_or_else(|| self.idle_state.subscribe(), |conn| conn.handle.watch_state())
    }

    /// Raw events of the current connection, in addition to the callbacks.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.active()
            .as_ref()
            .map_or_else(|| self.idle_events.subscribe(), |conn| conn.handle.subscribe())
    }

    pub fn default_url(&self) -> &Url {
        &self.default_url
    }

    fn active(&self) -> MutexGuard<'_, Option<ActiveConnection>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for SocketClient {
    fn drop(&mut self) {
        if let Some(conn) = self.active().take() {
            conn.handle.shutdown();
            conn.dispatcher.abort();
        }
    }
}

impl fmt::Debug for SocketClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SocketClient")
            .field("default_url", &self.default_url.as_str())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

/// Derive the socket endpoint from the portal API base URL.
///
/// `http` becomes `ws`, `https` becomes `wss`, and the path is `/ws`.
pub fn default_socket_url(api_url: &Url) -> Result<Url, CoreError> {
    let scheme = match api_url.scheme() {
        "http" | "ws" => "ws",
        "https" | "wss" => "wss",
        other => {
            return Err(CoreError::Config {
                message: format!("cannot derive a socket URL from scheme '{other}'"),
            });
        }
    };

    let mut url = api_url.clone();
    url.set_scheme(scheme).map_err(|()| CoreError::Config {
        message: format!("cannot derive a socket URL from '{api_url}'"),
    })?;
    url.set_path("/ws");
    url.set_query(None);
    url.set_fragment(None);
    Ok(url)
}
