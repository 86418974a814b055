//! Portal WebSocket connection with bounded auto-reconnect.
//!
//! Connects to the portal's `/ws` endpoint, parses `{type, data}` text
//! frames and publishes connection lifecycle and messages as
//! [`SocketEvent`]s through a [`tokio::sync::broadcast`] channel. The
//! connection state is observable through a [`tokio::sync::watch`] channel.
//!
//! Reconnection follows [`ReconnectConfig`]: after every close or failed
//! attempt the loop waits and retries until the attempt ceiling is reached,
//! then gives up and reports [`ConnectionState::Failed`]. A successful open
//! resets the counter.
//!
//! # Example
//!
//! ```rust,ignore
//! use tokio::sync::broadcast;
//! use tokio_util::sync::CancellationToken;
//! use zealnet_api::websocket::{ReconnectConfig, SocketEvent, SocketHandle, SocketMessage};
//!
//! let (events, mut rx) = broadcast::channel(256);
//! let url = url::Url::parse("wss://portal.example.net/ws")?;
//! let handle = SocketHandle::connect(url, ReconnectConfig::default(), CancellationToken::new(), events);
//!
//! while let Ok(event) = rx.recv().await {
//!     if let SocketEvent::Open = event {
//!         handle.send(&SocketMessage::new("subscribe", serde_json::json!({"topic": "usage"})));
//!     }
//! }
//! ```

use std::sync::Arc;
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use serde::{Deserialize, Serialize};
use tokio::sync::{broadcast, mpsc, watch};
use tokio_tungstenite::Connector;
use tokio_tungstenite::tungstenite::{self, ClientRequestBuilder};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::Error;

// ── SocketMessage ────────────────────────────────────────────────────

/// Envelope exchanged with the portal in both directions.
///
/// Serialized as `{"type": "...", "data": ...}` text frames.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SocketMessage {
    /// Discriminator, e.g. `"usage_update"`, `"payment_status"`.
    #[serde(rename = "type")]
    pub kind: String,

    /// Opaque payload. `null` when the frame carries none.
    #[serde(default)]
    pub data: serde_json::Value,
}

impl SocketMessage {
    pub fn new(kind: impl Into<String>, data: serde_json::Value) -> Self {
        Self {
            kind: kind.into(),
            data,
        }
    }
}

// ── SocketEvent ──────────────────────────────────────────────────────

/// Lifecycle and message events published by the connection loop.
#[derive(Debug, Clone)]
pub enum SocketEvent {
    /// The connection opened.
    Open,
    /// A well-formed message arrived.
    Message(Arc<SocketMessage>),
    /// The connection closed (or an attempt to open it failed).
    Close { code: Option<u16>, reason: String },
    /// A connection-level error. Always followed by [`SocketEvent::Close`].
    Error(String),
}

// ── ConnectionState ──────────────────────────────────────────────────

/// Connection state observable by consumers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Connected,
    Reconnecting { attempt: u32 },
    /// The reconnect ceiling was reached; no further attempts will be made.
    Failed { attempts: u32 },
}

// ── ReconnectConfig ──────────────────────────────────────────────────

/// Delay growth between reconnection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Backoff {
    /// Same delay before every attempt.
    #[default]
    Fixed,
    /// Doubling delay capped at `max_delay`, with +-25% jitter.
    Exponential { max_delay: Duration },
}

/// Reconnection policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReconnectConfig {
    /// Delay before a reconnection attempt. Default: 3s.
    pub delay: Duration,

    /// Reconnection attempts allowed between two successful opens. Default: 5.
    pub max_attempts: u32,

    /// Default: [`Backoff::Fixed`].
    pub backoff: Backoff,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            delay: Duration::from_millis(3000),
            max_attempts: 5,
            backoff: Backoff::Fixed,
        }
    }
}

impl ReconnectConfig {
    /// Delay before the reconnection attempt numbered `attempt` (0-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed => self.delay,
            Backoff::Exponential { max_delay } => exponential_backoff(attempt, self.delay, max_delay),
        }
    }
}

/// Exponential backoff with jitter.
///
/// `delay = min(initial * 2^attempt, max) + jitter`
///
/// Jitter is +-25% to spread out reconnection storms from many clients.
fn exponential_backoff(attempt: u32, initial: Duration, max: Duration) -> Duration {
    let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
    let base = initial.as_secs_f64() * 2.0_f64.powi(exponent);
    let capped = base.min(max.as_secs_f64());

    // Deterministic "jitter" seeded from the attempt number.
    let jitter_factor = 1.0 + 0.25 * (f64::from(attempt) * 7.3).sin();
    let with_jitter = (capped * jitter_factor).max(0.0);

    Duration::from_secs_f64(with_jitter)
}

// ── ReconnectTracker ─────────────────────────────────────────────────

/// Attempt bookkeeping for the reconnect policy.
///
/// Kept separate from the I/O loop so the policy is testable on its own.
#[derive(Debug, Clone)]
pub struct ReconnectTracker {
    config: ReconnectConfig,
    attempts: u32,
    suppressed: bool,
}

impl ReconnectTracker {
    pub fn new(config: ReconnectConfig) -> Self {
        Self {
            config,
            attempts: 0,
            suppressed: false,
        }
    }

    /// Record a successful open.
    pub fn on_open(&mut self) {
        self.attempts = 0;
    }

    /// Record a close. Returns the delay before the next attempt, or `None`
    /// if no reconnect should be scheduled.
    pub fn on_close(&mut self) -> Option<Duration> {
        if self.suppressed || self.attempts >= self.config.max_attempts {
            return None;
        }
        let delay = self.config.delay_for(self.attempts);
        self.attempts += 1;
        Some(delay)
    }

    /// Stop all future reconnects.
    pub fn suppress(&mut self) {
        self.suppressed = true;
    }

    /// Reconnection attempts made since the last successful open.
    pub fn attempts(&self) -> u32 {
        self.attempts
    }
}

// ── SocketHandle ─────────────────────────────────────────────────────

/// Handle to a running socket connection loop.
///
/// The loop stops when [`shutdown`](Self::shutdown) is called, when the
/// token passed to [`connect`](Self::connect) is cancelled, or when the
/// handle is dropped.
#[derive(Debug)]
pub struct SocketHandle {
    outbound: mpsc::UnboundedSender<String>,
    state: watch::Receiver<ConnectionState>,
    events: broadcast::Sender<SocketEvent>,
    cancel: CancellationToken,
}

impl SocketHandle {
    /// Spawn the connection loop.
    ///
    /// Returns immediately; the first connection attempt happens in the
    /// background. Events are published on `events`, so callers that must
    /// not miss the first [`SocketEvent::Open`] subscribe before calling.
    pub fn connect(
        url: Url,
        reconnect: ReconnectConfig,
        cancel: CancellationToken,
        events: broadcast::Sender<SocketEvent>,
    ) -> Self {
        Self::connect_with_tls(url, reconnect, None, cancel, events)
    }

    /// Like [`SocketHandle::connect`], with an explicit TLS connector for
    /// `wss://` URLs (see [`TransportConfig::websocket_connector`]).
    ///
    /// [`TransportConfig::websocket_connector`]: crate::TransportConfig::websocket_connector
    pub fn connect_with_tls(
        url: Url,
        reconnect: ReconnectConfig,
        tls: Option<Connector>,
        cancel: CancellationToken,
        events: broadcast::Sender<SocketEvent>,
    ) -> Self {
        let (outbound, outbound_rx) = mpsc::unbounded_channel();
        let (state_tx, state) = watch::channel(ConnectionState::Connecting);

        let task_events = events.clone();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            socket_loop(url, reconnect, tls, task_cancel, task_events, state_tx, outbound_rx).await;
        });

        Self {
            outbound,
            state,
            events,
            cancel,
        }
    }

    /// Serialize and transmit `message` if the connection is open.
    ///
    /// Returns `false` (and logs a warning) when it is not; the message is
    /// dropped, never buffered for a later connection.
    pub fn send(&self, message: &SocketMessage) -> bool {
        if !self.is_connected() {
            tracing::warn!(kind = %message.kind, "WebSocket not connected, dropping message");
            return false;
        }

        let text = match serde_json::to_string(message) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!(error = %e, kind = %message.kind, "failed to serialize message");
                return false;
            }
        };

        if self.outbound.send(text).is_err() {
            tracing::warn!(kind = %message.kind, "WebSocket loop has exited, dropping message");
            return false;
        }
        true
    }

    /// Whether the connection is currently open.
    pub fn is_connected(&self) -> bool {
        matches!(*self.state.borrow(), ConnectionState::Connected)
    }

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// A receiver that observes every state change.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Get a new broadcast receiver for the event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<SocketEvent> {
        self.events.subscribe()
    }

    /// Close the connection and suppress further reconnects.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

// ── Background reconnection loop ─────────────────────────────────────

/// How a single connection ended.
struct CloseInfo {
    code: Option<u16>,
    reason: String,
}

/// Main loop: connect → read/write → on close, wait → reconnect.
async fn socket_loop(
    url: Url,
    reconnect: ReconnectConfig,
    tls: Option<Connector>,
    cancel: CancellationToken,
    events: broadcast::Sender<SocketEvent>,
    state: watch::Sender<ConnectionState>,
    mut outbound: mpsc::UnboundedReceiver<String>,
) {
    let mut tracker = ReconnectTracker::new(reconnect);

    loop {
        let outcome = run_connection(
            &url,
            tls.as_ref(),
            &events,
            &state,
            &mut outbound,
            &mut tracker,
            &cancel,
        )
        .await;

        // Ignore send errors -- just means no active subscribers right now
        match outcome {
            Ok(close) => {
                let _ = events.send(SocketEvent::Close {
                    code: close.code,
                    reason: close.reason,
                });
            }
            Err(e) => {
                tracing::warn!(error = %e, attempt = tracker.attempts(), "WebSocket error");
                let _ = events.send(SocketEvent::Error(e.to_string()));
                let _ = events.send(SocketEvent::Close {
                    code: None,
                    reason: e.to_string(),
                });
            }
        }

        if cancel.is_cancelled() {
            tracker.suppress();
        }

        let Some(delay) = tracker.on_close() else {
            if cancel.is_cancelled() {
                state.send_replace(ConnectionState::Disconnected);
            } else {
                tracing::error!(
                    max_attempts = tracker.attempts(),
                    "WebSocket reconnection limit reached, giving up"
                );
                state.send_replace(ConnectionState::Failed {
                    attempts: tracker.attempts(),
                });
            }
            break;
        };

        let attempt = tracker.attempts();
        state.send_replace(ConnectionState::Reconnecting { attempt });
        tracing::info!(
            delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
            attempt,
            "Waiting before reconnect"
        );

        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                state.send_replace(ConnectionState::Disconnected);
                break;
            }
            () = tokio::time::sleep(delay) => {}
        }
    }

    tracing::debug!("WebSocket loop exiting");
}

// ── Single connection lifecycle ──────────────────────────────────────

/// Establish a single WebSocket connection and pump frames until it drops.
async fn run_connection(
    url: &Url,
    tls: Option<&Connector>,
    events: &broadcast::Sender<SocketEvent>,
    state: &watch::Sender<ConnectionState>,
    outbound: &mut mpsc::UnboundedReceiver<String>,
    tracker: &mut ReconnectTracker,
    cancel: &CancellationToken,
) -> Result<CloseInfo, Error> {
    tracing::info!(url = %redacted(url), "Connecting to WebSocket");

    let uri: tungstenite::http::Uri = url
        .as_str()
        .parse()
        .map_err(|e: tungstenite::http::uri::InvalidUri| Error::WebSocketConnect(e.to_string()))?;

    let connect = tokio_tungstenite::connect_async_tls_with_config(
        ClientRequestBuilder::new(uri),
        None,
        false,
        tls.cloned(),
    );
    let (ws_stream, _response) = tokio::select! {
        biased;
        () = cancel.cancelled() => {
            return Ok(CloseInfo { code: None, reason: "disconnected before open".into() });
        }
        result = connect => result.map_err(|e| Error::WebSocketConnect(e.to_string()))?,
    };

    tracker.on_open();
    // Frames queued against a previous connection are not replayed.
    while outbound.try_recv().is_ok() {}
    state.send_replace(ConnectionState::Connected);
    tracing::info!("WebSocket connected");
    let _ = events.send(SocketEvent::Open);

    let (mut write, mut read) = ws_stream.split();

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                // Frames accepted by `send` before the shutdown still go out.
                while let Ok(text) = outbound.try_recv() {
                    if write.send(tungstenite::Message::Text(text.into())).await.is_err() {
                        break;
                    }
                }
                if let Err(e) = write.send(tungstenite::Message::Close(None)).await {
                    tracing::debug!(error = %e, "failed to send close frame");
                }
                return Ok(CloseInfo { code: Some(1000), reason: "client disconnect".into() });
            }
            text = outbound.recv() => {
                let Some(text) = text else {
                    cancel.cancel();
                    let _ = write.send(tungstenite::Message::Close(None)).await;
                    return Ok(CloseInfo { code: Some(1000), reason: "handle dropped".into() });
                };
                write
                    .send(tungstenite::Message::Text(text.into()))
                    .await
                    .map_err(|e| Error::WebSocketConnect(e.to_string()))?;
            }
            frame = read.next() => {
                match frame {
                    Some(Ok(tungstenite::Message::Text(text))) => {
                        parse_and_broadcast(&text, events);
                    }
                    Some(Ok(tungstenite::Message::Ping(_))) => {
                        // tungstenite handles pong replies automatically
                        tracing::trace!("WebSocket ping");
                    }
                    Some(Ok(tungstenite::Message::Close(frame))) => {
                        let info = frame.map_or_else(
                            || CloseInfo { code: None, reason: String::new() },
                            |cf| CloseInfo { code: Some(u16::from(cf.code)), reason: cf.reason.as_str().to_owned() },
                        );
                        tracing::info!(code = ?info.code, reason = %info.reason, "WebSocket close frame received");
                        return Ok(info);
                    }
                    Some(Err(e)) => {
                        return Err(Error::WebSocketConnect(e.to_string()));
                    }
                    None => {
                        tracing::info!("WebSocket stream ended");
                        return Ok(CloseInfo { code: None, reason: "stream ended".into() });
                    }
                    _ => {
                        // Binary, Pong, Frame -- ignore
                    }
                }
            }
        }
    }
}

// ── Message parsing ──────────────────────────────────────────────────

/// Parse a text frame and broadcast it if it is a well-formed envelope.
fn parse_and_broadcast(text: &str, events: &broadcast::Sender<SocketEvent>) {
    match serde_json::from_str::<SocketMessage>(text) {
        Ok(message) => {
            tracing::trace!(kind = %message.kind, "WebSocket message");
            let _ = events.send(SocketEvent::Message(Arc::new(message)));
        }
        Err(e) => {
            tracing::debug!(error = %e, "Dropping malformed WebSocket frame");
        }
    }
}

/// The URL with its `token` query parameter masked, for logging.
fn redacted(url: &Url) -> Url {
    let mut masked = url.clone();
    if url.query_pairs().any(|(k, _)| k == "token") {
        let pairs: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| {
                let v = if k == "token" { "****".to_owned() } else { v.into_owned() };
                (k.into_owned(), v)
            })
            .collect();
        masked.query_pairs_mut().clear().extend_pairs(pairs);
    }
    masked
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn default_reconnect_config() {
        let config = ReconnectConfig::default();
        assert_eq!(config.delay, Duration::from_millis(3000));
        assert_eq!(config.max_attempts, 5);
        assert_eq!(config.backoff, Backoff::Fixed);
    }

    #[test]
    fn fixed_backoff_never_grows() {
        let config = ReconnectConfig::default();
        for attempt in 0..10 {
            assert_eq!(config.delay_for(attempt), Duration::from_secs(3));
        }
    }

    #[test]
    fn exponential_backoff_increases() {
        let config = ReconnectConfig {
            delay: Duration::from_secs(1),
            max_attempts: 10,
            backoff: Backoff::Exponential {
                max_delay: Duration::from_secs(30),
            },
        };

        let d0 = config.delay_for(0);
        let d1 = config.delay_for(1);
        let d2 = config.delay_for(2);

        assert!(d1 > d0, "d1 ({d1:?}) should be greater than d0 ({d0:?})");
        assert!(d2 > d1, "d2 ({d2:?}) should be greater than d1 ({d1:?})");
    }

    #[test]
    fn exponential_backoff_caps_at_max_delay() {
        let config = ReconnectConfig {
            delay: Duration::from_secs(1),
            max_attempts: 20,
            backoff: Backoff::Exponential {
                max_delay: Duration::from_secs(10),
            },
        };

        let d10 = config.delay_for(10);
        // With jitter factor up to 1.25, max effective is 12.5s
        assert!(d10 <= Duration::from_secs(13), "delay {d10:?} should be capped");
    }

    #[test]
    fn tracker_gives_up_after_ceiling() {
        let mut tracker = ReconnectTracker::new(ReconnectConfig::default());

        for expected in 1..=5 {
            assert_eq!(tracker.on_close(), Some(Duration::from_secs(3)));
            assert_eq!(tracker.attempts(), expected);
        }

        assert_eq!(tracker.on_close(), None);
        assert_eq!(tracker.on_close(), None);
        assert_eq!(tracker.attempts(), 5);
    }

    #[test]
    fn tracker_resets_on_open() {
        let mut tracker = ReconnectTracker::new(ReconnectConfig::default());

        for _ in 0..4 {
            assert!(tracker.on_close().is_some());
        }
        tracker.on_open();
        assert_eq!(tracker.attempts(), 0);

        for _ in 0..5 {
            assert!(tracker.on_close().is_some());
        }
        assert!(tracker.on_close().is_none());
    }

    #[test]
    fn suppressed_tracker_never_schedules() {
        let mut tracker = ReconnectTracker::new(ReconnectConfig::default());
        tracker.suppress();
        assert_eq!(tracker.on_close(), None);
        assert_eq!(tracker.attempts(), 0);
    }

    #[test]
    fn message_wire_format() {
        let msg = SocketMessage::new("usage_update", serde_json::json!({ "bytes": 1024 }));
        let text = serde_json::to_string(&msg).unwrap();
        assert_eq!(text, r#"{"type":"usage_update","data":{"bytes":1024}}"#);
    }

    #[test]
    fn message_without_data_defaults_to_null() {
        let msg: SocketMessage = serde_json::from_str(r#"{"type":"ping"}"#).unwrap();
        assert_eq!(msg.kind, "ping");
        assert!(msg.data.is_null());
    }

    #[test]
    fn parse_and_broadcast_valid_frame() {
        let (tx, mut rx) = broadcast::channel(16);

        parse_and_broadcast(r#"{"type":"payment_status","data":{"status":"paid"}}"#, &tx);

        let SocketEvent::Message(msg) = rx.try_recv().unwrap() else {
            panic!("expected a message event");
        };
        assert_eq!(msg.kind, "payment_status");
        assert_eq!(msg.data["status"], "paid");
    }

    #[test]
    fn parse_and_broadcast_malformed_json() {
        let (tx, mut rx) = broadcast::channel::<SocketEvent>(16);

        parse_and_broadcast("not json at all", &tx);
        parse_and_broadcast(r#"{"data":{"missing":"type"}}"#, &tx);

        // Should not panic, should just log and skip
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn redacted_masks_token() {
        let url = Url::parse("wss://portal.example.net/ws?token=secret&lang=en").unwrap();
        let masked = redacted(&url);
        assert!(!masked.as_str().contains("secret"));
        assert!(masked.as_str().contains("lang=en"));
    }
}
