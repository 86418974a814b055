// ── Portal composition root ──
//
// Owns exactly one of each client utility for a portal deployment: the
// durable store, the connectivity monitor, the offline queue and the
// socket client. Background work (online listener, health probe, socket
// loop) runs on child tokens of the portal's cancellation token.

use std::sync::{Arc, Mutex, PoisonError};

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use zealnet_api::PortalClient;

use crate::config::PortalConfig;
use crate::connectivity::{Connectivity, probe_task};
use crate::error::CoreError;
use crate::queue::{HttpDispatcher, OfflineQueue};
use crate::socket::SocketClient;
use crate::storage::{FileStore, KeyValueStore, MemoryStore, read_auth_token};

/// The offline queue as wired by [`Portal`].
pub type PortalQueue = OfflineQueue<HttpDispatcher>;

/// Cheaply cloneable handle to one portal deployment.
#[derive(Clone)]
pub struct Portal {
    inner: Arc<PortalInner>,
}

struct PortalInner {
    config: PortalConfig,
    store: Arc<dyn KeyValueStore>,
    client: PortalClient,
    connectivity: Connectivity,
    queue: PortalQueue,
    socket: SocketClient,
    cancel: CancellationToken,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Portal {
    /// Build from config, opening a file store in `data_dir` if one is set.
    pub fn new(config: PortalConfig) -> Result<Self, CoreError> {
        let store: Arc<dyn KeyValueStore> = match &config.data_dir {
            Some(dir) => Arc::new(FileStore::open(dir)?),
            None => Arc::new(MemoryStore::new()),
        };
        Self::with_store(config, store)
    }

    /// Build around an existing store.
    ///
    /// The REST client picks up the auth token present in the store now;
    /// a token stored later is used by the socket on its next `connect`
    /// but requires a new `Portal` for queue replays.
    pub fn with_store(config: PortalConfig, store: Arc<dyn KeyValueStore>) -> Result<Self, CoreError> {
        let token = read_auth_token(store.as_ref())?;
        let transport = config.transport();
        let client = PortalClient::new(config.api_url.clone(), &transport, token.as_ref())?;

        let connectivity = Connectivity::new(config.start_online);
        let queue = OfflineQueue::new(
            Arc::clone(&store),
            HttpDispatcher::new(client.clone()),
            connectivity.clone(),
            config.max_retries,
        );

        let cancel = CancellationToken::new();
        let socket = SocketClient::new(
            config.resolved_socket_url()?,
            config.reconnect.clone(),
            Arc::clone(&store),
            cancel.child_token(),
        )
        .with_tls(transport.websocket_connector()?);

        debug!(api_url = %config.api_url, "portal constructed");
        Ok(Self {
            inner: Arc::new(PortalInner {
                config,
                store,
                client,
                connectivity,
                queue,
                socket,
                cancel,
                tasks: Mutex::new(Vec::new()),
            }),
        })
    }

    /// Start background work: the queue's online listener and, if
    /// configured, the health probe. Must be called within a tokio runtime.
    pub fn start(&self) {
        let mut tasks = self.tasks();
        if !tasks.is_empty() {
            debug!("portal already started");
            return;
        }

        tasks.push(
            self.inner
                .queue
                .spawn_online_listener(self.inner.cancel.child_token()),
        );

        if let Some(period) = self.inner.config.probe_interval {
            tasks.push(tokio::spawn(probe_task(
                self.inner.client.clone(),
                self.inner.connectivity.clone(),
                period,
                self.inner.cancel.child_token(),
            )));
        }

        info!(
            api_url = %self.inner.config.api_url,
            pending = self.inner.queue.len(),
            probe = self.inner.config.probe_interval.is_some(),
            "portal started"
        );
    }

    /// Stop the socket and every background task.
    ///
    /// A queue drain in progress is allowed to finish its current request.
    pub async fn shutdown(&self) {
        self.inner.socket.disconnect();
        self.inner.cancel.cancel();

        let handles: Vec<JoinHandle<()>> = self.tasks().drain(..).collect();
        for handle in handles {
            let _ = handle.await;
        }
        info!("portal shut down");
    }

    // ── Accessors ────────────────────────────────────────────────

    pub fn config(&self) -> &PortalConfig {
        &self.inner.config
    }

    pub fn store(&self) -> &Arc<dyn KeyValueStore> {
        &self.inner.store
    }

    pub fn client(&self) -> &PortalClient {
        &self.inner.client
    }

    pub fn connectivity(&self) -> &Connectivity {
        &self.inner.connectivity
    }

    pub fn queue(&self) -> &PortalQueue {
        &self.inner.queue
    }

    pub fn socket(&self) -> &SocketClient {
        &self.inner.socket
    }

    fn tasks(&self) -> std::sync::MutexGuard<'_, Vec<JoinHandle<()>>> {
        self.inner.tasks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Portal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Portal")
            .field("api_url", &self.inner.config.api_url.as_str())
            .field("online", &self.inner.connectivity.is_online())
            .field("pending", &self.inner.queue.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use url::Url;

    use super::*;
    use crate::config::TlsVerification;
    use crate::queue::ActionKind;

    fn config() -> PortalConfig {
        let mut config = PortalConfig::new(Url::parse("http://127.0.0.1:9").unwrap());
        config.start_online = false;
        config
    }

    #[tokio::test]
    async fn in_memory_when_no_data_dir() {
        let portal = Portal::new(config()).unwrap();

        portal
            .queue()
            .add(ActionKind::ProfileUpdate, serde_json::json!({"name": "Ada"}))
            .unwrap();
        assert_eq!(portal.queue().len(), 1);
        assert!(!portal.connectivity().is_online());
        assert_eq!(portal.socket().default_url().as_str(), "ws://127.0.0.1:9/ws");
    }

    #[tokio::test]
    async fn tls_settings_reach_rest_and_socket() {
        let mut insecure = config();
        insecure.api_url = Url::parse("https://portal.lab.internal").unwrap();
        insecure.tls = TlsVerification::DangerAcceptInvalid;
        let portal = Portal::new(insecure).unwrap();
        assert_eq!(portal.socket().default_url().scheme(), "wss");

        let mut bad_ca = config();
        bad_ca.tls = TlsVerification::CustomCa("/nonexistent/zealnet-ca.pem".into());
        assert!(matches!(
            Portal::new(bad_ca),
            Err(CoreError::ConnectionFailed { .. })
        ));
    }

    #[tokio::test]
    async fn file_store_survives_new_portal() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = config();
        config.data_dir = Some(dir.path().to_path_buf());

        let first = Portal::new(config.clone()).unwrap();
        first
            .queue()
            .add(ActionKind::Payment, serde_json::json!({"amount": 500}))
            .unwrap();
        let before = first.queue().snapshot();
        drop(first);

        let second = Portal::new(config).unwrap();
        assert_eq!(second.queue().snapshot(), before);
    }

    #[tokio::test]
    async fn start_then_shutdown_joins_tasks() {
        let mut config = config();
        config.probe_interval = Some(Duration::from_millis(50));
        let portal = Portal::new(config).unwrap();

        portal.start();
        portal.start();
        assert_eq!(portal.tasks().len(), 2);

        tokio::time::timeout(Duration::from_secs(5), portal.shutdown())
            .await
            .unwrap();
        assert!(portal.tasks().is_empty());
    }
}
