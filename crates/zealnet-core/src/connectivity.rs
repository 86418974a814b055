// ── Connectivity monitor ──
//
// Tracks whether the portal is believed reachable. Consumers subscribe to
// the watch channel to react to offline → online transitions; the state
// is fed either by the application (`set_online`) or by the health probe.

use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use zealnet_api::PortalClient;

/// Shared online/offline flag. Cheaply cloneable.
#[derive(Debug, Clone)]
pub struct Connectivity {
    online: watch::Sender<bool>,
}

impl Connectivity {
    pub fn new(initially_online: bool) -> Self {
        let (online, _) = watch::channel(initially_online);
        Self { online }
    }

    pub fn is_online(&self) -> bool {
        *self.online.borrow()
    }

    /// Report the current reachability. Subscribers are only woken on an
    /// actual change.
    pub fn set_online(&self, online: bool) {
        let changed = self.online.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });
        if changed {
            info!(online, "connectivity changed");
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.online.subscribe()
    }
}

impl Default for Connectivity {
    fn default() -> Self {
        Self::new(true)
    }
}

/// Periodically probe the portal health endpoint and feed the result into
/// `connectivity`. Any HTTP answer counts as online.
pub async fn probe_task(
    client: PortalClient,
    connectivity: Connectivity,
    period: Duration,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(period);
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                match client.probe().await {
                    Ok(status) => {
                        debug!(status, "portal probe answered");
                        connectivity.set_online(true);
                    }
                    Err(e) => {
                        debug!(error = %e, "portal probe failed");
                        connectivity.set_online(false);
                    }
                }
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn set_online_only_notifies_on_change() {
        let connectivity = Connectivity::new(false);
        let mut rx = connectivity.subscribe();

        connectivity.set_online(false);
        assert!(!rx.has_changed().unwrap());

        connectivity.set_online(true);
        assert!(rx.has_changed().unwrap());
        assert!(*rx.borrow_and_update());
        assert!(connectivity.is_online());
    }

    #[tokio::test]
    async fn probe_marks_unreachable_portal_offline() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let base = url::Url::parse(&format!("http://{}", listener.local_addr().unwrap())).unwrap();
        drop(listener);

        let client = PortalClient::with_client(reqwest::Client::new(), base);
        let connectivity = Connectivity::new(true);
        let mut rx = connectivity.subscribe();
        let cancel = CancellationToken::new();

        let task = tokio::spawn(probe_task(
            client,
            connectivity.clone(),
            Duration::from_millis(20),
            cancel.clone(),
        ));

        tokio::time::timeout(Duration::from_secs(5), rx.wait_for(|online| !*online))
            .await
            .unwrap()
            .unwrap();
        cancel.cancel();
        task.await.unwrap();
    }
}
