// ── Offline action queue ──
//
// Durable FIFO of user-initiated mutations issued while the portal was
// unreachable. Actions are replayed strictly in enqueue order: a failing
// head blocks everything behind it until it succeeds or exhausts its
// retries. The whole queue is written to storage after every mutation.

use std::collections::VecDeque;
use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use zealnet_api::PortalClient;

use crate::connectivity::Connectivity;
use crate::error::CoreError;
use crate::storage::{KeyValueStore, OFFLINE_QUEUE_KEY, StorageError};

/// Attempts after which a failing action is abandoned.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const ABANDONED_CHANNEL_SIZE: usize = 64;

// ── QueuedAction ─────────────────────────────────────────────────

/// The mutations the queue knows how to replay.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
    strum::EnumIter,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ActionKind {
    Payment,
    PlanPurchase,
    ProfileUpdate,
}

/// A pending mutation awaiting network availability.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedAction {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: ActionKind,
    pub payload: serde_json::Value,
    /// Enqueue time, stored as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub retry_count: u32,
}

impl QueuedAction {
    pub fn new(kind: ActionKind, payload: serde_json::Value) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            kind,
            payload,
            timestamp: Utc::now(),
            retry_count: 0,
        }
    }
}

// ── Dispatch ─────────────────────────────────────────────────────

/// Delivers a queued action to the network.
pub trait ActionDispatcher: Send + Sync + 'static {
    fn dispatch(
        &self,
        action: &QueuedAction,
    ) -> impl Future<Output = Result<(), CoreError>> + Send;
}

impl<T: ActionDispatcher> ActionDispatcher for Arc<T> {
    fn dispatch(
        &self,
        action: &QueuedAction,
    ) -> impl Future<Output = Result<(), CoreError>> + Send {
        (**self).dispatch(action)
    }
}

/// Replays actions against the portal REST API.
#[derive(Debug, Clone)]
pub struct HttpDispatcher {
    client: PortalClient,
}

impl HttpDispatcher {
    pub fn new(client: PortalClient) -> Self {
        Self { client }
    }
}

impl ActionDispatcher for HttpDispatcher {
    async fn dispatch(&self, action: &QueuedAction) -> Result<(), CoreError> {
        match action.kind {
            ActionKind::Payment => self.client.submit_payment(&action.payload).await?,
            ActionKind::PlanPurchase => self.client.purchase_plan(&action.payload).await?,
            ActionKind::ProfileUpdate => self.client.update_profile(&action.payload).await?,
        }
        Ok(())
    }
}

// ── DrainReport ──────────────────────────────────────────────────

/// What a single [`OfflineQueue::process_queue`] call did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DrainReport {
    pub delivered: usize,
    pub abandoned: usize,
    /// Draining stopped at a head that failed but has retries left.
    pub halted: bool,
    /// Another drain was already running; this call did nothing.
    pub coalesced: bool,
}

// ── OfflineQueue ─────────────────────────────────────────────────

/// Durable, ordered, at-least-once queue of mutations.
///
/// Cheaply cloneable via `Arc`. One instance per store; two queues over
/// the same key would overwrite each other's state.
pub struct OfflineQueue<D> {
    inner: Arc<QueueInner<D>>,
}

impl<D> Clone for OfflineQueue<D> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct QueueInner<D> {
    store: Arc<dyn KeyValueStore>,
    dispatcher: D,
    connectivity: Connectivity,
    actions: Mutex<VecDeque<QueuedAction>>,
    draining: AtomicBool,
    max_retries: u32,
    abandoned: broadcast::Sender<Arc<QueuedAction>>,
}

/// Outcome of recording a failed delivery.
enum Failure {
    Retrying(u32),
    Abandoned(QueuedAction),
    /// The action was removed (e.g. `clear()`) while in flight.
    Gone,
}

/// Resets the drain flag however the drain loop exits.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl<D: ActionDispatcher> OfflineQueue<D> {
    /// Create a queue, restoring any actions persisted in `store`.
    ///
    /// A missing or unreadable stored queue starts empty.
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        dispatcher: D,
        connectivity: Connectivity,
        max_retries: u32,
    ) -> Self {
        let actions = load(store.as_ref());
        if !actions.is_empty() {
            info!(pending = actions.len(), "restored offline queue");
        }
        let (abandoned, _) = broadcast::channel(ABANDONED_CHANNEL_SIZE);

        Self {
            inner: Arc::new(QueueInner {
                store,
                dispatcher,
                connectivity,
                actions: Mutex::new(actions),
                draining: AtomicBool::new(false),
                max_retries: max_retries.max(1),
                abandoned,
            }),
        }
    }

    /// Append an action to the tail and persist the queue.
    ///
    /// If the portal is believed reachable a drain is started in the
    /// background. When persisting fails the action is not kept and the
    /// storage error is returned.
    pub fn add(
        &self,
        kind: ActionKind,
        payload: serde_json::Value,
    ) -> Result<QueuedAction, CoreError> {
        let action = QueuedAction::new(kind, payload);

        {
            let mut actions = self.actions();
            actions.push_back(action.clone());
            if let Err(e) = self.persist(&actions) {
                actions.pop_back();
                return Err(e.into());
            }
        }
        info!(action_id = %action.id, %kind, "queued offline action");

        if self.inner.connectivity.is_online() {
            match tokio::runtime::Handle::try_current() {
                Ok(runtime) => {
                    let queue = self.clone();
                    runtime.spawn(async move {
                        queue.process_queue().await;
                    });
                }
                Err(_) => debug!("no async runtime, deferring drain"),
            }
        }

        Ok(action)
    }

    /// Drain the queue from the head.
    ///
    /// Delivered actions are removed. A failed action has its retry count
    /// bumped; once it reaches the ceiling it is dropped and draining
    /// continues, otherwise draining halts. Concurrent calls are coalesced.
    pub async fn process_queue(&self) -> DrainReport {
        let mut report = DrainReport::default();
        let mut first_pass = true;

        loop {
            if self.inner.draining.swap(true, Ordering::AcqRel) {
                if first_pass {
                    debug!("offline queue drain already in progress");
                    report.coalesced = true;
                }
                return report;
            }
            {
                let _guard = DrainGuard(&self.inner.draining);
                self.drain_pass(&mut report).await;
            }

            // An `add` landing after the last empty head but before the flag
            // reset was coalesced into this drain and must not be stranded.
            if report.halted || self.is_empty() {
                return report;
            }
            first_pass = false;
        }
    }

    /// Deliver from the head until the queue is empty or a head halts.
    async fn drain_pass(&self, report: &mut DrainReport) {
        while let Some(action) = self.head() {
            debug!(action_id = %action.id, kind = %action.kind, "replaying offline action");

            match self.inner.dispatcher.dispatch(&action).await {
                Ok(()) => {
                    self.remove_delivered(&action.id);
                    report.delivered += 1;
                    info!(action_id = %action.id, kind = %action.kind, "offline action delivered");
                }
                Err(e) => match self.record_failure(&action.id) {
                    Failure::Retrying(retry_count) => {
                        if e.is_transient() {
                            warn!(
                                action_id = %action.id,
                                kind = %action.kind,
                                retry_count,
                                error = %e,
                                "portal unavailable, will retry offline action"
                            );
                        } else {
                            warn!(
                                action_id = %action.id,
                                kind = %action.kind,
                                retry_count,
                                error = %e,
                                "portal rejected offline action, will retry"
                            );
                        }
                        report.halted = true;
                        break;
                    }
                    Failure::Abandoned(dropped) => {
                        warn!(
                            action_id = %dropped.id,
                            kind = %dropped.kind,
                            retry_count = dropped.retry_count,
                            error = %e,
                            "offline action abandoned after max retries"
                        );
                        report.abandoned += 1;
                        let _ = self.inner.abandoned.send(Arc::new(dropped));
                    }
                    Failure::Gone => {
                        debug!(action_id = %action.id, "failed action was removed while in flight");
                    }
                },
            }
        }
    }

    /// Drain on every offline → online transition until `cancel` fires.
    pub fn spawn_online_listener(&self, cancel: CancellationToken) -> JoinHandle<()> {
        let queue = self.clone();
        let mut online = self.inner.connectivity.subscribe();

        tokio::spawn(async move {
            let mut was_online = *online.borrow_and_update();
            loop {
                tokio::select! {
                    biased;
                    () = cancel.cancelled() => break,
                    changed = online.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let now_online = *online.borrow_and_update();
                        if now_online && !was_online {
                            info!(pending = queue.len(), "back online, draining offline queue");
                            let report = queue.process_queue().await;
                            debug!(?report, "online drain finished");
                        }
                        was_online = now_online;
                    }
                }
            }
        })
    }

    // ── Introspection ────────────────────────────────────────────

    pub fn len(&self) -> usize {
        self.actions().len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions().is_empty()
    }

    /// Ordered copy of the pending actions.
    pub fn snapshot(&self) -> Vec<QueuedAction> {
        self.actions().iter().cloned().collect()
    }

    /// Drop every pending action.
    pub fn clear(&self) -> Result<(), CoreError> {
        let mut actions = self.actions();
        let dropped = actions.len();
        actions.clear();
        self.persist(&actions)?;
        info!(dropped, "offline queue cleared");
        Ok(())
    }

    /// Receive every action dropped after exhausting its retries.
    pub fn subscribe_abandoned(&self) -> broadcast::Receiver<Arc<QueuedAction>> {
        self.inner.abandoned.subscribe()
    }

    pub fn max_retries(&self) -> u32 {
        self.inner.max_retries
    }

    // ── Internals ────────────────────────────────────────────────

    fn actions(&self) -> MutexGuard<'_, VecDeque<QueuedAction>> {
        self.inner
            .actions
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn head(&self) -> Option<QueuedAction> {
        self.actions().front().cloned()
    }

    fn persist(&self, actions: &VecDeque<QueuedAction>) -> Result<(), StorageError> {
        let encoded = serde_json::to_string(actions).map_err(|source| StorageError::Encode {
            key: OFFLINE_QUEUE_KEY.into(),
            source,
        })?;
        self.inner.store.set(OFFLINE_QUEUE_KEY, &encoded)
    }

    fn persist_or_warn(&self, actions: &VecDeque<QueuedAction>) {
        if let Err(e) = self.persist(actions) {
            warn!(error = %e, "failed to persist offline queue");
        }
    }

    fn remove_delivered(&self, id: &str) {
        let mut actions = self.actions();
        if let Some(pos) = actions.iter().position(|a| a.id == id) {
            actions.remove(pos);
            self.persist_or_warn(&actions);
        }
    }

    fn record_failure(&self, id: &str) -> Failure {
        let mut actions = self.actions();
        let Some(pos) = actions.iter().position(|a| a.id == id) else {
            return Failure::Gone;
        };

        let retry_count = {
            let Some(action) = actions.get_mut(pos) else {
                return Failure::Gone;
            };
            action.retry_count += 1;
            action.retry_count
        };

        let outcome = if retry_count >= self.inner.max_retries {
            actions.remove(pos).map_or(Failure::Gone, Failure::Abandoned)
        } else {
            Failure::Retrying(retry_count)
        };
        self.persist_or_warn(&actions);
        outcome
    }
}

fn load(store: &dyn KeyValueStore) -> VecDeque<QueuedAction> {
    let raw = match store.get(OFFLINE_QUEUE_KEY) {
        Ok(Some(raw)) => raw,
        Ok(None) => return VecDeque::new(),
        Err(e) => {
            warn!(error = %e, "failed to read stored offline queue, starting empty");
            return VecDeque::new();
        }
    };

    match serde_json::from_str::<VecDeque<QueuedAction>>(&raw) {
        Ok(actions) => actions,
        Err(e) => {
            warn!(error = %e, "stored offline queue is corrupt, starting empty");
            VecDeque::new()
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::HashMap;
    use std::time::Duration;

    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tokio::sync::Notify;

    use super::*;
    use crate::storage::MemoryStore;

    /// Records every dispatch and fails payload `n` a scripted number of times.
    #[derive(Default)]
    struct ScriptedDispatcher {
        calls: Mutex<Vec<i64>>,
        failures: Mutex<HashMap<i64, u32>>,
    }

    impl ScriptedDispatcher {
        fn failing(n: i64, times: u32) -> Self {
            let dispatcher = Self::default();
            dispatcher.failures.lock().unwrap().insert(n, times);
            dispatcher
        }

        fn calls(&self) -> Vec<i64> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl ActionDispatcher for ScriptedDispatcher {
        async fn dispatch(&self, action: &QueuedAction) -> Result<(), CoreError> {
            let n = action.payload["n"].as_i64().unwrap();
            self.calls.lock().unwrap().push(n);

            let mut failures = self.failures.lock().unwrap();
            match failures.get_mut(&n) {
                Some(left) if *left > 0 => {
                    *left -= 1;
                    Err(CoreError::Rejected {
                        status: 503,
                        message: "unavailable".into(),
                    })
                }
                _ => Ok(()),
            }
        }
    }

    /// Blocks every dispatch until released.
    struct GatedDispatcher {
        entered: Notify,
        release: Notify,
    }

    impl ActionDispatcher for GatedDispatcher {
        async fn dispatch(&self, _action: &QueuedAction) -> Result<(), CoreError> {
            self.entered.notify_one();
            self.release.notified().await;
            Ok(())
        }
    }

    fn offline_queue<D: ActionDispatcher>(
        store: Arc<dyn KeyValueStore>,
        dispatcher: D,
    ) -> OfflineQueue<D> {
        OfflineQueue::new(store, dispatcher, Connectivity::new(false), DEFAULT_MAX_RETRIES)
    }

    fn payload(n: i64) -> serde_json::Value {
        json!({ "n": n })
    }

    async fn wait_until_empty<D: ActionDispatcher>(queue: &OfflineQueue<D>) {
        tokio::time::timeout(Duration::from_secs(5), async {
            while !queue.is_empty() {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap();
    }

    #[test]
    fn wire_format_matches_stored_queue() {
        let raw = r#"[{"id":"a1","type":"plan_purchase","payload":{"plan":"daily"},"timestamp":1700000000000,"retryCount":2}]"#;
        let actions: Vec<QueuedAction> = serde_json::from_str(raw).unwrap();

        assert_eq!(actions.len(), 1);
        assert_eq!(actions[0].kind, ActionKind::PlanPurchase);
        assert_eq!(actions[0].retry_count, 2);
        assert_eq!(actions[0].timestamp.timestamp_millis(), 1_700_000_000_000);
        assert_eq!(serde_json::to_string(&actions).unwrap(), raw);
    }

    #[test]
    fn action_kind_parses_from_cli_form() {
        assert_eq!("profile_update".parse::<ActionKind>().unwrap(), ActionKind::ProfileUpdate);
        assert_eq!(ActionKind::Payment.to_string(), "payment");
        assert!("refund".parse::<ActionKind>().is_err());
    }

    #[tokio::test]
    async fn drains_in_enqueue_order() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let queue = offline_queue(Arc::new(MemoryStore::new()), Arc::clone(&dispatcher));

        for n in 1..=4 {
            queue.add(ActionKind::Payment, payload(n)).unwrap();
        }
        assert_eq!(queue.len(), 4);
        assert!(dispatcher.calls().is_empty(), "nothing dispatched while offline");

        let report = queue.process_queue().await;

        assert_eq!(report.delivered, 4);
        assert!(!report.halted);
        assert_eq!(dispatcher.calls(), vec![1, 2, 3, 4]);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn fails_twice_then_succeeds() {
        let dispatcher = Arc::new(ScriptedDispatcher::failing(1, 2));
        let queue = offline_queue(Arc::new(MemoryStore::new()), Arc::clone(&dispatcher));
        queue.add(ActionKind::PlanPurchase, payload(1)).unwrap();

        let first = queue.process_queue().await;
        assert!(first.halted);
        assert_eq!(queue.snapshot()[0].retry_count, 1);

        let second = queue.process_queue().await;
        assert!(second.halted);
        assert_eq!(queue.snapshot()[0].retry_count, 2);

        let third = queue.process_queue().await;
        assert_eq!(third.delivered, 1);
        assert!(queue.is_empty());

        queue.process_queue().await;
        assert_eq!(dispatcher.calls(), vec![1, 1, 1]);
    }

    #[tokio::test]
    async fn head_of_line_blocks_until_abandoned() {
        let dispatcher = Arc::new(ScriptedDispatcher::failing(1, u32::MAX));
        let queue = offline_queue(Arc::new(MemoryStore::new()), Arc::clone(&dispatcher));
        let mut abandoned = queue.subscribe_abandoned();

        queue.add(ActionKind::Payment, payload(1)).unwrap();
        queue.add(ActionKind::ProfileUpdate, payload(2)).unwrap();

        queue.process_queue().await;
        queue.process_queue().await;
        assert_eq!(dispatcher.calls(), vec![1, 1], "action 2 must wait behind action 1");

        let report = queue.process_queue().await;
        assert_eq!(report.abandoned, 1);
        assert_eq!(report.delivered, 1);
        assert!(!report.halted);
        assert_eq!(dispatcher.calls(), vec![1, 1, 1, 2]);
        assert!(queue.is_empty());

        let dropped = abandoned.try_recv().unwrap();
        assert_eq!(dropped.payload, payload(1));
        assert_eq!(dropped.retry_count, 3);
    }

    #[tokio::test]
    async fn restores_identical_queue_after_restart() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let first = offline_queue(Arc::clone(&store), ScriptedDispatcher::failing(1, 1));

        first.add(ActionKind::Payment, payload(1)).unwrap();
        first.add(ActionKind::PlanPurchase, payload(2)).unwrap();
        first.add(ActionKind::ProfileUpdate, payload(3)).unwrap();
        first.process_queue().await;
        let before = first.snapshot();
        assert_eq!(before[0].retry_count, 1);
        drop(first);

        let restarted = offline_queue(store, ScriptedDispatcher::default());
        assert_eq!(restarted.snapshot(), before);
    }

    #[tokio::test]
    async fn corrupt_storage_loads_empty() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        store.set(OFFLINE_QUEUE_KEY, "{{{ definitely not json").unwrap();

        let queue = offline_queue(store, ScriptedDispatcher::default());
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn concurrent_drains_are_coalesced() {
        let dispatcher = Arc::new(GatedDispatcher {
            entered: Notify::new(),
            release: Notify::new(),
        });
        let queue = offline_queue(Arc::new(MemoryStore::new()), Arc::clone(&dispatcher));
        queue.add(ActionKind::Payment, payload(1)).unwrap();

        let running = tokio::spawn({
            let queue = queue.clone();
            async move { queue.process_queue().await }
        });
        dispatcher.entered.notified().await;

        let second = queue.process_queue().await;
        assert!(second.coalesced);
        assert_eq!(second.delivered, 0);

        dispatcher.release.notify_one();
        let first = running.await.unwrap();
        assert_eq!(first.delivered, 1);
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn add_while_online_drains_immediately() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let queue = OfflineQueue::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&dispatcher),
            Connectivity::new(true),
            DEFAULT_MAX_RETRIES,
        );

        queue.add(ActionKind::Payment, payload(9)).unwrap();
        wait_until_empty(&queue).await;
        assert_eq!(dispatcher.calls(), vec![9]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn racing_online_adds_are_never_stranded() {
        for _ in 0..200 {
            let dispatcher = Arc::new(ScriptedDispatcher::default());
            let queue = OfflineQueue::new(
                Arc::new(MemoryStore::new()),
                Arc::clone(&dispatcher),
                Connectivity::new(true),
                DEFAULT_MAX_RETRIES,
            );

            let adders: Vec<_> = (0..4)
                .map(|n| {
                    let queue = queue.clone();
                    tokio::spawn(async move {
                        queue.add(ActionKind::Payment, payload(n)).unwrap();
                    })
                })
                .collect();
            for adder in adders {
                adder.await.unwrap();
            }

            wait_until_empty(&queue).await;
            assert_eq!(dispatcher.calls().len(), 4);
        }
    }

    #[tokio::test]
    async fn online_transition_triggers_drain() {
        let dispatcher = Arc::new(ScriptedDispatcher::default());
        let connectivity = Connectivity::new(false);
        let queue = OfflineQueue::new(
            Arc::new(MemoryStore::new()),
            Arc::clone(&dispatcher),
            connectivity.clone(),
            DEFAULT_MAX_RETRIES,
        );
        let cancel = CancellationToken::new();
        let listener = queue.spawn_online_listener(cancel.clone());

        for n in [5, 6, 7] {
            queue.add(ActionKind::Payment, payload(n)).unwrap();
        }
        tokio::task::yield_now().await;
        assert!(dispatcher.calls().is_empty());

        connectivity.set_online(true);
        wait_until_empty(&queue).await;
        assert_eq!(dispatcher.calls(), vec![5, 6, 7]);

        cancel.cancel();
        listener.await.unwrap();
    }

    #[tokio::test]
    async fn failed_persist_rolls_back_add() {
        struct ReadOnlyStore;

        impl KeyValueStore for ReadOnlyStore {
            fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
                Ok(None)
            }
            fn set(&self, key: &str, _value: &str) -> Result<(), StorageError> {
                Err(StorageError::Io {
                    key: key.into(),
                    source: std::io::Error::other("read-only"),
                })
            }
            fn remove(&self, _key: &str) -> Result<(), StorageError> {
                Ok(())
            }
        }

        let queue = offline_queue(Arc::new(ReadOnlyStore), ScriptedDispatcher::default());
        let result = queue.add(ActionKind::Payment, payload(1));

        assert!(matches!(result, Err(CoreError::Storage(_))));
        assert!(queue.is_empty());
    }

    #[tokio::test]
    async fn clear_empties_and_persists() {
        let store: Arc<dyn KeyValueStore> = Arc::new(MemoryStore::new());
        let queue = offline_queue(Arc::clone(&store), ScriptedDispatcher::default());
        queue.add(ActionKind::Payment, payload(1)).unwrap();

        queue.clear().unwrap();

        assert!(queue.is_empty());
        assert_eq!(store.get(OFFLINE_QUEUE_KEY).unwrap().as_deref(), Some("[]"));
    }
}
