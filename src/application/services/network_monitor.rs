use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::application::services::sync_queue::{DrainOutcome, DrainReport, SyncQueue};
use crate::domain::value_objects::ConnectivityState;
use crate::shared::error::Result;

/// Connectivity and sync state as the host UI observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkStatus {
    pub is_online: bool,
    pub is_syncing: bool,
    pub pending_changes: u64,
}

/// Two-state connectivity machine fed by platform signals.
///
/// The offline-to-online edge triggers exactly one queue drain; repeated
/// signals for the state already held are no-ops, and overlapping drain
/// requests coalesce into the one in flight.
pub struct NetworkMonitor {
    queue: Arc<SyncQueue>,
    online: AtomicBool,
    drain_on_reconnect: bool,
    status_tx: watch::Sender<NetworkStatus>,
}

impl NetworkMonitor {
    pub fn new(
        queue: Arc<SyncQueue>,
        initial: ConnectivityState,
        drain_on_reconnect: bool,
    ) -> Self {
        let (status_tx, _) = watch::channel(NetworkStatus {
            is_online: initial.is_online(),
            is_syncing: false,
            pending_changes: 0,
        });
        Self {
            queue,
            online: AtomicBool::new(initial.is_online()),
            drain_on_reconnect,
            status_tx,
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Current status snapshot.
    pub fn status(&self) -> NetworkStatus {
        *self.status_tx.borrow()
    }

    /// Subscription over status changes for the host UI.
    pub fn watch(&self) -> watch::Receiver<NetworkStatus> {
        self.status_tx.subscribe()
    }

    /// Platform signal: connectivity regained.
    pub async fn handle_online(&self) {
        if self.online.swap(true, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Connectivity regained");
        self.publish(|status| status.is_online = true);
        if self.drain_on_reconnect {
            if let Err(err) = self.run_drain().await {
                tracing::error!("Reconnect drain failed: {}", err);
            }
        }
    }

    /// Platform signal: connectivity lost. Mutations take the offline path
    /// from here on; the queue is left alone.
    pub fn handle_offline(&self) {
        if !self.online.swap(false, Ordering::SeqCst) {
            return;
        }
        tracing::info!("Connectivity lost");
        self.publish(|status| status.is_online = false);
    }

    /// User-initiated drain. A no-op while offline or while a drain is
    /// already running; returns the report when a pass actually ran.
    pub async fn sync_now(&self) -> Result<Option<DrainReport>> {
        if !self.is_online() {
            tracing::debug!("Manual sync skipped while offline");
            return Ok(None);
        }
        self.run_drain().await
    }

    /// Recounts the queue and publishes the result.
    pub async fn refresh_pending(&self) -> u64 {
        let pending = match self.queue.pending_count().await {
            Ok(count) => count,
            Err(err) => {
                tracing::warn!("Could not recount the sync queue: {}", err);
                self.status().pending_changes
            }
        };
        self.publish(|status| status.pending_changes = pending);
        pending
    }

    async fn run_drain(&self) -> Result<Option<DrainReport>> {
        self.publish(|status| status.is_syncing = true);
        let outcome = self.queue.drain().await;
        match &outcome {
            // The in-flight drain still owns the syncing flag.
            Ok(DrainOutcome::AlreadyRunning) => {}
            _ => self.publish(|status| status.is_syncing = false),
        }
        let report = match outcome {
            Ok(DrainOutcome::Completed(report)) => Some(report),
            Ok(DrainOutcome::AlreadyRunning) => None,
            Err(err) => {
                self.refresh_pending().await;
                return Err(err);
            }
        };
        self.refresh_pending().await;
        Ok(report)
    }

    fn publish<F: FnOnce(&mut NetworkStatus)>(&self, apply: F) {
        self.status_tx.send_modify(apply);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::LocalStore;
    use crate::domain::entities::{QueueEntry, QueueOperation, Record};
    use crate::domain::schema::StoreSchema;
    use crate::domain::value_objects::{ActorId, CollectionName, RecordId};
    use crate::infrastructure::{MemoryRemoteStore, SqliteLocalStore};
    use crate::shared::config::AppConfig;
    use serde_json::json;

    async fn harness(
        initial: ConnectivityState,
    ) -> (Arc<SqliteLocalStore>, Arc<MemoryRemoteStore>, NetworkMonitor) {
        let config = AppConfig::in_memory();
        let local =
            Arc::new(SqliteLocalStore::open(config.database, StoreSchema::invoicing()).await);
        let remote = Arc::new(MemoryRemoteStore::new());
        let queue = Arc::new(SyncQueue::new(local.clone(), remote.clone()));
        let monitor = NetworkMonitor::new(queue, initial, true);
        (local, remote, monitor)
    }

    fn fields(value: serde_json::Value) -> crate::domain::entities::FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn delete_entry(collection: &CollectionName, id: &str) -> QueueEntry {
        QueueEntry::new(
            collection.clone(),
            QueueOperation::Delete {
                id: RecordId::parse(id).expect("id"),
            },
            ActorId::parse("seller-1").expect("actor"),
        )
    }

    #[tokio::test]
    async fn reconnect_edge_drains_the_queue_once() {
        let (local, remote, monitor) = harness(ConnectivityState::Offline).await;
        let clients = CollectionName::parse("clients").expect("collection");
        remote
            .seed(
                &clients,
                Record::new(
                    RecordId::parse("c-1").expect("id"),
                    fields(json!({ "name": "Globex" })),
                ),
            )
            .await;
        local
            .enqueue(&delete_entry(&clients, "c-1"))
            .await
            .expect("enqueue");
        monitor.refresh_pending().await;
        assert_eq!(monitor.status().pending_changes, 1);

        monitor.handle_online().await;

        let status = monitor.status();
        assert!(status.is_online);
        assert!(!status.is_syncing);
        assert_eq!(status.pending_changes, 0);
        assert_eq!(remote.record_count(&clients).await, 0);

        // Same-state signal: queued work is not drained again.
        local
            .enqueue(&delete_entry(&clients, "c-2"))
            .await
            .expect("enqueue");
        monitor.handle_online().await;
        assert_eq!(local.pending_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn manual_sync_is_a_no_op_while_offline() {
        let (local, _remote, monitor) = harness(ConnectivityState::Offline).await;
        let clients = CollectionName::parse("clients").expect("collection");
        local
            .enqueue(&delete_entry(&clients, "c-1"))
            .await
            .expect("enqueue");

        let report = monitor.sync_now().await.expect("sync");
        assert!(report.is_none());
        assert_eq!(local.pending_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn manual_sync_reports_the_pass_while_online() {
        let (local, remote, monitor) = harness(ConnectivityState::Online).await;
        let clients = CollectionName::parse("clients").expect("collection");
        remote
            .seed(
                &clients,
                Record::new(
                    RecordId::parse("c-1").expect("id"),
                    fields(json!({ "name": "Globex" })),
                ),
            )
            .await;
        local
            .enqueue(&delete_entry(&clients, "c-1"))
            .await
            .expect("enqueue");

        let report = monitor.sync_now().await.expect("sync").expect("ran");
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 0);
        assert_eq!(monitor.status().pending_changes, 0);
    }

    #[tokio::test]
    async fn offline_signal_flips_state_without_touching_the_queue() {
        let (local, _remote, monitor) = harness(ConnectivityState::Online).await;
        let clients = CollectionName::parse("clients").expect("collection");
        local
            .enqueue(&delete_entry(&clients, "c-1"))
            .await
            .expect("enqueue");

        monitor.handle_offline();
        assert!(!monitor.status().is_online);
        assert_eq!(local.pending_count().await.expect("count"), 1);

        // Repeated offline signals stay no-ops.
        monitor.handle_offline();
        assert!(!monitor.status().is_online);
    }

    #[tokio::test]
    async fn watch_receives_status_transitions() {
        let (_local, _remote, monitor) = harness(ConnectivityState::Online).await;
        let mut rx = monitor.watch();

        monitor.handle_offline();
        rx.changed().await.expect("change");
        assert!(!rx.borrow().is_online);
    }
}
