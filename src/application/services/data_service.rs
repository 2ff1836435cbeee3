use std::sync::{Arc, Mutex};

use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::application::mappers::records::{from_record, from_records, to_fields};
use crate::application::mappers::timestamps::{normalize_record, normalize_records};
use crate::application::ports::{EqualityFilter, LocalStore, RemoteStore, SnapshotStream};
use crate::application::services::network_monitor::NetworkMonitor;
use crate::application::services::sync_queue::SyncQueue;
use crate::domain::entities::{FieldMap, QueueEntry, QueueOperation, Record};
use crate::domain::schema::{CollectionModel, CollectionSpec, StoreSchema, TENANT_FIELD};
use crate::domain::value_objects::{ActorId, CollectionName, RecordId, TenantId};
use crate::shared::error::{AppError, Result};

type SnapshotCallback = Box<dyn Fn(Vec<Record>) + Send + 'static>;
type CallbackSlot = Arc<Mutex<Option<SnapshotCallback>>>;

/// Handle over a live collection feed.
///
/// Dropping the handle cancels delivery. `cancel` blocks until a callback
/// already in flight returns, so after it the callback never runs again.
pub struct Subscription {
    callback: CallbackSlot,
    task: Option<JoinHandle<()>>,
}

impl Subscription {
    pub fn cancel(&self) {
        if let Ok(mut slot) = self.callback.lock() {
            slot.take();
        }
        if let Some(task) = &self.task {
            task.abort();
        }
    }

    /// Whether a live remote feed backs this subscription. False for the
    /// one-shot cache delivery handed out while offline.
    pub fn is_live(&self) -> bool {
        self.task.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

fn deliver(slot: &CallbackSlot, records: Vec<Record>) {
    if let Ok(guard) = slot.lock() {
        if let Some(callback) = guard.as_ref() {
            callback(records);
        }
    }
}

fn collection_of<T: CollectionModel>() -> CollectionName {
    CollectionName::from_static(T::COLLECTION)
}

/// The single CRUD entry point every entity service composes over.
///
/// Remote first while the monitor believes the app is online, with the local
/// store as an eventually consistent cache. Any remote failure, not just an
/// explicit offline state, degrades to the offline path: connectivity is a
/// guess, so every mutating failure branch still caches locally and queues
/// the change for replay. Reads never fail over the remote; they fall back
/// to the cache and return what it has.
pub struct DataService {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    queue: Arc<SyncQueue>,
    monitor: Arc<NetworkMonitor>,
    schema: StoreSchema,
}

impl DataService {
    pub fn new(
        local: Arc<dyn LocalStore>,
        remote: Arc<dyn RemoteStore>,
        queue: Arc<SyncQueue>,
        monitor: Arc<NetworkMonitor>,
        schema: StoreSchema,
    ) -> Self {
        Self {
            local,
            remote,
            queue,
            monitor,
            schema,
        }
    }

    pub async fn get(&self, collection: &CollectionName, id: &RecordId) -> Result<Option<Record>> {
        self.collection_spec(collection)?;
        if self.monitor.is_online() {
            match self.remote.fetch(collection, id).await {
                Ok(Some(record)) => {
                    let record = normalize_record(self.remote.timestamp_codec().as_ref(), record);
                    self.cache_record(collection, &record).await;
                    return Ok(Some(record));
                }
                // A clean remote miss is authoritative; the cache is not
                // consulted for records the source of truth does not have.
                Ok(None) => return Ok(None),
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        id = %id,
                        "Remote get failed, serving the cache: {}",
                        err
                    );
                }
            }
        }
        self.local.get(collection, id).await
    }

    pub async fn get_all(
        &self,
        collection: &CollectionName,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<Record>> {
        let filter = self.tenant_filter(collection, tenant)?;
        if self.monitor.is_online() {
            match self.remote.list(collection, filter).await {
                Ok(records) => {
                    let records =
                        normalize_records(self.remote.timestamp_codec().as_ref(), records);
                    for record in &records {
                        self.cache_record(collection, record).await;
                    }
                    return Ok(records);
                }
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        "Remote list failed, serving the cache: {}",
                        err
                    );
                }
            }
        }
        self.cached_records(collection, tenant).await
    }

    /// Creates a record and returns its id: the remote-assigned id online,
    /// a temporary local id when the create had to be queued.
    pub async fn add(
        &self,
        collection: &CollectionName,
        fields: FieldMap,
        actor: &ActorId,
    ) -> Result<RecordId> {
        self.collection_spec(collection)?;
        if self.monitor.is_online() {
            match self.remote.add(collection, fields.clone()).await {
                Ok(id) => {
                    let record = Record::new(id.clone(), fields);
                    self.cache_record(collection, &record).await;
                    return Ok(id);
                }
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        "Remote add failed, queueing for replay: {}",
                        err
                    );
                }
            }
        }
        self.add_offline(collection, fields, actor).await
    }

    /// Partial update; only the given top-level fields change.
    pub async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        changes: FieldMap,
        actor: &ActorId,
    ) -> Result<()> {
        self.collection_spec(collection)?;
        if self.monitor.is_online() {
            match self.remote.update(collection, id, changes.clone()).await {
                Ok(()) => {
                    self.merge_cached(collection, id, &changes).await;
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        id = %id,
                        "Remote update failed, queueing for replay: {}",
                        err
                    );
                }
            }
        }
        self.update_offline(collection, id, changes, actor).await
    }

    pub async fn delete(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        actor: &ActorId,
    ) -> Result<()> {
        self.collection_spec(collection)?;
        if self.monitor.is_online() {
            match self.remote.delete(collection, id).await {
                Ok(()) => {
                    if let Err(err) = self.local.delete(collection, id).await {
                        tracing::warn!(
                            collection = %collection,
                            id = %id,
                            "Could not drop the cached copy: {}",
                            err
                        );
                    }
                    return Ok(());
                }
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        id = %id,
                        "Remote delete failed, queueing for replay: {}",
                        err
                    );
                }
            }
        }
        self.delete_offline(collection, id, actor).await
    }

    /// Live view of a collection, tenant-scoped when a tenant is given.
    ///
    /// Online this opens a remote snapshot feed; every snapshot is
    /// normalized, written through to the cache, and handed to the callback.
    /// Offline (or when opening the feed fails) the callback runs once with
    /// the current cache contents and no live updates follow.
    pub async fn subscribe<F>(
        &self,
        collection: &CollectionName,
        tenant: Option<&TenantId>,
        callback: F,
    ) -> Result<Subscription>
    where
        F: Fn(Vec<Record>) + Send + 'static,
    {
        let filter = self.tenant_filter(collection, tenant)?;
        let slot: CallbackSlot = Arc::new(Mutex::new(Some(Box::new(callback) as SnapshotCallback)));

        if self.monitor.is_online() {
            match self.remote.subscribe(collection, filter).await {
                Ok(stream) => return Ok(self.spawn_feed(collection.clone(), stream, slot)),
                Err(err) => {
                    tracing::warn!(
                        collection = %collection,
                        "Remote subscription failed, serving the cache once: {}",
                        err
                    );
                }
            }
        }

        let records = self.cached_records(collection, tenant).await?;
        deliver(&slot, records);
        Ok(Subscription {
            callback: slot,
            task: None,
        })
    }

    fn spawn_feed(
        &self,
        collection: CollectionName,
        mut stream: SnapshotStream,
        slot: CallbackSlot,
    ) -> Subscription {
        let local = Arc::clone(&self.local);
        let codec = self.remote.timestamp_codec();
        let feed_slot = Arc::clone(&slot);
        let task = tokio::spawn(async move {
            while let Some(snapshot) = stream.next().await {
                let records = normalize_records(codec.as_ref(), snapshot);
                for record in &records {
                    if let Err(err) = local.put(&collection, record).await {
                        tracing::warn!(
                            collection = %collection,
                            id = %record.id,
                            "Snapshot write-through failed: {}",
                            err
                        );
                    }
                }
                deliver(&feed_slot, records);
            }
            tracing::debug!(collection = %collection, "Snapshot feed closed by the service");
        });
        Subscription {
            callback: slot,
            task: Some(task),
        }
    }

    async fn add_offline(
        &self,
        collection: &CollectionName,
        fields: FieldMap,
        actor: &ActorId,
    ) -> Result<RecordId> {
        let id = RecordId::generate_local(collection, Utc::now());
        let record = Record::new(id.clone(), fields);
        self.local.put(collection, &record).await?;
        self.queue
            .enqueue(QueueEntry::new(
                collection.clone(),
                QueueOperation::Create { record },
                actor.clone(),
            ))
            .await?;
        self.monitor.refresh_pending().await;
        tracing::debug!(
            collection = %collection,
            id = %id,
            "Record cached under a temporary id and queued for sync"
        );
        Ok(id)
    }

    async fn update_offline(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        changes: FieldMap,
        actor: &ActorId,
    ) -> Result<()> {
        if let Some(mut record) = self.local.get(collection, id).await? {
            record.merge(&changes);
            self.local.put(collection, &record).await?;
        }
        // Queued even when nothing is cached here; the remote copy still has
        // to receive the change.
        self.queue
            .enqueue(QueueEntry::new(
                collection.clone(),
                QueueOperation::Update {
                    id: id.clone(),
                    changes,
                },
                actor.clone(),
            ))
            .await?;
        self.monitor.refresh_pending().await;
        Ok(())
    }

    async fn delete_offline(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        actor: &ActorId,
    ) -> Result<()> {
        self.local.delete(collection, id).await?;
        self.queue
            .enqueue(QueueEntry::new(
                collection.clone(),
                QueueOperation::Delete { id: id.clone() },
                actor.clone(),
            ))
            .await?;
        self.monitor.refresh_pending().await;
        Ok(())
    }

    /// Write-through that must not fail the remote success it follows.
    async fn cache_record(&self, collection: &CollectionName, record: &Record) {
        if let Err(err) = self.local.put(collection, record).await {
            tracing::warn!(
                collection = %collection,
                id = %record.id,
                "Write-through to the local cache failed: {}",
                err
            );
        }
    }

    async fn merge_cached(&self, collection: &CollectionName, id: &RecordId, changes: &FieldMap) {
        match self.local.get(collection, id).await {
            Ok(Some(mut record)) => {
                record.merge(changes);
                self.cache_record(collection, &record).await;
            }
            Ok(None) => {}
            Err(err) => {
                tracing::warn!(
                    collection = %collection,
                    id = %id,
                    "Could not merge the update into the cache: {}",
                    err
                );
            }
        }
    }

    async fn cached_records(
        &self,
        collection: &CollectionName,
        tenant: Option<&TenantId>,
    ) -> Result<Vec<Record>> {
        match tenant {
            Some(tenant) => {
                self.local
                    .get_all_by_index(collection, TENANT_FIELD, &Value::String(tenant.to_string()))
                    .await
            }
            None => self.local.get_all(collection).await,
        }
    }

    fn collection_spec(&self, collection: &CollectionName) -> Result<&CollectionSpec> {
        self.schema
            .collection(collection)
            .ok_or_else(|| AppError::Validation(format!("Unknown collection: {collection}")))
    }

    fn tenant_filter(
        &self,
        collection: &CollectionName,
        tenant: Option<&TenantId>,
    ) -> Result<Option<EqualityFilter>> {
        let spec = self.collection_spec(collection)?;
        match tenant {
            Some(tenant) => {
                if !spec.is_tenant_scoped() {
                    return Err(AppError::Validation(format!(
                        "Collection {collection} is not scoped by {TENANT_FIELD}"
                    )));
                }
                Ok(Some(EqualityFilter::new(
                    TENANT_FIELD,
                    Value::String(tenant.to_string()),
                )))
            }
            None => Ok(None),
        }
    }
}

// Typed layer over the raw record operations, keyed by `CollectionModel`.
impl DataService {
    pub async fn get_as<T: CollectionModel>(&self, id: &RecordId) -> Result<Option<T>> {
        match self.get(&collection_of::<T>(), id).await? {
            Some(record) => Ok(Some(from_record(&record)?)),
            None => Ok(None),
        }
    }

    pub async fn list_as<T: CollectionModel>(&self, tenant: Option<&TenantId>) -> Result<Vec<T>> {
        let records = self.get_all(&collection_of::<T>(), tenant).await?;
        Ok(from_records(&records))
    }

    pub async fn add_as<T: CollectionModel>(&self, draft: &T, actor: &ActorId) -> Result<RecordId> {
        let fields = to_fields(draft)?;
        self.add(&collection_of::<T>(), fields, actor).await
    }

    pub async fn update_in<T: CollectionModel>(
        &self,
        id: &RecordId,
        changes: FieldMap,
        actor: &ActorId,
    ) -> Result<()> {
        self.update(&collection_of::<T>(), id, changes, actor).await
    }

    pub async fn delete_in<T: CollectionModel>(
        &self,
        id: &RecordId,
        actor: &ActorId,
    ) -> Result<()> {
        self.delete(&collection_of::<T>(), id, actor).await
    }

    pub async fn subscribe_as<T, F>(
        &self,
        tenant: Option<&TenantId>,
        callback: F,
    ) -> Result<Subscription>
    where
        T: CollectionModel + 'static,
        F: Fn(Vec<T>) + Send + 'static,
    {
        self.subscribe(&collection_of::<T>(), tenant, move |records| {
            callback(from_records::<T>(&records))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::ports::{RemoteError, TimestampCodec};
    use crate::domain::value_objects::ConnectivityState;
    use crate::infrastructure::{MemoryRemoteStore, SqliteLocalStore};
    use crate::shared::config::AppConfig;
    use async_trait::async_trait;
    use mockall::mock;
    use serde_json::json;
    use std::time::Duration;

    mock! {
        Remote {}

        #[async_trait]
        impl RemoteStore for Remote {
            async fn fetch(
                &self,
                collection: &CollectionName,
                id: &RecordId,
            ) -> std::result::Result<Option<Record>, RemoteError>;
            async fn list(
                &self,
                collection: &CollectionName,
                filter: Option<EqualityFilter>,
            ) -> std::result::Result<Vec<Record>, RemoteError>;
            async fn add(
                &self,
                collection: &CollectionName,
                fields: FieldMap,
            ) -> std::result::Result<RecordId, RemoteError>;
            async fn update(
                &self,
                collection: &CollectionName,
                id: &RecordId,
                changes: FieldMap,
            ) -> std::result::Result<(), RemoteError>;
            async fn delete(
                &self,
                collection: &CollectionName,
                id: &RecordId,
            ) -> std::result::Result<(), RemoteError>;
            async fn subscribe(
                &self,
                collection: &CollectionName,
                filter: Option<EqualityFilter>,
            ) -> std::result::Result<SnapshotStream, RemoteError>;
            fn timestamp_codec(&self) -> Arc<dyn TimestampCodec>;
        }
    }

    struct Harness {
        local: Arc<SqliteLocalStore>,
        remote: Arc<MemoryRemoteStore>,
        monitor: Arc<NetworkMonitor>,
        service: DataService,
    }

    async fn harness(initial: ConnectivityState) -> Harness {
        let config = AppConfig::in_memory();
        let local =
            Arc::new(SqliteLocalStore::open(config.database, StoreSchema::invoicing()).await);
        let remote = Arc::new(MemoryRemoteStore::new());
        let queue = Arc::new(SyncQueue::new(local.clone(), remote.clone()));
        let monitor = Arc::new(NetworkMonitor::new(queue.clone(), initial, true));
        let service = DataService::new(
            local.clone(),
            remote.clone(),
            queue,
            monitor.clone(),
            StoreSchema::invoicing(),
        );
        Harness {
            local,
            remote,
            monitor,
            service,
        }
    }

    fn mock_service(local: Arc<SqliteLocalStore>, remote: Arc<MockRemote>) -> DataService {
        let queue = Arc::new(SyncQueue::new(local.clone(), remote.clone()));
        let monitor = Arc::new(NetworkMonitor::new(
            queue.clone(),
            ConnectivityState::Online,
            true,
        ));
        DataService::new(local, remote, queue, monitor, StoreSchema::invoicing())
    }

    async fn in_memory_store() -> Arc<SqliteLocalStore> {
        let config = AppConfig::in_memory();
        Arc::new(SqliteLocalStore::open(config.database, StoreSchema::invoicing()).await)
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    fn clients() -> CollectionName {
        CollectionName::parse("clients").expect("collection")
    }

    fn actor() -> ActorId {
        ActorId::parse("seller-1").expect("actor")
    }

    #[tokio::test]
    async fn online_mutations_write_through_to_the_cache() {
        let h = harness(ConnectivityState::Online).await;

        let id = h
            .service
            .add(
                &clients(),
                fields(json!({ "companyId": "acme", "name": "Globex" })),
                &actor(),
            )
            .await
            .expect("add");
        assert!(!id.is_local_for(&clients()));

        let cached = h.local.get(&clients(), &id).await.expect("get");
        assert_eq!(
            cached.expect("cached").get("name"),
            Some(&json!("Globex"))
        );

        h.service
            .update(
                &clients(),
                &id,
                fields(json!({ "name": "Globex Ltd" })),
                &actor(),
            )
            .await
            .expect("update");
        let cached = h.local.get(&clients(), &id).await.expect("get").expect("cached");
        assert_eq!(cached.get("name"), Some(&json!("Globex Ltd")));
        assert_eq!(cached.get("companyId"), Some(&json!("acme")));

        h.service.delete(&clients(), &id, &actor()).await.expect("delete");
        assert!(h.local.get(&clients(), &id).await.expect("get").is_none());
        assert_eq!(h.remote.record_count(&clients()).await, 0);
        assert_eq!(h.monitor.status().pending_changes, 0);
    }

    #[tokio::test]
    async fn remote_write_failure_still_queues() {
        let h = harness(ConnectivityState::Online).await;
        h.remote.deny_writes(true).await;

        // The monitor still believes the app is online; the failure alone
        // must push the mutation onto the offline path.
        let id = h
            .service
            .add(
                &clients(),
                fields(json!({ "companyId": "acme", "name": "Globex" })),
                &actor(),
            )
            .await
            .expect("add");
        assert!(id.is_local_for(&clients()));
        assert!(h.monitor.is_online());
        assert_eq!(h.monitor.status().pending_changes, 1);
        assert!(h.local.get(&clients(), &id).await.expect("get").is_some());

        h.service
            .update(&clients(), &id, fields(json!({ "name": "Globex Ltd" })), &actor())
            .await
            .expect("update");
        assert_eq!(h.monitor.status().pending_changes, 2);
        let cached = h.local.get(&clients(), &id).await.expect("get").expect("cached");
        assert_eq!(cached.get("name"), Some(&json!("Globex Ltd")));
    }

    #[tokio::test]
    async fn offline_update_queues_even_without_a_cached_copy() {
        let h = harness(ConnectivityState::Offline).await;
        let id = RecordId::parse("c-unseen").expect("id");

        h.service
            .update(&clients(), &id, fields(json!({ "name": "Globex" })), &actor())
            .await
            .expect("update");

        assert_eq!(h.monitor.status().pending_changes, 1);
        assert!(h.local.get(&clients(), &id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn online_get_miss_is_authoritative() {
        let h = harness(ConnectivityState::Online).await;
        let id = RecordId::parse("c-stale").expect("id");
        h.local
            .put(&clients(), &Record::new(id.clone(), fields(json!({ "name": "Gone" }))))
            .await
            .expect("put");

        // The remote does not have the record, so the stale cached copy is
        // not returned.
        assert!(h.service.get(&clients(), &id).await.expect("get").is_none());
    }

    #[tokio::test]
    async fn online_list_scopes_by_tenant_and_caches_for_offline() {
        let h = harness(ConnectivityState::Online).await;
        for (id, company) in [("c-1", "acme"), ("c-2", "acme"), ("c-3", "initech")] {
            h.remote
                .seed(
                    &clients(),
                    Record::new(
                        RecordId::parse(id).expect("id"),
                        fields(json!({ "companyId": company, "name": id })),
                    ),
                )
                .await;
        }
        let tenant = TenantId::parse("acme").expect("tenant");

        let online = h
            .service
            .get_all(&clients(), Some(&tenant))
            .await
            .expect("list");
        assert_eq!(online.len(), 2);

        h.monitor.handle_offline();
        let offline = h
            .service
            .get_all(&clients(), Some(&tenant))
            .await
            .expect("list");
        assert_eq!(offline.len(), 2);
        assert!(offline
            .iter()
            .all(|r| r.get("companyId") == Some(&json!("acme"))));
    }

    #[tokio::test]
    async fn unknown_collections_and_bad_tenant_filters_are_rejected() {
        let h = harness(ConnectivityState::Online).await;
        let unknown = CollectionName::parse("ledgers").expect("collection");
        let id = RecordId::parse("x").expect("id");
        let err = h.service.get(&unknown, &id).await.expect_err("unknown");
        assert!(matches!(err, AppError::Validation(_)));

        // Companies are not tenant-scoped; filtering them by tenant is a
        // caller bug, not an empty result.
        let companies = CollectionName::parse("companies").expect("collection");
        let tenant = TenantId::parse("acme").expect("tenant");
        let err = h
            .service
            .get_all(&companies, Some(&tenant))
            .await
            .expect_err("filter");
        assert!(matches!(err, AppError::Validation(_)));
    }

    #[tokio::test]
    async fn permission_denied_read_falls_back_to_the_cache() {
        let local = in_memory_store().await;
        let id = RecordId::parse("c-1").expect("id");
        local
            .put(&clients(), &Record::new(id.clone(), fields(json!({ "name": "Globex" }))))
            .await
            .expect("put");

        let mut remote = MockRemote::new();
        remote
            .expect_fetch()
            .times(1)
            .returning(|_, _| Err(RemoteError::PermissionDenied("tenant mismatch".into())));
        let service = mock_service(local, Arc::new(remote));

        let record = service.get(&clients(), &id).await.expect("get").expect("cached");
        assert_eq!(record.get("name"), Some(&json!("Globex")));
    }

    #[tokio::test]
    async fn failed_remote_add_is_attempted_exactly_once() {
        let local = in_memory_store().await;
        let mut remote = MockRemote::new();
        remote
            .expect_add()
            .times(1)
            .returning(|_, _| Err(RemoteError::Backend("quota exceeded".into())));
        let service = mock_service(local.clone(), Arc::new(remote));

        let id = service
            .add(&clients(), fields(json!({ "name": "Globex" })), &actor())
            .await
            .expect("add");
        assert!(id.is_local_for(&clients()));
        assert_eq!(local.pending_count().await.expect("count"), 1);
    }

    #[tokio::test]
    async fn offline_subscribe_delivers_the_cache_once() {
        let h = harness(ConnectivityState::Offline).await;
        h.local
            .put(
                &clients(),
                &Record::new(
                    RecordId::parse("c-1").expect("id"),
                    fields(json!({ "companyId": "acme", "name": "Globex" })),
                ),
            )
            .await
            .expect("put");

        let (tx, rx) = std::sync::mpsc::channel();
        let tenant = TenantId::parse("acme").expect("tenant");
        let subscription = h
            .service
            .subscribe(&clients(), Some(&tenant), move |records| {
                let _ = tx.send(records);
            })
            .await
            .expect("subscribe");

        assert!(!subscription.is_live());
        let delivered = rx.recv_timeout(Duration::from_secs(1)).expect("delivery");
        assert_eq!(delivered.len(), 1);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn online_subscription_feeds_until_cancelled() {
        let h = harness(ConnectivityState::Online).await;
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        let subscription = h
            .service
            .subscribe(&clients(), None, move |records| {
                let _ = tx.send(records);
            })
            .await
            .expect("subscribe");
        assert!(subscription.is_live());

        // Initial snapshot of the empty collection.
        let initial = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("initial")
            .expect("open");
        assert!(initial.is_empty());

        h.remote
            .add(&clients(), fields(json!({ "name": "Globex" })))
            .await
            .expect("add");
        let next = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("snapshot")
            .expect("open");
        assert_eq!(next.len(), 1);
        // Snapshots write through, so the cache can serve them offline.
        assert_eq!(h.local.get_all(&clients()).await.expect("all").len(), 1);

        subscription.cancel();
        h.remote
            .add(&clients(), fields(json!({ "name": "Initech" })))
            .await
            .expect("add");
        match tokio::time::timeout(Duration::from_millis(100), rx.recv()).await {
            // The callback (and with it the sender) died with the cancel.
            Ok(None) | Err(_) => {}
            Ok(Some(_)) => panic!("delivery after cancel"),
        }
    }

    #[tokio::test]
    async fn typed_helpers_round_trip_models() {
        use crate::domain::entities::{Client, NewClient};
        let h = harness(ConnectivityState::Online).await;
        let tenant = TenantId::parse("acme").expect("tenant");
        let draft = NewClient {
            company_id: tenant.clone(),
            name: "Globex".to_string(),
            email: "billing@globex.example".to_string(),
            phone: "+248 2 555 0147".to_string(),
            address: "12 Harbor Road".to_string(),
            tax_id: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let id = h.service.add_as(&draft, &actor()).await.expect("add");
        let client: Client = h
            .service
            .get_as(&id)
            .await
            .expect("get")
            .expect("present");
        assert_eq!(client.name, "Globex");

        let listed: Vec<Client> = h
            .service
            .list_as(Some(&tenant))
            .await
            .expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, id);
    }
}
