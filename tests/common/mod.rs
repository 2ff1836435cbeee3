use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use billsync::application::ports::{
    EqualityFilter, RemoteError, RemoteStore, SnapshotStream, TimestampCodec,
};
use billsync::domain::entities::{FieldMap, NewClient, Record};
use billsync::domain::value_objects::{
    ActorId, CollectionName, ConnectivityState, RecordId, TenantId,
};
use billsync::infrastructure::MemoryRemoteStore;
use billsync::{AppConfig, AppState};
use chrono::Utc;
use tokio::sync::Semaphore;

pub struct SyncTestContext {
    pub state: AppState,
    #[allow(dead_code)]
    pub remote: Arc<MemoryRemoteStore>,
}

/// Wired application state over an in-memory store and remote.
pub async fn setup_state(initial: ConnectivityState) -> SyncTestContext {
    let remote = Arc::new(MemoryRemoteStore::new());
    let state = AppState::new(&AppConfig::in_memory(), remote.clone(), initial).await;
    SyncTestContext { state, remote }
}

pub fn actor() -> ActorId {
    ActorId::parse("seller-1").expect("actor")
}

pub fn tenant(name: &str) -> TenantId {
    TenantId::parse(name).expect("tenant")
}

#[allow(dead_code)]
pub fn client_draft(company: &str, name: &str) -> NewClient {
    let now = Utc::now();
    NewClient {
        company_id: tenant(company),
        name: name.to_string(),
        email: format!("{}@example.com", name.to_lowercase()),
        phone: "+248 2 555 0147".to_string(),
        address: "12 Harbor Road".to_string(),
        tax_id: None,
        created_at: now,
        updated_at: now,
    }
}

/// Remote wrapper whose `add` parks until the test hands out a permit.
/// Lets a drain be caught mid-flight to observe the exclusivity guard.
#[allow(dead_code)]
pub struct GatedRemote {
    inner: Arc<MemoryRemoteStore>,
    gate: Semaphore,
    add_calls: AtomicUsize,
}

#[allow(dead_code)]
impl GatedRemote {
    pub fn new(inner: Arc<MemoryRemoteStore>) -> Self {
        Self {
            inner,
            gate: Semaphore::new(0),
            add_calls: AtomicUsize::new(0),
        }
    }

    pub fn release_adds(&self, count: usize) {
        self.gate.add_permits(count);
    }

    pub fn add_calls(&self) -> usize {
        self.add_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RemoteStore for GatedRemote {
    async fn fetch(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, RemoteError> {
        self.inner.fetch(collection, id).await
    }

    async fn list(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<Record>, RemoteError> {
        self.inner.list(collection, filter).await
    }

    async fn add(
        &self,
        collection: &CollectionName,
        fields: FieldMap,
    ) -> Result<RecordId, RemoteError> {
        self.add_calls.fetch_add(1, Ordering::SeqCst);
        let permit = self
            .gate
            .acquire()
            .await
            .map_err(|_| RemoteError::Backend("gate closed".to_string()))?;
        permit.forget();
        self.inner.add(collection, fields).await
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        changes: FieldMap,
    ) -> Result<(), RemoteError> {
        self.inner.update(collection, id, changes).await
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<(), RemoteError> {
        self.inner.delete(collection, id).await
    }

    async fn subscribe(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<SnapshotStream, RemoteError> {
        self.inner.subscribe(collection, filter).await
    }

    fn timestamp_codec(&self) -> Arc<dyn TimestampCodec> {
        self.inner.timestamp_codec()
    }
}
