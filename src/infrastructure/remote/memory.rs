use async_trait::async_trait;
use rand::Rng;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};

use crate::application::ports::remote_store::{
    EqualityFilter, RemoteError, RemoteStore, SnapshotStream, TimestampCodec,
};
use crate::domain::entities::{FieldMap, Record};
use crate::domain::value_objects::{CollectionName, RecordId};
use crate::infrastructure::remote::timestamp::RemoteTimestampCodec;

const REMOTE_ID_LEN: usize = 20;
const SNAPSHOT_BUFFER: usize = 64;

struct Subscriber {
    collection: CollectionName,
    filter: Option<EqualityFilter>,
    sender: mpsc::Sender<Vec<Record>>,
}

#[derive(Default)]
struct RemoteState {
    collections: HashMap<CollectionName, BTreeMap<String, FieldMap>>,
    subscribers: Vec<Subscriber>,
    unreachable: bool,
    deny_writes: bool,
}

/// In-memory remote document service used by tests and the demo harness.
/// Behaves like the hosted backend: assigns opaque ids, pushes a full
/// snapshot to matching subscribers after every change (and once
/// immediately on subscribe), and can be switched into failure modes.
#[derive(Default)]
pub struct MemoryRemoteStore {
    state: RwLock<RemoteState>,
    codec: RemoteTimestampCodec,
}

impl MemoryRemoteStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// When false, every call fails with `RemoteError::Unavailable`.
    pub async fn set_reachable(&self, reachable: bool) {
        self.state.write().await.unreachable = !reachable;
    }

    /// When true, mutations fail with `RemoteError::PermissionDenied` while
    /// reads keep working.
    pub async fn deny_writes(&self, deny: bool) {
        self.state.write().await.deny_writes = deny;
    }

    /// Inserts a record under a chosen id without mode checks, for seeding
    /// fixtures.
    pub async fn seed(&self, collection: &CollectionName, record: Record) {
        {
            let mut state = self.state.write().await;
            let mut fields = record.fields;
            fields.remove("id");
            state
                .collections
                .entry(collection.clone())
                .or_default()
                .insert(record.id.to_string(), fields);
        }
        self.notify(collection).await;
    }

    pub async fn record_count(&self, collection: &CollectionName) -> usize {
        self.state
            .read()
            .await
            .collections
            .get(collection)
            .map(BTreeMap::len)
            .unwrap_or(0)
    }

    fn generate_id() -> String {
        const ALPHANUM: &[u8] =
            b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789";
        let mut rng = rand::thread_rng();
        (0..REMOTE_ID_LEN)
            .map(|_| ALPHANUM[rng.gen_range(0..ALPHANUM.len())] as char)
            .collect()
    }

    fn snapshot_of(
        state: &RemoteState,
        collection: &CollectionName,
        filter: Option<&EqualityFilter>,
    ) -> Vec<Record> {
        let Some(records) = state.collections.get(collection) else {
            return Vec::new();
        };
        records
            .iter()
            .filter_map(|(id, fields)| {
                let id = RecordId::new(id.clone()).ok()?;
                let record = Record::new(id, fields.clone());
                match filter {
                    Some(filter) if !filter.matches(&record) => None,
                    _ => Some(record),
                }
            })
            .collect()
    }

    /// Pushes fresh snapshots to every live subscriber of the collection.
    /// Sends happen outside the state lock; closed receivers are pruned on
    /// the next mutation.
    async fn notify(&self, collection: &CollectionName) {
        let deliveries: Vec<(mpsc::Sender<Vec<Record>>, Vec<Record>)> = {
            let mut state = self.state.write().await;
            state.subscribers.retain(|s| !s.sender.is_closed());
            let snapshots: Vec<_> = state
                .subscribers
                .iter()
                .filter(|s| s.collection == *collection)
                .map(|s| {
                    (
                        s.sender.clone(),
                        Self::snapshot_of(&state, collection, s.filter.as_ref()),
                    )
                })
                .collect();
            snapshots
        };

        for (sender, snapshot) in deliveries {
            let _ = sender.send(snapshot).await;
        }
    }

    async fn check_reachable(&self) -> Result<(), RemoteError> {
        if self.state.read().await.unreachable {
            return Err(RemoteError::Unavailable(
                "remote service is offline".to_string(),
            ));
        }
        Ok(())
    }

    async fn check_writable(&self) -> Result<(), RemoteError> {
        let state = self.state.read().await;
        if state.unreachable {
            return Err(RemoteError::Unavailable(
                "remote service is offline".to_string(),
            ));
        }
        if state.deny_writes {
            return Err(RemoteError::PermissionDenied(
                "writes are not allowed for this principal".to_string(),
            ));
        }
        Ok(())
    }
}

#[async_trait]
impl RemoteStore for MemoryRemoteStore {
    async fn fetch(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, RemoteError> {
        self.check_reachable().await?;
        let state = self.state.read().await;
        Ok(state
            .collections
            .get(collection)
            .and_then(|records| records.get(id.as_str()))
            .map(|fields| Record::new(id.clone(), fields.clone())))
    }

    async fn list(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<Record>, RemoteError> {
        self.check_reachable().await?;
        let state = self.state.read().await;
        Ok(Self::snapshot_of(&state, collection, filter.as_ref()))
    }

    async fn add(
        &self,
        collection: &CollectionName,
        mut fields: FieldMap,
    ) -> Result<RecordId, RemoteError> {
        self.check_writable().await?;
        fields.remove("id");
        let id = Self::generate_id();
        {
            let mut state = self.state.write().await;
            state
                .collections
                .entry(collection.clone())
                .or_default()
                .insert(id.clone(), fields);
        }
        self.notify(collection).await;
        RecordId::new(id).map_err(RemoteError::Backend)
    }

    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        changes: FieldMap,
    ) -> Result<(), RemoteError> {
        self.check_writable().await?;
        {
            let mut state = self.state.write().await;
            let Some(fields) = state
                .collections
                .get_mut(collection)
                .and_then(|records| records.get_mut(id.as_str()))
            else {
                return Err(RemoteError::Rejected(format!(
                    "no record {id} in {collection}"
                )));
            };
            for (key, value) in changes {
                if key == "id" {
                    continue;
                }
                fields.insert(key, value);
            }
        }
        self.notify(collection).await;
        Ok(())
    }

    async fn delete(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<(), RemoteError> {
        self.check_writable().await?;
        let removed = {
            let mut state = self.state.write().await;
            state
                .collections
                .get_mut(collection)
                .and_then(|records| records.remove(id.as_str()))
                .is_some()
        };
        // Deleting an absent record succeeds, as the backend does.
        if removed {
            self.notify(collection).await;
        }
        Ok(())
    }

    async fn subscribe(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<SnapshotStream, RemoteError> {
        self.check_reachable().await?;
        let (sender, receiver) = mpsc::channel(SNAPSHOT_BUFFER);
        {
            let mut state = self.state.write().await;
            let initial = Self::snapshot_of(&state, collection, filter.as_ref());
            // Fresh channel with capacity, cannot fail.
            let _ = sender.try_send(initial);
            state.subscribers.push(Subscriber {
                collection: collection.clone(),
                filter,
                sender,
            });
        }
        Ok(SnapshotStream::new(receiver))
    }

    fn timestamp_codec(&self) -> Arc<dyn TimestampCodec> {
        Arc::new(self.codec)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn clients() -> CollectionName {
        CollectionName::from_static("clients")
    }

    fn fields(value: serde_json::Value) -> FieldMap {
        match value {
            serde_json::Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[tokio::test]
    async fn add_assigns_an_opaque_id_and_stores_the_fields() {
        let remote = MemoryRemoteStore::new();
        let id = remote
            .add(&clients(), fields(json!({ "name": "Acme", "id": "ignored" })))
            .await
            .expect("add");

        assert_eq!(id.as_str().len(), REMOTE_ID_LEN);
        let record = remote.fetch(&clients(), &id).await.expect("fetch").expect("some");
        assert_eq!(record.get("name"), Some(&json!("Acme")));
        assert!(record.get("id").is_none());
    }

    #[tokio::test]
    async fn unreachable_mode_fails_everything() {
        let remote = MemoryRemoteStore::new();
        remote.set_reachable(false).await;

        let err = remote.list(&clients(), None).await.expect_err("offline");
        assert!(matches!(err, RemoteError::Unavailable(_)));
        let err = remote
            .add(&clients(), FieldMap::new())
            .await
            .expect_err("offline");
        assert!(matches!(err, RemoteError::Unavailable(_)));
    }

    #[tokio::test]
    async fn write_denial_keeps_reads_working() {
        let remote = MemoryRemoteStore::new();
        remote.deny_writes(true).await;

        let err = remote
            .add(&clients(), FieldMap::new())
            .await
            .expect_err("denied");
        assert!(matches!(err, RemoteError::PermissionDenied(_)));
        assert!(remote.list(&clients(), None).await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn updates_against_missing_records_are_rejected() {
        let remote = MemoryRemoteStore::new();
        let err = remote
            .update(
                &clients(),
                &RecordId::parse("ghost").expect("id"),
                FieldMap::new(),
            )
            .await
            .expect_err("missing");
        assert!(matches!(err, RemoteError::Rejected(_)));

        // Deletes of missing records succeed.
        remote
            .delete(&clients(), &RecordId::parse("ghost").expect("id"))
            .await
            .expect("delete");
    }

    #[tokio::test]
    async fn subscribers_get_the_current_snapshot_then_every_change() {
        let remote = MemoryRemoteStore::new();
        remote
            .seed(
                &clients(),
                Record::from_value(json!({ "id": "c1", "companyId": "acme" })).expect("record"),
            )
            .await;

        let filter = EqualityFilter::new("companyId", json!("acme"));
        let mut stream = remote
            .subscribe(&clients(), Some(filter))
            .await
            .expect("subscribe");

        let initial = stream.next().await.expect("initial");
        assert_eq!(initial.len(), 1);

        remote
            .seed(
                &clients(),
                Record::from_value(json!({ "id": "c2", "companyId": "acme" })).expect("record"),
            )
            .await;
        remote
            .seed(
                &clients(),
                Record::from_value(json!({ "id": "x1", "companyId": "other" })).expect("record"),
            )
            .await;

        let after_match = stream.next().await.expect("snapshot");
        assert_eq!(after_match.len(), 2);

        // The non-matching seed still pushes a snapshot, with the same
        // filtered contents.
        let after_other = stream.next().await.expect("snapshot");
        assert_eq!(after_other.len(), 2);
    }
}
