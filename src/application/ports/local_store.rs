use async_trait::async_trait;
use serde_json::Value;

use crate::domain::entities::{QueueEntry, Record};
use crate::domain::value_objects::{CollectionName, QueueEntryId, RecordId};
use crate::shared::error::AppError;

/// Health of the local store. An open or upgrade failure leaves the store
/// inert instead of failing every caller; `Unavailable` is what the host
/// shows next to its recovery action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreStatus {
    Available,
    Unavailable { reason: String },
}

impl StoreStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, StoreStatus::Available)
    }
}

/// Device-local cache and durable sync queue.
///
/// While the store is inert, reads succeed with empty results and mutations
/// return `AppError::StoreUnavailable`; `reset` is the recovery path.
#[async_trait]
pub trait LocalStore: Send + Sync {
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, AppError>;
    async fn get_all(&self, collection: &CollectionName) -> Result<Vec<Record>, AppError>;
    /// Equality lookup over a declared index field.
    async fn get_all_by_index(
        &self,
        collection: &CollectionName,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>, AppError>;
    /// Full-record replace; creates the record when absent. Idempotent.
    async fn put(&self, collection: &CollectionName, record: &Record) -> Result<(), AppError>;
    /// No-op when the record is absent.
    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<(), AppError>;

    async fn enqueue(&self, entry: &QueueEntry) -> Result<(), AppError>;
    /// All queued entries, oldest first.
    async fn queued_entries(&self) -> Result<Vec<QueueEntry>, AppError>;
    async fn remove_entry(&self, id: &QueueEntryId) -> Result<(), AppError>;
    async fn pending_count(&self) -> Result<u64, AppError>;

    async fn status(&self) -> StoreStatus;
    /// Empties every collection and the queue, keeping the store itself.
    async fn clear(&self) -> Result<(), AppError>;
    /// Destructive recovery: deletes the entire store and recreates it
    /// empty under the declared schema. Only ever invoked on an explicit
    /// user action.
    async fn reset(&self) -> Result<(), AppError>;
}
