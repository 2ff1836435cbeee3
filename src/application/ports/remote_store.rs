use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::domain::entities::{FieldMap, Record};
use crate::domain::value_objects::{CollectionName, RecordId};
use crate::shared::error::AppError;

/// Failures surfaced by a remote record service. Permission problems stay
/// distinguishable from plain unreachability.
#[derive(Debug, Error)]
pub enum RemoteError {
    #[error("remote service unreachable: {0}")]
    Unavailable(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("request rejected: {0}")]
    Rejected(String),
    #[error("remote backend error: {0}")]
    Backend(String),
}

impl From<RemoteError> for AppError {
    fn from(err: RemoteError) -> Self {
        match err {
            RemoteError::Unavailable(msg) => AppError::Connectivity(msg),
            RemoteError::PermissionDenied(msg) => AppError::PermissionDenied(msg),
            RemoteError::Rejected(msg) => AppError::Remote(msg),
            RemoteError::Backend(msg) => AppError::Remote(msg),
        }
    }
}

/// Single-field equality constraint, the only filter shape the data layer
/// needs (tenant and per-parent scoping).
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityFilter {
    pub field: String,
    pub value: Value,
}

impl EqualityFilter {
    pub fn new(field: impl Into<String>, value: Value) -> Self {
        Self {
            field: field.into(),
            value,
        }
    }

    pub fn matches(&self, record: &Record) -> bool {
        record.get(&self.field) == Some(&self.value)
    }
}

/// Live feed of full collection snapshots. The service pushes the current
/// matching set after every change, starting with one immediately on
/// subscribe. Dropping the stream cancels the subscription.
pub struct SnapshotStream {
    receiver: mpsc::Receiver<Vec<Record>>,
}

impl SnapshotStream {
    pub fn new(receiver: mpsc::Receiver<Vec<Record>>) -> Self {
        Self { receiver }
    }

    /// Next snapshot, or None once the service side closes.
    pub async fn next(&mut self) -> Option<Vec<Record>> {
        self.receiver.recv().await
    }
}

/// Recognizes and decodes the remote service's native timestamp values so
/// the normalizer stays service-agnostic.
pub trait TimestampCodec: Send + Sync {
    /// Decodes a native timestamp value; None when the value is not one.
    fn decode(&self, value: &Value) -> Option<DateTime<Utc>>;
}

/// The remote document service the data layer syncs against.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn fetch(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>, RemoteError>;
    async fn list(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<Vec<Record>, RemoteError>;
    /// Creates a record and returns the id the service assigned.
    async fn add(
        &self,
        collection: &CollectionName,
        fields: FieldMap,
    ) -> Result<RecordId, RemoteError>;
    async fn update(
        &self,
        collection: &CollectionName,
        id: &RecordId,
        changes: FieldMap,
    ) -> Result<(), RemoteError>;
    async fn delete(&self, collection: &CollectionName, id: &RecordId)
        -> Result<(), RemoteError>;
    async fn subscribe(
        &self,
        collection: &CollectionName,
        filter: Option<EqualityFilter>,
    ) -> Result<SnapshotStream, RemoteError>;
    fn timestamp_codec(&self) -> Arc<dyn TimestampCodec>;
}
