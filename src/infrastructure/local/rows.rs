use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use sqlx::FromRow;

use crate::domain::entities::{QueueEntry, QueueOperation, Record};
use crate::domain::value_objects::{ActorId, CollectionName, Operation, QueueEntryId, RecordId};
use crate::shared::error::{AppError, Result};

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RecordRow {
    pub id: String,
    pub data: String,
}

impl RecordRow {
    /// The data column holds the fields only; the id lives in its own
    /// column.
    pub fn into_record(self) -> Result<Record> {
        let fields: Value = serde_json::from_str(&self.data)?;
        let Value::Object(map) = fields else {
            return Err(AppError::Database(format!(
                "Corrupt record data for id {}",
                self.id
            )));
        };
        let id = RecordId::new(self.id).map_err(AppError::Database)?;
        Ok(Record::new(id, map))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct QueueEntryRow {
    pub seq: i64,
    pub id: String,
    pub collection: String,
    pub operation: String,
    pub payload: String,
    pub queued_at_ms: i64,
    pub actor: String,
}

impl TryFrom<QueueEntryRow> for QueueEntry {
    type Error = AppError;

    fn try_from(row: QueueEntryRow) -> Result<Self> {
        let id = QueueEntryId::new(row.id).map_err(AppError::Database)?;
        let collection = CollectionName::new(row.collection).map_err(AppError::Database)?;
        let kind = Operation::parse(&row.operation).map_err(AppError::Database)?;
        let payload: Value = serde_json::from_str(&row.payload)?;
        let operation = decode_operation(kind, payload)?;
        let queued_at = DateTime::from_timestamp_millis(row.queued_at_ms).ok_or_else(|| {
            AppError::Database(format!("Invalid queue timestamp {}", row.queued_at_ms))
        })?;
        let actor = ActorId::new(row.actor).map_err(AppError::Database)?;
        Ok(QueueEntry::from_parts(id, collection, operation, queued_at, actor))
    }
}

/// Payload column encoding per operation kind. Create stores the full
/// record, id included, so replay can rekey the cache; update stores the
/// target id plus the changed fields; delete stores the id alone.
pub(crate) fn encode_payload(operation: &QueueOperation) -> Value {
    match operation {
        QueueOperation::Create { record } => record.to_value(),
        QueueOperation::Update { id, changes } => json!({
            "id": id.as_str(),
            "changes": Value::Object(changes.clone()),
        }),
        QueueOperation::Delete { id } => json!({ "id": id.as_str() }),
    }
}

fn decode_operation(kind: Operation, payload: Value) -> Result<QueueOperation> {
    match kind {
        Operation::Create => Ok(QueueOperation::Create {
            record: Record::from_value(payload).map_err(AppError::Database)?,
        }),
        Operation::Update => {
            let Value::Object(mut map) = payload else {
                return Err(AppError::Database("Corrupt update payload".to_string()));
            };
            let id = take_record_id(&mut map)?;
            let changes = match map.remove("changes") {
                Some(Value::Object(changes)) => changes,
                _ => {
                    return Err(AppError::Database(
                        "Update payload is missing its changes".to_string(),
                    ))
                }
            };
            Ok(QueueOperation::Update { id, changes })
        }
        Operation::Delete => {
            let Value::Object(mut map) = payload else {
                return Err(AppError::Database("Corrupt delete payload".to_string()));
            };
            let id = take_record_id(&mut map)?;
            Ok(QueueOperation::Delete { id })
        }
    }
}

fn take_record_id(map: &mut serde_json::Map<String, Value>) -> Result<RecordId> {
    match map.remove("id") {
        Some(Value::String(id)) => RecordId::new(id).map_err(AppError::Database),
        _ => Err(AppError::Database(
            "Queue payload is missing its record id".to_string(),
        )),
    }
}

/// Text form of a JSON scalar for the index table. Non-scalars are not
/// indexable and yield None.
pub(crate) fn index_value_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}
