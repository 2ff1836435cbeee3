use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::entities::record::{FieldMap, Record};
use crate::domain::value_objects::{ActorId, CollectionName, Operation, QueueEntryId, RecordId};

/// Payload of a queued mutation. Create carries the full record (local id
/// included) so replay can rekey the cache once the remote service assigns
/// the final id; update carries only the changed fields.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum QueueOperation {
    Create { record: Record },
    Update { id: RecordId, changes: FieldMap },
    Delete { id: RecordId },
}

impl QueueOperation {
    pub fn kind(&self) -> Operation {
        match self {
            QueueOperation::Create { .. } => Operation::Create,
            QueueOperation::Update { .. } => Operation::Update,
            QueueOperation::Delete { .. } => Operation::Delete,
        }
    }

    /// Id of the record the mutation targets.
    pub fn record_id(&self) -> &RecordId {
        match self {
            QueueOperation::Create { record } => &record.id,
            QueueOperation::Update { id, .. } => id,
            QueueOperation::Delete { id } => id,
        }
    }
}

/// A durably queued mutation awaiting replay. Immutable once enqueued.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct QueueEntry {
    pub id: QueueEntryId,
    pub collection: CollectionName,
    pub operation: QueueOperation,
    pub queued_at: DateTime<Utc>,
    pub actor: ActorId,
}

impl QueueEntry {
    pub fn new(collection: CollectionName, operation: QueueOperation, actor: ActorId) -> Self {
        Self {
            id: QueueEntryId::generate(),
            collection,
            operation,
            queued_at: Utc::now(),
            actor,
        }
    }

    /// Rehydrates a persisted entry.
    pub fn from_parts(
        id: QueueEntryId,
        collection: CollectionName,
        operation: QueueOperation,
        queued_at: DateTime<Utc>,
        actor: ActorId,
    ) -> Self {
        Self {
            id,
            collection,
            operation,
            queued_at,
            actor,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn operation_kind_and_target_id() {
        let record = Record::from_value(json!({ "id": "clients_1_abc", "name": "Acme" }))
            .expect("record");
        let create = QueueOperation::Create {
            record: record.clone(),
        };
        assert_eq!(create.kind(), Operation::Create);
        assert_eq!(create.record_id().as_str(), "clients_1_abc");

        let delete = QueueOperation::Delete { id: record.id };
        assert_eq!(delete.kind(), Operation::Delete);
    }

    #[test]
    fn new_entries_get_distinct_ids() {
        let collection = CollectionName::parse("clients").expect("collection");
        let actor = ActorId::parse("user-1").expect("actor");
        let op = |id: &str| QueueOperation::Delete {
            id: RecordId::parse(id).expect("id"),
        };

        let a = QueueEntry::new(collection.clone(), op("a"), actor.clone());
        let b = QueueEntry::new(collection, op("b"), actor);
        assert_ne!(a.id, b.id);
    }
}
