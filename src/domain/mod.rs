pub mod entities;
pub mod schema;
pub mod value_objects;

pub use entities::{FieldMap, QueueEntry, QueueOperation, Record};
pub use schema::{CollectionModel, CollectionSpec, StoreSchema};
pub use value_objects::{
    ActorId, CollectionName, ConnectivityState, Operation, QueueEntryId, RecordId, TenantId,
};
