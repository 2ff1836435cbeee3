pub mod actor;
pub mod collection;
pub mod connectivity;
pub mod operation;
pub mod queue_entry_id;
pub mod record_id;
pub mod tenant;

pub use actor::ActorId;
pub use collection::CollectionName;
pub use connectivity::ConnectivityState;
pub use operation::Operation;
pub use queue_entry_id::QueueEntryId;
pub use record_id::RecordId;
pub use tenant::TenantId;
