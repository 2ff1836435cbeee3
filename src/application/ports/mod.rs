pub mod local_store;
pub mod remote_store;

pub use local_store::{LocalStore, StoreStatus};
pub use remote_store::{EqualityFilter, RemoteError, RemoteStore, SnapshotStream, TimestampCodec};
