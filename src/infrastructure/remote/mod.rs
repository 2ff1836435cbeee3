pub mod memory;
pub mod timestamp;

pub use memory::MemoryRemoteStore;
pub use timestamp::{RemoteTimestamp, RemoteTimestampCodec};
