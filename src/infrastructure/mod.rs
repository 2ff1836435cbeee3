pub mod database;
pub mod local;
pub mod remote;

pub use local::SqliteLocalStore;
pub use remote::MemoryRemoteStore;
