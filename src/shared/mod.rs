pub mod config;
pub mod error;

pub use config::{AppConfig, DatabaseConfig, SyncConfig};
pub use error::{AppError, Result};
