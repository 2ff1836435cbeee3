use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::shared::config::DatabaseConfig;
use crate::shared::error::{AppError, Result};

#[derive(Clone)]
pub struct ConnectionPool {
    pool: Arc<SqlitePool>,
}

impl ConnectionPool {
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        if let Some(path) = database_path(&config.url) {
            if let Some(dir) = path.parent() {
                if !dir.as_os_str().is_empty() {
                    std::fs::create_dir_all(dir).map_err(|e| {
                        AppError::Database(format!(
                            "Failed to create database directory {}: {e}",
                            dir.display()
                        ))
                    })?;
                }
            }
        }

        let options = SqliteConnectOptions::from_str(&config.url)
            .map_err(|e| AppError::Database(format!("Invalid database url: {e}")))?
            .create_if_missing(true);

        // A private in-memory database lives and dies with its connection,
        // so the pool must hold exactly one open at all times.
        let (max, min) = if is_memory_url(&config.url) {
            (1, 1)
        } else {
            (config.max_connections, 0)
        };

        let pool = SqlitePoolOptions::new()
            .max_connections(max)
            .min_connections(min)
            .acquire_timeout(Duration::from_secs(config.connection_timeout))
            .connect_with(options)
            .await?;

        Ok(Self {
            pool: Arc::new(pool),
        })
    }

    pub async fn from_memory() -> Result<Self> {
        Self::new(&DatabaseConfig {
            url: "sqlite::memory:".to_string(),
            max_connections: 1,
            connection_timeout: 30,
        })
        .await
    }

    pub fn get_pool(&self) -> &SqlitePool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

/// Filesystem path behind a sqlite url, when it has one.
pub(crate) fn database_path(url: &str) -> Option<PathBuf> {
    let rest = url
        .strip_prefix("sqlite://")
        .or_else(|| url.strip_prefix("sqlite:"))?;
    let path = rest.split('?').next().unwrap_or(rest);
    if path.is_empty() || path.starts_with(":memory:") {
        return None;
    }
    Some(PathBuf::from(path))
}

pub(crate) fn is_memory_url(url: &str) -> bool {
    url.contains(":memory:")
}
