use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use crate::application::ports::local_store::{LocalStore, StoreStatus};
use crate::domain::entities::{QueueEntry, Record};
use crate::domain::schema::StoreSchema;
use crate::domain::value_objects::{CollectionName, QueueEntryId, RecordId};
use crate::infrastructure::database::connection_pool::{database_path, ConnectionPool};
use crate::infrastructure::local::migrations;
use crate::infrastructure::local::rows::{
    encode_payload, index_value_text, QueueEntryRow, RecordRow,
};
use crate::shared::config::DatabaseConfig;
use crate::shared::error::{AppError, Result};

enum StoreInner {
    Ready(ConnectionPool),
    Inert { reason: String },
}

/// SQLite-backed record cache and sync queue.
///
/// Opening never fails: when the database cannot be opened or upgraded the
/// store goes inert (reads empty, mutations return `StoreUnavailable`) until
/// `reset` recreates it. The application keeps working against the remote
/// service in the meantime.
pub struct SqliteLocalStore {
    schema: StoreSchema,
    config: DatabaseConfig,
    inner: RwLock<StoreInner>,
}

impl SqliteLocalStore {
    pub async fn open(config: DatabaseConfig, schema: StoreSchema) -> Self {
        let inner = match Self::connect(&config, &schema).await {
            Ok(pool) => {
                tracing::info!(
                    url = %config.url,
                    version = schema.version(),
                    "Opened local record store"
                );
                StoreInner::Ready(pool)
            }
            Err(err) => {
                tracing::error!(
                    url = %config.url,
                    error = %err,
                    "Failed to open local record store; continuing without a cache"
                );
                StoreInner::Inert {
                    reason: err.to_string(),
                }
            }
        };
        Self {
            schema,
            config,
            inner: RwLock::new(inner),
        }
    }

    async fn connect(config: &DatabaseConfig, schema: &StoreSchema) -> Result<ConnectionPool> {
        let pool = ConnectionPool::new(config).await?;
        migrations::prepare(pool.get_pool(), schema).await?;
        Ok(pool)
    }

    /// Pool for reads; None while inert.
    async fn reader(&self) -> Option<ConnectionPool> {
        match &*self.inner.read().await {
            StoreInner::Ready(pool) => Some(pool.clone()),
            StoreInner::Inert { .. } => None,
        }
    }

    /// Pool for mutations; inert stores refuse them with a distinguishable
    /// error.
    async fn writer(&self) -> Result<ConnectionPool> {
        match &*self.inner.read().await {
            StoreInner::Ready(pool) => Ok(pool.clone()),
            StoreInner::Inert { reason } => Err(AppError::StoreUnavailable(reason.clone())),
        }
    }

    fn require_index(&self, collection: &CollectionName, field: &str) -> Result<()> {
        let Some(spec) = self.schema.collection(collection) else {
            return Err(AppError::Validation(format!(
                "Unknown collection: {collection}"
            )));
        };
        if !spec.has_index(field) {
            return Err(AppError::Validation(format!(
                "No declared index on {collection}.{field}"
            )));
        }
        Ok(())
    }

    fn remove_database_files(&self) {
        let Some(path) = database_path(&self.config.url) else {
            return;
        };
        let path_str = path.display().to_string();
        let sidecar = |suffix: &str| {
            let mut os = path.clone().into_os_string();
            os.push(suffix);
            std::path::PathBuf::from(os)
        };
        for candidate in [path.clone(), sidecar("-wal"), sidecar("-shm")] {
            match std::fs::remove_file(&candidate) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %candidate.display(), error = %e, "Could not remove database file");
                }
            }
        }
        tracing::info!(path = %path_str, "Deleted local record store files");
    }
}

#[async_trait]
impl LocalStore for SqliteLocalStore {
    async fn get(
        &self,
        collection: &CollectionName,
        id: &RecordId,
    ) -> Result<Option<Record>> {
        let Some(pool) = self.reader().await else {
            return Ok(None);
        };
        let row: Option<RecordRow> =
            sqlx::query_as("SELECT id, data FROM records WHERE collection = ? AND id = ?")
                .bind(collection.as_str())
                .bind(id.as_str())
                .fetch_optional(pool.get_pool())
                .await?;
        row.map(RecordRow::into_record).transpose()
    }

    async fn get_all(&self, collection: &CollectionName) -> Result<Vec<Record>> {
        let Some(pool) = self.reader().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<RecordRow> =
            sqlx::query_as("SELECT id, data FROM records WHERE collection = ? ORDER BY id")
                .bind(collection.as_str())
                .fetch_all(pool.get_pool())
                .await?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn get_all_by_index(
        &self,
        collection: &CollectionName,
        field: &str,
        value: &Value,
    ) -> Result<Vec<Record>> {
        self.require_index(collection, field)?;
        let Some(pool) = self.reader().await else {
            return Ok(Vec::new());
        };
        let Some(text) = index_value_text(value) else {
            // Non-scalar values are never indexed, so nothing can match.
            return Ok(Vec::new());
        };

        let rows: Vec<RecordRow> = sqlx::query_as(
            "SELECT r.id, r.data FROM records r
             JOIN record_index i
               ON i.collection = r.collection AND i.record_id = r.id
             WHERE i.collection = ? AND i.field = ? AND i.value = ?
             ORDER BY r.id",
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(&text)
        .fetch_all(pool.get_pool())
        .await?;
        rows.into_iter().map(RecordRow::into_record).collect()
    }

    async fn put(&self, collection: &CollectionName, record: &Record) -> Result<()> {
        let Some(spec) = self.schema.collection(collection) else {
            return Err(AppError::Validation(format!(
                "Unknown collection: {collection}"
            )));
        };
        let pool = self.writer().await?;
        let data = serde_json::to_string(&record.fields)?;

        let mut tx = pool.get_pool().begin().await?;
        sqlx::query(
            "INSERT INTO records (collection, id, data) VALUES (?, ?, ?)
             ON CONFLICT(collection, id) DO UPDATE SET data = excluded.data",
        )
        .bind(collection.as_str())
        .bind(record.id.as_str())
        .bind(&data)
        .execute(&mut *tx)
        .await?;

        // Index rows are rebuilt wholesale so stale values cannot linger.
        sqlx::query("DELETE FROM record_index WHERE collection = ? AND record_id = ?")
            .bind(collection.as_str())
            .bind(record.id.as_str())
            .execute(&mut *tx)
            .await?;
        for field in spec.indexes() {
            let Some(text) = record.get(field).and_then(index_value_text) else {
                continue;
            };
            sqlx::query(
                "INSERT INTO record_index (collection, field, value, record_id)
                 VALUES (?, ?, ?, ?)",
            )
            .bind(collection.as_str())
            .bind(field)
            .bind(&text)
            .bind(record.id.as_str())
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    async fn delete(&self, collection: &CollectionName, id: &RecordId) -> Result<()> {
        let pool = self.writer().await?;
        let mut tx = pool.get_pool().begin().await?;
        let result = sqlx::query("DELETE FROM records WHERE collection = ? AND id = ?")
            .bind(collection.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        sqlx::query("DELETE FROM record_index WHERE collection = ? AND record_id = ?")
            .bind(collection.as_str())
            .bind(id.as_str())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;

        if result.rows_affected() == 0 {
            tracing::debug!(collection = %collection, id = %id, "Delete of absent record");
        }
        Ok(())
    }

    async fn enqueue(&self, entry: &QueueEntry) -> Result<()> {
        let pool = self.writer().await?;
        let payload = encode_payload(&entry.operation).to_string();
        sqlx::query(
            "INSERT INTO sync_queue (id, collection, operation, payload, queued_at_ms, actor)
             VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.id.as_str())
        .bind(entry.collection.as_str())
        .bind(entry.operation.kind().as_str())
        .bind(&payload)
        .bind(entry.queued_at.timestamp_millis())
        .bind(entry.actor.as_str())
        .execute(pool.get_pool())
        .await?;
        tracing::debug!(
            collection = %entry.collection,
            operation = %entry.operation.kind(),
            id = %entry.id,
            "Queued offline mutation"
        );
        Ok(())
    }

    async fn queued_entries(&self) -> Result<Vec<QueueEntry>> {
        let Some(pool) = self.reader().await else {
            return Ok(Vec::new());
        };
        let rows: Vec<QueueEntryRow> = sqlx::query_as(
            "SELECT seq, id, collection, operation, payload, queued_at_ms, actor
             FROM sync_queue ORDER BY queued_at_ms ASC, seq ASC",
        )
        .fetch_all(pool.get_pool())
        .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let entry_id = row.id.clone();
            match QueueEntry::try_from(row) {
                Ok(entry) => entries.push(entry),
                // A corrupt row must not wedge the whole drain; it stays in
                // the table for inspection.
                Err(err) => {
                    tracing::error!(id = %entry_id, error = %err, "Skipping corrupt queue entry")
                }
            }
        }
        Ok(entries)
    }

    async fn remove_entry(&self, id: &QueueEntryId) -> Result<()> {
        let pool = self.writer().await?;
        sqlx::query("DELETE FROM sync_queue WHERE id = ?")
            .bind(id.as_str())
            .execute(pool.get_pool())
            .await?;
        Ok(())
    }

    async fn pending_count(&self) -> Result<u64> {
        let Some(pool) = self.reader().await else {
            return Ok(0);
        };
        let count: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sync_queue")
            .fetch_one(pool.get_pool())
            .await?;
        Ok(count.0 as u64)
    }

    async fn status(&self) -> StoreStatus {
        match &*self.inner.read().await {
            StoreInner::Ready(_) => StoreStatus::Available,
            StoreInner::Inert { reason } => StoreStatus::Unavailable {
                reason: reason.clone(),
            },
        }
    }

    async fn clear(&self) -> Result<()> {
        let pool = self.writer().await?;
        let mut tx = pool.get_pool().begin().await?;
        for stmt in [
            "DELETE FROM records",
            "DELETE FROM record_index",
            "DELETE FROM sync_queue",
        ] {
            sqlx::query(stmt).execute(&mut *tx).await?;
        }
        tx.commit().await?;
        tracing::info!("Cleared local record store data");
        Ok(())
    }

    async fn reset(&self) -> Result<()> {
        let mut inner = self.inner.write().await;
        if let StoreInner::Ready(pool) = &*inner {
            pool.close().await;
        }
        self.remove_database_files();

        match Self::connect(&self.config, &self.schema).await {
            Ok(pool) => {
                tracing::info!(
                    version = self.schema.version(),
                    "Recreated local record store"
                );
                *inner = StoreInner::Ready(pool);
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to recreate local record store");
                *inner = StoreInner::Inert {
                    reason: err.to_string(),
                };
                Err(err)
            }
        }
    }
}
