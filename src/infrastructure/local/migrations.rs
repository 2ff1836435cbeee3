use sqlx::{Sqlite, SqlitePool, Transaction};

use crate::domain::schema::StoreSchema;
use crate::domain::value_objects::CollectionName;
use crate::infrastructure::local::rows::index_value_text;
use crate::shared::error::{AppError, Result};

const META_SCHEMA_VERSION: &str = "schema_version";

/// Brings an opened database up to the declared schema: creates the base
/// tables, registers newly declared collections and indexes (backfilling
/// index rows from existing records), and records the schema version.
///
/// A persisted version newer than the declared one is refused; the caller
/// leaves the store inert and offers the destructive recovery.
pub async fn prepare(pool: &SqlitePool, schema: &StoreSchema) -> Result<()> {
    create_base_tables(pool).await?;

    let persisted = persisted_version(pool).await?;
    if persisted > schema.version() {
        return Err(AppError::Database(format!(
            "Schema version {persisted} on disk is newer than the declared version {}",
            schema.version()
        )));
    }

    register_declared(pool, schema).await?;
    set_version(pool, schema.version()).await?;

    if persisted < schema.version() {
        tracing::info!(
            from = persisted,
            to = schema.version(),
            "Upgraded local store schema"
        );
    }
    Ok(())
}

async fn create_base_tables(pool: &SqlitePool) -> Result<()> {
    let statements = [
        "CREATE TABLE IF NOT EXISTS records (
            collection TEXT NOT NULL,
            id TEXT NOT NULL,
            data TEXT NOT NULL,
            PRIMARY KEY (collection, id)
        )",
        "CREATE TABLE IF NOT EXISTS record_index (
            collection TEXT NOT NULL,
            field TEXT NOT NULL,
            value TEXT NOT NULL,
            record_id TEXT NOT NULL,
            PRIMARY KEY (collection, field, record_id)
        )",
        "CREATE INDEX IF NOT EXISTS idx_record_index_lookup
            ON record_index(collection, field, value)",
        "CREATE TABLE IF NOT EXISTS sync_queue (
            seq INTEGER PRIMARY KEY AUTOINCREMENT,
            id TEXT NOT NULL UNIQUE,
            collection TEXT NOT NULL,
            operation TEXT NOT NULL,
            payload TEXT NOT NULL,
            queued_at_ms INTEGER NOT NULL,
            actor TEXT NOT NULL
        )",
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_queued_at
            ON sync_queue(queued_at_ms)",
        "CREATE TABLE IF NOT EXISTS store_meta (
            key TEXT PRIMARY KEY,
            value TEXT NOT NULL
        )",
        "CREATE TABLE IF NOT EXISTS store_collections (
            name TEXT PRIMARY KEY
        )",
        "CREATE TABLE IF NOT EXISTS store_indexes (
            collection TEXT NOT NULL,
            field TEXT NOT NULL,
            PRIMARY KEY (collection, field)
        )",
    ];

    let mut tx = pool.begin().await?;
    for stmt in statements {
        sqlx::query(stmt).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    Ok(())
}

pub(crate) async fn persisted_version(pool: &SqlitePool) -> Result<u32> {
    let row: Option<(String,)> =
        sqlx::query_as("SELECT value FROM store_meta WHERE key = ?")
            .bind(META_SCHEMA_VERSION)
            .fetch_optional(pool)
            .await?;

    match row {
        Some((value,)) => value
            .parse::<u32>()
            .map_err(|e| AppError::Database(format!("Corrupt schema version '{value}': {e}"))),
        None => Ok(0),
    }
}

async fn set_version(pool: &SqlitePool, version: u32) -> Result<()> {
    sqlx::query(
        "INSERT INTO store_meta (key, value) VALUES (?, ?)
         ON CONFLICT(key) DO UPDATE SET value = excluded.value",
    )
    .bind(META_SCHEMA_VERSION)
    .bind(version.to_string())
    .execute(pool)
    .await?;
    Ok(())
}

/// Diffs the declared schema against what the store has registered. New
/// collections are recorded; new indexes are backfilled from the records
/// already on disk before being recorded, all in one transaction.
async fn register_declared(pool: &SqlitePool, schema: &StoreSchema) -> Result<()> {
    let mut tx = pool.begin().await?;

    for spec in schema.collections() {
        let known: Option<(String,)> =
            sqlx::query_as("SELECT name FROM store_collections WHERE name = ?")
                .bind(spec.name().as_str())
                .fetch_optional(&mut *tx)
                .await?;
        if known.is_none() {
            sqlx::query("INSERT INTO store_collections (name) VALUES (?)")
                .bind(spec.name().as_str())
                .execute(&mut *tx)
                .await?;
            tracing::info!(collection = %spec.name(), "Registered collection");
        }

        for field in spec.indexes() {
            let known: Option<(String,)> = sqlx::query_as(
                "SELECT field FROM store_indexes WHERE collection = ? AND field = ?",
            )
            .bind(spec.name().as_str())
            .bind(field)
            .fetch_optional(&mut *tx)
            .await?;
            if known.is_some() {
                continue;
            }

            backfill_index(&mut tx, spec.name(), field).await?;
            sqlx::query("INSERT INTO store_indexes (collection, field) VALUES (?, ?)")
                .bind(spec.name().as_str())
                .bind(field)
                .execute(&mut *tx)
                .await?;
            tracing::info!(collection = %spec.name(), field, "Registered index");
        }
    }

    tx.commit().await?;
    Ok(())
}

async fn backfill_index(
    tx: &mut Transaction<'_, Sqlite>,
    collection: &CollectionName,
    field: &str,
) -> Result<()> {
    let rows: Vec<(String, String)> =
        sqlx::query_as("SELECT id, data FROM records WHERE collection = ?")
            .bind(collection.as_str())
            .fetch_all(&mut **tx)
            .await?;

    let mut filled = 0u64;
    for (record_id, data) in rows {
        let fields: serde_json::Value = serde_json::from_str(&data)?;
        let Some(text) = fields.get(field).and_then(index_value_text) else {
            continue;
        };
        sqlx::query(
            "INSERT OR REPLACE INTO record_index (collection, field, value, record_id)
             VALUES (?, ?, ?, ?)",
        )
        .bind(collection.as_str())
        .bind(field)
        .bind(&text)
        .bind(&record_id)
        .execute(&mut **tx)
        .await?;
        filled += 1;
    }

    if filled > 0 {
        tracing::info!(collection = %collection, field, rows = filled, "Backfilled index");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::schema::CollectionSpec;
    use crate::infrastructure::database::connection_pool::ConnectionPool;

    fn schema_v1() -> StoreSchema {
        StoreSchema::new(1).with_collection(CollectionSpec::new(
            CollectionName::from_static("clients"),
        ))
    }

    fn schema_v2() -> StoreSchema {
        StoreSchema::new(2).with_collection(
            CollectionSpec::new(CollectionName::from_static("clients"))
                .with_index("companyId"),
        )
    }

    #[tokio::test]
    async fn prepare_is_idempotent() {
        let pool = ConnectionPool::from_memory().await.expect("pool");
        prepare(pool.get_pool(), &schema_v2()).await.expect("first");
        prepare(pool.get_pool(), &schema_v2()).await.expect("second");

        assert_eq!(persisted_version(pool.get_pool()).await.expect("version"), 2);
    }

    #[tokio::test]
    async fn newly_declared_index_is_backfilled_from_existing_records() {
        let pool = ConnectionPool::from_memory().await.expect("pool");
        prepare(pool.get_pool(), &schema_v1()).await.expect("v1");

        // Records written before the index existed.
        for (id, company) in [("c1", "acme"), ("c2", "acme"), ("c3", "other")] {
            sqlx::query("INSERT INTO records (collection, id, data) VALUES (?, ?, ?)")
                .bind("clients")
                .bind(id)
                .bind(format!(r#"{{"companyId":"{company}"}}"#))
                .execute(pool.get_pool())
                .await
                .expect("insert");
        }

        prepare(pool.get_pool(), &schema_v2()).await.expect("v2");

        let acme: (i64,) = sqlx::query_as(
            "SELECT COUNT(*) FROM record_index
             WHERE collection = 'clients' AND field = 'companyId' AND value = 'acme'",
        )
        .fetch_one(pool.get_pool())
        .await
        .expect("count");
        assert_eq!(acme.0, 2);
    }

    #[tokio::test]
    async fn newer_version_on_disk_is_refused() {
        let pool = ConnectionPool::from_memory().await.expect("pool");
        prepare(pool.get_pool(), &schema_v2()).await.expect("v2");

        let err = prepare(pool.get_pool(), &schema_v1())
            .await
            .expect_err("downgrade must fail");
        assert!(err.to_string().contains("newer"));
    }
}
