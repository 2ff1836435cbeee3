use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::application::ports::{LocalStore, RemoteStore};
use crate::domain::entities::{QueueEntry, QueueOperation, Record};
use crate::domain::value_objects::RecordId;
use crate::shared::error::Result;

/// Counts from one completed drain pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct DrainReport {
    pub succeeded: u32,
    pub failed: u32,
}

impl DrainReport {
    pub fn attempted(&self) -> u32 {
        self.succeeded + self.failed
    }
}

/// What a drain request amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    Completed(DrainReport),
    /// Another drain held the guard; nothing was replayed by this call.
    AlreadyRunning,
}

/// Durable replay of mutations that could not reach the remote service.
///
/// Entries replay oldest first, so a record's create always lands before any
/// later update to it. A failed entry is logged, counted, and left queued for
/// the next pass; it never blocks the entries behind it.
pub struct SyncQueue {
    local: Arc<dyn LocalStore>,
    remote: Arc<dyn RemoteStore>,
    draining: AtomicBool,
}

impl SyncQueue {
    pub fn new(local: Arc<dyn LocalStore>, remote: Arc<dyn RemoteStore>) -> Self {
        Self {
            local,
            remote,
            draining: AtomicBool::new(false),
        }
    }

    pub async fn enqueue(&self, entry: QueueEntry) -> Result<()> {
        if let Err(err) = self.local.enqueue(&entry).await {
            tracing::warn!(
                collection = %entry.collection,
                operation = entry.operation.kind().as_str(),
                "Could not queue mutation for replay: {}",
                err
            );
            return Err(err);
        }
        Ok(())
    }

    pub async fn pending_count(&self) -> Result<u64> {
        self.local.pending_count().await
    }

    /// Replays every queued entry against the remote service. At most one
    /// drain runs at a time; a request that arrives while one is in flight
    /// returns `AlreadyRunning` without touching the queue.
    pub async fn drain(&self) -> Result<DrainOutcome> {
        if self
            .draining
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            tracing::debug!("Drain request coalesced into the drain already in flight");
            return Ok(DrainOutcome::AlreadyRunning);
        }

        let result = self.drain_all().await;
        self.draining.store(false, Ordering::SeqCst);
        result.map(DrainOutcome::Completed)
    }

    async fn drain_all(&self) -> Result<DrainReport> {
        let entries = self.local.queued_entries().await?;
        let mut report = DrainReport::default();

        for entry in &entries {
            match self.replay(entry).await {
                Ok(()) => match self.local.remove_entry(&entry.id).await {
                    Ok(()) => report.succeeded += 1,
                    Err(err) => {
                        report.failed += 1;
                        tracing::error!(
                            collection = %entry.collection,
                            record = %entry.operation.record_id(),
                            "Replayed entry could not be removed from the queue: {}",
                            err
                        );
                    }
                },
                Err(err) => {
                    report.failed += 1;
                    tracing::warn!(
                        collection = %entry.collection,
                        operation = entry.operation.kind().as_str(),
                        record = %entry.operation.record_id(),
                        "Replay failed, entry stays queued: {}",
                        err
                    );
                }
            }
        }

        if report.attempted() > 0 {
            tracing::info!(
                succeeded = report.succeeded,
                failed = report.failed,
                "Sync queue drained"
            );
        }
        Ok(report)
    }

    async fn replay(&self, entry: &QueueEntry) -> Result<()> {
        match &entry.operation {
            QueueOperation::Create { record } => {
                let assigned = self
                    .remote
                    .add(&entry.collection, record.fields.clone())
                    .await?;
                self.rekey_cached(entry, record, assigned).await;
                Ok(())
            }
            QueueOperation::Update { id, changes } => {
                self.remote
                    .update(&entry.collection, id, changes.clone())
                    .await?;
                Ok(())
            }
            QueueOperation::Delete { id } => {
                self.remote.delete(&entry.collection, id).await?;
                Ok(())
            }
        }
    }

    /// Moves the cached copy of a replayed create under the id the remote
    /// service assigned. The remote add already happened, so a cache failure
    /// here must not requeue the entry; it is logged and the drain moves on.
    async fn rekey_cached(&self, entry: &QueueEntry, record: &Record, assigned: RecordId) {
        if assigned != record.id {
            if let Err(err) = self.local.delete(&entry.collection, &record.id).await {
                tracing::warn!(
                    collection = %entry.collection,
                    local_id = %record.id,
                    "Could not drop the temporary cached copy: {}",
                    err
                );
            }
        }
        let rekeyed = record.clone().with_id(assigned.clone());
        if let Err(err) = self.local.put(&entry.collection, &rekeyed).await {
            tracing::warn!(
                collection = %entry.collection,
                id = %assigned,
                "Could not cache the replayed record under its final id: {}",
                err
            );
        } else {
            tracing::debug!(
                collection = %entry.collection,
                local_id = %record.id,
                id = %assigned,
                "Replayed create rekeyed in the local cache"
            );
        }
    }
}
