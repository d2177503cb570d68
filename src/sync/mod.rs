// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Sync from the authoritative store into the search index.
//!
//! Data only ever flows one way:
//!
//! ```text
//! RecordStore ──list_all / list_updated_since──→ to_document ──chunks──→ IndexStore::upsert_batch
//!                                                               (bounded retry per chunk)
//! ```
//!
//! Upserts are keyed by record id, so re-pushing a record is harmless. The
//! incremental pass re-reads a trailing window that is wider than its tick,
//! which gives a failed batch a second chance on the next tick. Soft-deleted
//! records travel as documents with `isDelete = 1` and overwrite the stale
//! copy; the query builder filters them out. Nothing is ever removed by sync.

mod report;

pub use report::{SyncMode, SyncReport};

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::config::IndexSyncConfig;
use crate::metrics;
use crate::model::{to_indexed, Entity};
use crate::resilience::retry::{retry, RetryConfig};
use crate::storage::traits::{IndexStore, IndexedDocument, RecordStore, StorageError};

/// Current wall clock in epoch millis.
pub fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default()
}

/// Tunables for one syncer, refreshed on config change.
#[derive(Debug, Clone)]
pub struct SyncOptions {
    pub batch_size: usize,
    pub window: Duration,
    pub retry: RetryConfig,
}

impl SyncOptions {
    pub fn from_config(config: &IndexSyncConfig) -> Self {
        Self {
            batch_size: config.sync_batch_size.max(1),
            window: config.sync_window(),
            retry: RetryConfig::sync_push(config.sync_push_max_retries),
        }
    }
}

impl Default for SyncOptions {
    fn default() -> Self {
        Self::from_config(&IndexSyncConfig::default())
    }
}

/// Type-erased sync entry point so the scheduler can drive every entity
/// type the same way.
#[async_trait]
pub trait SyncJob: Send + Sync {
    fn type_tag(&self) -> &'static str;

    async fn full_sync(&self) -> Result<SyncReport, StorageError>;

    async fn incremental_sync(&self, now_millis: i64) -> Result<SyncReport, StorageError>;

    fn set_options(&self, options: SyncOptions);
}

/// Pushes one entity type from its record store into its index.
pub struct IndexSyncer<R: Entity> {
    records: Arc<dyn RecordStore<R>>,
    index: Arc<dyn IndexStore>,
    options: RwLock<SyncOptions>,
}

impl<R: Entity> IndexSyncer<R> {
    pub fn new(records: Arc<dyn RecordStore<R>>, index: Arc<dyn IndexStore>, options: SyncOptions) -> Self {
        Self {
            records,
            index,
            options: RwLock::new(options),
        }
    }

    pub fn options(&self) -> SyncOptions {
        self.options.read().clone()
    }

    async fn push(&self, records: Vec<R>, mode: SyncMode) -> SyncReport {
        let kind = R::schema().type_tag;
        let options = self.options();
        let start = Instant::now();
        let mut report = SyncReport::empty(kind, mode);
        report.total = records.len();

        let mut docs: Vec<IndexedDocument> = Vec::with_capacity(records.len());
        for record in &records {
            match to_indexed(record) {
                Ok(doc) => docs.push(doc),
                Err(e) => {
                    warn!(kind, id = record.id(), error = %e, "Skipping record that cannot be mapped");
                    report.failed += 1;
                }
            }
        }

        let op_name = format!("{}_{}_push", kind, mode);
        for chunk in docs.chunks(options.batch_size.max(1)) {
            report.batches += 1;
            metrics::record_batch_size(kind, chunk.len());
            let index = &self.index;

            match retry(&op_name, &options.retry, || index.upsert_batch(chunk)).await {
                Ok(result) => {
                    report.succeeded += result.written;
                    report.failed += result.failed;
                    if result.failed > 0 {
                        warn!(kind, batch = report.batches, rejected = result.failed, "Index rejected part of a batch");
                    }
                }
                Err(e) => {
                    report.failed += chunk.len();
                    report.failed_batches += 1;
                    error!(kind, batch = report.batches, size = chunk.len(), error = %e, "Batch push failed after retries");
                }
            }
        }

        metrics::record_sync_documents(kind, report.succeeded, report.failed);
        metrics::record_sync_latency(kind, mode.as_str(), start.elapsed());
        metrics::record_sync_run(kind, mode.as_str(), if report.is_success() { "success" } else { "error" });

        info!(
            kind,
            mode = %mode,
            total = report.total,
            succeeded = report.succeeded,
            failed = report.failed,
            batches = report.batches,
            "Sync pass complete"
        );
        report
    }
}

#[async_trait]
impl<R: Entity> SyncJob for IndexSyncer<R> {
    fn type_tag(&self) -> &'static str {
        R::schema().type_tag
    }

    /// Push every live record.
    #[instrument(skip(self), fields(kind = R::schema().type_tag))]
    async fn full_sync(&self) -> Result<SyncReport, StorageError> {
        let kind = R::schema().type_tag;
        let records = self.records.list_all().await.inspect_err(|_| {
            metrics::record_sync_run(kind, "full", "error");
        })?;

        if records.is_empty() {
            info!(kind, "No records to sync");
            return Ok(SyncReport::empty(kind, SyncMode::Full));
        }
        debug!(kind, count = records.len(), "Starting full sync");
        Ok(self.push(records, SyncMode::Full).await)
    }

    /// Push every record updated within the window ending at `now_millis`.
    #[instrument(skip(self), fields(kind = R::schema().type_tag))]
    async fn incremental_sync(&self, now_millis: i64) -> Result<SyncReport, StorageError> {
        let kind = R::schema().type_tag;
        let window_ms = self.options.read().window.as_millis() as i64;
        let since = now_millis.saturating_sub(window_ms);

        let records = self.records.list_updated_since(since).await.inspect_err(|_| {
            metrics::record_sync_run(kind, "incremental", "error");
        })?;

        if records.is_empty() {
            info!(kind, since, "No records changed in window");
            return Ok(SyncReport::empty(kind, SyncMode::Incremental));
        }
        debug!(kind, since, count = records.len(), "Starting incremental sync");
        Ok(self.push(records, SyncMode::Incremental).await)
    }

    fn set_options(&self, options: SyncOptions) {
        *self.options.write() = options;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Post;
    use crate::storage::memory::{InMemoryIndex, InMemoryRecordStore};

    fn post(id: i64, update_time: i64, is_delete: i32) -> Post {
        Post { id, title: format!("post {}", id), update_time, is_delete, ..Default::default() }
    }

    fn syncer(
        records: Vec<Post>,
        batch_size: usize,
    ) -> (IndexSyncer<Post>, Arc<InMemoryRecordStore<Post>>, Arc<InMemoryIndex>) {
        let store = Arc::new(InMemoryRecordStore::with_records(records));
        let index = Arc::new(InMemoryIndex::new("post"));
        let options = SyncOptions {
            batch_size,
            window: Duration::from_millis(300),
            retry: RetryConfig::test(),
        };
        (IndexSyncer::new(store.clone(), index.clone(), options), store, index)
    }

    #[tokio::test]
    async fn test_full_sync_batches() {
        let posts: Vec<Post> = (1..=1200).map(|id| post(id, 0, 0)).collect();
        let (syncer, _, index) = syncer(posts, 500);

        let report = syncer.full_sync().await.unwrap();
        assert_eq!(report.total, 1200);
        assert_eq!(report.succeeded, 1200);
        assert_eq!(report.batches, 3);
        assert!(report.is_success());
        assert_eq!(index.len(), 1200);
        assert_eq!(index.upsert_calls(), 3);
    }

    #[tokio::test]
    async fn test_full_sync_skips_soft_deleted() {
        let (syncer, _, index) = syncer(vec![post(1, 0, 0), post(2, 0, 1)], 10);
        syncer.full_sync().await.unwrap();
        assert!(index.contains(1));
        assert!(!index.contains(2));
    }

    #[tokio::test]
    async fn test_empty_source_is_noop() {
        let (syncer, _, index) = syncer(vec![], 10);
        let report = syncer.full_sync().await.unwrap();
        assert!(report.is_empty());
        assert_eq!(index.upsert_calls(), 0);

        let report = syncer.incremental_sync(10_000).await.unwrap();
        assert!(report.is_empty());
        assert_eq!(index.upsert_calls(), 0);
    }

    #[tokio::test]
    async fn test_incremental_window() {
        let (syncer, _, index) = syncer(vec![post(1, 100, 0), post(2, 800, 0), post(3, 1_000, 0)], 10);

        // window is 300ms: since = 700
        let report = syncer.incremental_sync(1_000).await.unwrap();
        assert_eq!(report.total, 2);
        assert!(!index.contains(1));
        assert!(index.contains(2));
        assert!(index.contains(3));
    }

    #[tokio::test]
    async fn test_incremental_propagates_soft_delete() {
        let (syncer, store, index) = syncer(vec![post(1, 100, 0)], 10);
        syncer.full_sync().await.unwrap();
        assert_eq!(index.get(1).unwrap()["isDelete"], 0);

        store.insert(post(1, 950, 1));
        syncer.incremental_sync(1_000).await.unwrap();
        assert_eq!(index.get(1).unwrap()["isDelete"], 1);
    }

    #[tokio::test]
    async fn test_repeated_sync_is_idempotent() {
        let (syncer, _, index) = syncer(vec![post(1, 0, 0), post(2, 0, 0)], 10);
        syncer.full_sync().await.unwrap();
        let first = index.get(1);
        syncer.full_sync().await.unwrap();
        assert_eq!(index.len(), 2);
        assert_eq!(index.get(1), first);
    }

    #[tokio::test]
    async fn test_set_options() {
        let (syncer, _, _) = syncer(vec![], 10);
        syncer.set_options(SyncOptions { batch_size: 7, ..SyncOptions::default() });
        assert_eq!(syncer.options().batch_size, 7);
        assert_eq!(syncer.type_tag(), "post");
    }
}
