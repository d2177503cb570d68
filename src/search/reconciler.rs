// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Background removal of stale index documents.
//!
//! When a search surfaces a hit whose authoritative record no longer exists,
//! the executor hands the id to the [`Reconciler`] and moves on. Deletes are
//! queued on a bounded channel and executed by a small fixed pool of workers:
//!
//! ```text
//! SearchExecutor ──try_send──→ [ bounded mpsc queue ] ──→ worker 0 ─┐
//!        (never blocks)                                 ──→ worker 1 ─┼─→ IndexStore::delete_by_id
//!                                                       ──→ worker N ─┘
//! ```
//!
//! A full queue drops the task with a warning: the next search that surfaces
//! the same stale hit enqueues it again.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, watch, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::storage::traits::IndexStore;

/// Worker pool sizing
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 1024,
        }
    }
}

/// Snapshot of reconciler counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconcileStats {
    /// Tasks accepted onto the queue
    pub enqueued: u64,
    /// Deletes that succeeded
    pub completed: u64,
    /// Deletes the index rejected
    pub failed: u64,
    /// Tasks refused because the queue was full or closed
    pub dropped: u64,
    /// Accepted tasks not yet finished
    pub pending: usize,
}

struct ReconcileTask {
    index: Arc<dyn IndexStore>,
    kind: &'static str,
    id: i64,
}

#[derive(Default)]
struct Shared {
    enqueued: AtomicU64,
    completed: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
    pending: AtomicUsize,
    idle: Notify,
}

impl Shared {
    fn finish_one(&self) {
        let remaining = self.pending.fetch_sub(1, Ordering::AcqRel) - 1;
        metrics::set_reconcile_queue_depth(remaining);
        if remaining == 0 {
            self.idle.notify_waiters();
        }
    }
}

struct Inner {
    tx: mpsc::Sender<ReconcileTask>,
    shared: Arc<Shared>,
    shutdown_tx: watch::Sender<bool>,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

/// Bounded queue + worker pool for index deletes. Cheap to clone.
///
/// Must be created from within a Tokio runtime.
#[derive(Clone)]
pub struct Reconciler {
    inner: Arc<Inner>,
}

impl Reconciler {
    pub fn new(config: ReconcileConfig) -> Self {
        let (tx, rx) = mpsc::channel(config.queue_capacity.max(1));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let shared = Arc::new(Shared::default());
        let rx = Arc::new(tokio::sync::Mutex::new(rx));

        let workers = (0..config.workers.max(1))
            .map(|worker| {
                tokio::spawn(worker_loop(
                    worker,
                    rx.clone(),
                    shared.clone(),
                    shutdown_rx.clone(),
                ))
            })
            .collect();

        debug!(workers = config.workers.max(1), capacity = config.queue_capacity, "Reconciler started");

        Self {
            inner: Arc::new(Inner {
                tx,
                shared,
                shutdown_tx,
                workers: Mutex::new(workers),
            }),
        }
    }

    /// Queue a delete of `id` from `index`. Never blocks; returns false if
    /// the task was dropped.
    pub fn enqueue(&self, index: Arc<dyn IndexStore>, kind: &'static str, id: i64) -> bool {
        let shared = &self.inner.shared;
        shared.pending.fetch_add(1, Ordering::AcqRel);

        match self.inner.tx.try_send(ReconcileTask { index, kind, id }) {
            Ok(()) => {
                shared.enqueued.fetch_add(1, Ordering::Relaxed);
                metrics::set_reconcile_queue_depth(shared.pending.load(Ordering::Acquire));
                true
            }
            Err(e) => {
                shared.dropped.fetch_add(1, Ordering::Relaxed);
                metrics::record_reconcile(kind, "dropped");
                match e {
                    TrySendError::Full(_) => {
                        warn!(kind, id, "Reconcile queue full, dropping stale-document delete");
                    }
                    TrySendError::Closed(_) => {
                        debug!(kind, id, "Reconciler shut down, dropping stale-document delete");
                    }
                }
                shared.finish_one();
                false
            }
        }
    }

    #[must_use]
    pub fn stats(&self) -> ReconcileStats {
        let shared = &self.inner.shared;
        ReconcileStats {
            enqueued: shared.enqueued.load(Ordering::Relaxed),
            completed: shared.completed.load(Ordering::Relaxed),
            failed: shared.failed.load(Ordering::Relaxed),
            dropped: shared.dropped.load(Ordering::Relaxed),
            pending: shared.pending.load(Ordering::Acquire),
        }
    }

    /// Wait until every accepted task has been processed.
    pub async fn wait_idle(&self) {
        let shared = &self.inner.shared;
        loop {
            let notified = shared.idle.notified();
            if shared.pending.load(Ordering::Acquire) == 0 {
                return;
            }
            notified.await;
        }
    }

    /// Stop accepting work, drain what is queued and join the workers.
    /// Safe to call more than once.
    pub async fn shutdown(&self) {
        let _ = self.inner.shutdown_tx.send(true);
        let handles: Vec<JoinHandle<()>> = std::mem::take(&mut *self.inner.workers.lock());
        for handle in handles {
            if let Err(e) = handle.await {
                warn!(error = %e, "Reconcile worker panicked");
            }
        }
    }
}

async fn worker_loop(
    worker: usize,
    rx: Arc<tokio::sync::Mutex<mpsc::Receiver<ReconcileTask>>>,
    shared: Arc<Shared>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        let task = {
            let mut guard = rx.lock().await;
            if *shutdown.borrow() {
                guard.close();
                guard.try_recv().ok()
            } else {
                let received = tokio::select! {
                    task = guard.recv() => Some(task),
                    _ = shutdown.changed() => None,
                };
                match received {
                    Some(task) => task,
                    // Shutting down: refuse new sends, keep draining without waiting
                    None => {
                        guard.close();
                        guard.try_recv().ok()
                    }
                }
            }
        };

        let Some(task) = task else { break };
        process(task, &shared).await;
    }
    debug!(worker, "Reconcile worker stopped");
}

async fn process(task: ReconcileTask, shared: &Shared) {
    match task.index.delete_by_id(task.id).await {
        Ok(()) => {
            shared.completed.fetch_add(1, Ordering::Relaxed);
            metrics::record_reconcile(task.kind, "deleted");
            info!(kind = task.kind, index = task.index.name(), id = task.id, "Removed stale document from index");
        }
        Err(e) => {
            shared.failed.fetch_add(1, Ordering::Relaxed);
            metrics::record_reconcile(task.kind, "error");
            warn!(kind = task.kind, id = task.id, error = %e, "Failed to remove stale document");
        }
    }
    shared.finish_one();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::memory::InMemoryIndex;
    use crate::storage::traits::IndexedDocument;
    use serde_json::json;

    async fn seeded_index(ids: &[i64]) -> Arc<InMemoryIndex> {
        let index = Arc::new(InMemoryIndex::new("post"));
        let docs: Vec<IndexedDocument> = ids
            .iter()
            .map(|id| IndexedDocument { id: *id, source: json!({"id": id, "isDelete": 0}) })
            .collect();
        index.upsert_batch(&docs).await.unwrap();
        index
    }

    #[tokio::test]
    async fn test_enqueue_deletes_document() {
        let index = seeded_index(&[1, 2]).await;
        let reconciler = Reconciler::new(ReconcileConfig::default());

        assert!(reconciler.enqueue(index.clone(), "post", 1));
        reconciler.wait_idle().await;

        assert!(!index.contains(1));
        assert!(index.contains(2));
        assert_eq!(index.delete_calls(), 1);

        let stats = reconciler.stats();
        assert_eq!(stats.enqueued, 1);
        assert_eq!(stats.completed, 1);
        assert_eq!(stats.pending, 0);
    }

    #[tokio::test]
    async fn test_wait_idle_with_nothing_queued() {
        let reconciler = Reconciler::new(ReconcileConfig::default());
        reconciler.wait_idle().await;
        assert_eq!(reconciler.stats(), ReconcileStats::default());
    }

    #[tokio::test]
    async fn test_many_tasks_across_workers() {
        let ids: Vec<i64> = (0..50).collect();
        let index = seeded_index(&ids).await;
        let reconciler = Reconciler::new(ReconcileConfig { workers: 4, queue_capacity: 64 });

        for id in &ids {
            assert!(reconciler.enqueue(index.clone(), "post", *id));
        }
        reconciler.wait_idle().await;

        assert!(index.is_empty());
        assert_eq!(reconciler.stats().completed, 50);
    }

    #[tokio::test]
    async fn test_shutdown_drains_and_refuses_new_work() {
        let index = seeded_index(&[1, 2, 3, 9]).await;
        let reconciler = Reconciler::new(ReconcileConfig { workers: 1, queue_capacity: 8 });

        for id in 1..=3 {
            assert!(reconciler.enqueue(index.clone(), "post", id));
        }
        reconciler.shutdown().await;
        assert_eq!(index.len(), 1);

        // channel is closed once the workers stop
        assert!(!reconciler.enqueue(index.clone(), "post", 9));
        let stats = reconciler.stats();
        assert_eq!(stats.completed, 3);
        assert_eq!(stats.dropped, 1);
        assert_eq!(stats.pending, 0);
        assert!(index.contains(9));

        tokio::time::timeout(std::time::Duration::from_secs(1), reconciler.wait_idle())
            .await
            .expect("wait_idle must not hang after shutdown");
        reconciler.shutdown().await;
    }

    #[tokio::test]
    async fn test_enqueue_racing_shutdown_never_strands_work() {
        let ids: Vec<i64> = (0..200).collect();
        let index = seeded_index(&ids).await;
        let reconciler = Reconciler::new(ReconcileConfig { workers: 2, queue_capacity: 256 });

        let producer = tokio::spawn({
            let reconciler = reconciler.clone();
            let index = index.clone();
            async move {
                for id in 0..200 {
                    reconciler.enqueue(index.clone(), "post", id);
                    tokio::task::yield_now().await;
                }
            }
        });
        tokio::task::yield_now().await;
        reconciler.shutdown().await;
        producer.await.unwrap();

        // every accepted task either ran or is refused; nothing is left pending
        tokio::time::timeout(std::time::Duration::from_secs(1), reconciler.wait_idle())
            .await
            .expect("accepted tasks must all finish");
        let stats = reconciler.stats();
        assert_eq!(stats.pending, 0);
        assert_eq!(stats.enqueued, stats.completed);
        assert_eq!(stats.enqueued + stats.dropped, 200);
    }
}
