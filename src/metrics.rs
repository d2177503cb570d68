// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Metrics instrumentation for index-sync.
//!
//! Uses the `metrics` crate for backend-agnostic metrics collection.
//! The host process is responsible for choosing the exporter (Prometheus, OTEL, etc.)
//!
//! # Metric Naming Convention
//! - `index_sync_` prefix for all metrics
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Labels
//! - `kind`: datasource type tag (post, user, chart)
//! - `mode`: full, incremental
//! - `status`: success, error, rejected

use metrics::{counter, gauge, histogram};
use std::time::{Duration, Instant};

/// Record the outcome of one sync run for an entity type
pub fn record_sync_run(kind: &str, mode: &str, status: &str) {
    counter!(
        "index_sync_sync_runs_total",
        "kind" => kind.to_string(),
        "mode" => mode.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record documents pushed (or rejected) during a sync run
pub fn record_sync_documents(kind: &str, written: usize, failed: usize) {
    counter!("index_sync_documents_written_total", "kind" => kind.to_string())
        .increment(written as u64);
    if failed > 0 {
        counter!("index_sync_documents_failed_total", "kind" => kind.to_string())
            .increment(failed as u64);
    }
}

/// Record sync run duration
pub fn record_sync_latency(kind: &str, mode: &str, duration: Duration) {
    histogram!(
        "index_sync_sync_seconds",
        "kind" => kind.to_string(),
        "mode" => mode.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record batch size
pub fn record_batch_size(kind: &str, count: usize) {
    histogram!(
        "index_sync_batch_size",
        "kind" => kind.to_string()
    )
    .record(count as f64);
}

/// Record a search query
pub fn record_search_query(kind: &str, status: &str) {
    counter!(
        "index_sync_search_queries_total",
        "kind" => kind.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record search latency
pub fn record_search_latency(kind: &str, duration: Duration) {
    histogram!(
        "index_sync_search_seconds",
        "kind" => kind.to_string()
    )
    .record(duration.as_secs_f64());
}

/// Record number of records returned after reconciliation
pub fn record_search_results(kind: &str, count: usize) {
    histogram!(
        "index_sync_search_results",
        "kind" => kind.to_string()
    )
    .record(count as f64);
}

/// Record index hits whose authoritative record was missing
pub fn record_stale_hits(kind: &str, count: usize) {
    counter!(
        "index_sync_stale_hits_total",
        "kind" => kind.to_string()
    )
    .increment(count as u64);
}

/// Record a reconciliation outcome (deleted, error, dropped)
pub fn record_reconcile(kind: &str, outcome: &str) {
    counter!(
        "index_sync_reconcile_total",
        "kind" => kind.to_string(),
        "outcome" => outcome.to_string()
    )
    .increment(1);
}

/// Set reconcile tasks accepted but not yet finished
pub fn set_reconcile_queue_depth(count: usize) {
    gauge!("index_sync_reconcile_pending").set(count as f64);
}

/// Count one transition into `state`
pub fn record_engine_state_transition(state: &str) {
    counter!(
        "index_sync_engine_state_transitions_total",
        "state" => state.to_string()
    )
    .increment(1);
}

/// Record index creation
pub fn record_index_operation(operation: &str, success: bool) {
    let status = if success { "success" } else { "failure" };
    counter!(
        "index_sync_index_operations_total",
        "operation" => operation.to_string(),
        "status" => status
    )
    .increment(1);
}

/// A timing guard that records search latency on drop
pub struct LatencyTimer {
    kind: &'static str,
    start: Instant,
}

impl LatencyTimer {
    /// Start a new latency timer
    pub fn new(kind: &'static str) -> Self {
        Self {
            kind,
            start: Instant::now(),
        }
    }
}

impl Drop for LatencyTimer {
    fn drop(&mut self) {
        record_search_latency(self.kind, self.start.elapsed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // No recorder is installed; these only check the calls don't panic.

    #[test]
    fn test_sync_metrics() {
        record_sync_run("post", "full", "success");
        record_sync_run("user", "incremental", "error");
        record_sync_documents("post", 500, 0);
        record_sync_documents("chart", 10, 2);
        record_sync_latency("post", "full", Duration::from_millis(40));
        record_batch_size("post", 500);
    }

    #[test]
    fn test_search_metrics() {
        record_search_query("post", "success");
        record_search_query("user", "rejected");
        record_search_latency("post", Duration::from_micros(500));
        record_search_results("post", 10);
        record_stale_hits("post", 1);
    }

    #[test]
    fn test_reconcile_metrics() {
        record_reconcile("post", "deleted");
        record_reconcile("chart", "dropped");
        set_reconcile_queue_depth(3);
    }

    #[test]
    fn test_latency_timer() {
        {
            let _timer = LatencyTimer::new("post");
            std::thread::sleep(Duration::from_micros(10));
        }
    }

    #[test]
    fn test_engine_state_tracking() {
        record_engine_state_transition("Created");
        record_engine_state_transition("FullSync");
        record_engine_state_transition("Running");
        record_index_operation("create", true);
    }

    #[test]
    fn test_state_transitions_counted_per_state() {
        use metrics_util::debugging::{DebugValue, DebuggingRecorder};

        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        metrics::with_local_recorder(&recorder, || {
            record_engine_state_transition("FullSync");
            record_engine_state_transition("Running");
            record_engine_state_transition("FullSync");
        });

        let mut full_sync = 0;
        for (key, _, _, value) in snapshotter.snapshot().into_vec() {
            let key = key.key();
            assert_eq!(key.name(), "index_sync_engine_state_transitions_total");
            if key.labels().any(|l| l.key() == "state" && l.value() == "FullSync") {
                if let DebugValue::Counter(n) = value {
                    full_sync = n;
                }
            }
        }
        assert_eq!(full_sync, 2);
    }
}
