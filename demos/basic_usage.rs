// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Basic index-sync usage example.
//!
//! Demonstrates, with in-memory stores (no external services):
//! 1. Wiring posts, users and charts into an engine
//! 2. Full sync on start
//! 3. Searching by text, tags and type
//! 4. A hard-deleted record being pruned and reconciled
//! 5. Displaying metrics
//! 6. Clean shutdown
//!
//! # Run
//!
//! ```bash
//! cargo run --example basic_usage
//! ```

use std::sync::Arc;

use index_sync::search::QueryRequest;
use index_sync::storage::memory::{InMemoryIndex, InMemoryRecordStore};
use index_sync::{Chart, EngineState, IndexSyncConfig, Post, SearchEngine, User};
use metrics_util::debugging::{DebugValue, DebuggingRecorder, Snapshotter};
use tokio::sync::watch;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let recorder = DebuggingRecorder::new();
    let snapshotter = recorder.snapshotter();
    recorder.install().expect("failed to install metrics recorder");

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "index_sync=info".into()),
        )
        .with_target(false)
        .compact()
        .init();

    println!("\n╔═══════════════════════════════════════════════════════════════╗");
    println!("║              index-sync: Basic Usage Example                  ║");
    println!("╚═══════════════════════════════════════════════════════════════╝\n");

    // ─────────────────────────────────────────────────────────────────────────
    // 1. Seed the authoritative stores and wire the engine
    // ─────────────────────────────────────────────────────────────────────────
    let posts = Arc::new(InMemoryRecordStore::with_records(vec![
        Post {
            id: 1,
            title: "Getting started with Rust".into(),
            content: "Ownership, borrowing and lifetimes".into(),
            tags: r#"["rust","beginner"]"#.into(),
            thumb_num: 12,
            ..Default::default()
        },
        Post {
            id: 2,
            title: "Async Rust with Tokio".into(),
            content: "Tasks, channels and select".into(),
            tags: r#"["rust","async"]"#.into(),
            thumb_num: 30,
            ..Default::default()
        },
        Post {
            id: 3,
            title: "Go concurrency patterns".into(),
            content: "Goroutines and channels".into(),
            tags: r#"["go"]"#.into(),
            thumb_num: 7,
            ..Default::default()
        },
    ]));
    let users = Arc::new(InMemoryRecordStore::with_records(vec![User {
        id: 10,
        user_account: "alice".into(),
        user_name: "Alice".into(),
        user_profile: "Writes about Rust".into(),
        user_role: "admin".into(),
        tags: r#"["rust"]"#.into(),
        ..Default::default()
    }]));
    let charts = Arc::new(InMemoryRecordStore::with_records(vec![
        Chart { id: 100, name: "Monthly sales".into(), status: "succeed".into(), ..Default::default() },
        Chart { id: 101, name: "Weekly sales".into(), status: "running".into(), ..Default::default() },
    ]));
    let post_index = Arc::new(InMemoryIndex::new("post"));

    let config = IndexSyncConfig::default();
    let (_config_tx, config_rx) = watch::channel(config.clone());
    let engine = SearchEngine::builder(config, config_rx)
        .with_entity::<Post>(posts.clone(), post_index.clone())
        .with_entity::<User>(users, Arc::new(InMemoryIndex::new("user")))
        .with_entity::<Chart>(charts, Arc::new(InMemoryIndex::new("chart")))
        .build()?;

    // ─────────────────────────────────────────────────────────────────────────
    // 2. Full sync
    // ─────────────────────────────────────────────────────────────────────────
    println!("🔄 Full sync...");
    for report in engine.start().await? {
        println!("   └─ {:<6} {} documents", report.kind, report.succeeded);
    }
    assert_eq!(engine.state(), EngineState::Ready);

    // ─────────────────────────────────────────────────────────────────────────
    // 3. Searches
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🔍 Searching...");

    let envelope = engine.search(&QueryRequest::new().with_search_text("rust")).await?;
    println!("   ├─ posts matching 'rust': {:?}", titles(&envelope.data_list, "title"));

    let request = QueryRequest::new()
        .with_or_tags(vec!["async".into(), "go".into()])
        .with_sort("thumbNum", "ascend");
    let envelope = engine.search(&request).await?;
    println!("   ├─ posts tagged async|go by thumbs: {:?}", titles(&envelope.data_list, "title"));

    let envelope = engine.search(&QueryRequest::new().with_type("user").with_filter("userRole", "admin")).await?;
    println!("   ├─ admin users: {:?}", titles(&envelope.data_list, "userName"));

    let envelope = engine.search(&QueryRequest::new().with_type("chart").with_search_text("sales")).await?;
    println!("   └─ finished charts: {:?}", titles(&envelope.data_list, "name"));

    // ─────────────────────────────────────────────────────────────────────────
    // 4. Hard delete behind the engine's back
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🧹 Hard-deleting post 2 from the authoritative store...");
    posts.remove(2);
    let envelope = engine.search(&QueryRequest::new().with_search_text("rust")).await?;
    println!("   ├─ returned {:?} (index total {:?})", titles(&envelope.data_list, "title"), envelope.total);
    engine.wait_reconciled().await;
    println!("   └─ post 2 still indexed: {}", post_index.contains(2));

    // ─────────────────────────────────────────────────────────────────────────
    // 5. Metrics
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n📊 Metrics:");
    dump_metrics(&snapshotter);

    // ─────────────────────────────────────────────────────────────────────────
    // 6. Clean shutdown
    // ─────────────────────────────────────────────────────────────────────────
    println!("\n🛑 Shutting down...");
    engine.shutdown().await;
    println!("   └─ state: {}\n", engine.state());

    Ok(())
}

fn titles(records: &[serde_json::Value], field: &str) -> Vec<String> {
    records
        .iter()
        .filter_map(|r| r.get(field).and_then(|v| v.as_str()).map(str::to_string))
        .collect()
}

fn dump_metrics(snapshotter: &Snapshotter) {
    let snapshot = snapshotter.snapshot();

    let mut counters: Vec<_> = vec![];
    let mut gauges: Vec<_> = vec![];
    let mut histograms: Vec<_> = vec![];

    for (composite_key, _, _, value) in snapshot.into_vec() {
        let (_, key) = composite_key.into_parts();
        let name = key.name();
        let labels: Vec<_> = key.labels().map(|l| format!("{}={}", l.key(), l.value())).collect();
        let label_str = if labels.is_empty() { String::new() } else { format!("{{{}}}", labels.join(",")) };

        match value {
            DebugValue::Counter(v) => counters.push((name.to_string(), label_str, v)),
            DebugValue::Gauge(v) => gauges.push((name.to_string(), label_str, v.into_inner())),
            DebugValue::Histogram(samples) => {
                let count = samples.len();
                let sum: f64 = samples.iter().map(|v| v.into_inner()).sum();
                histograms.push((name.to_string(), label_str, count, sum));
            }
        }
    }

    counters.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));
    gauges.sort_by(|a, b| a.0.cmp(&b.0));
    histograms.sort_by(|a, b| a.0.cmp(&b.0).then(a.1.cmp(&b.1)));

    if !counters.is_empty() {
        println!("   ┌─ Counters");
        for (name, labels, value) in &counters {
            println!("   │  └─ {}{} = {}", name, labels, value);
        }
    }
    if !gauges.is_empty() {
        println!("   ├─ Gauges");
        for (name, labels, value) in &gauges {
            println!("   │  └─ {}{} = {:.2}", name, labels, value);
        }
    }
    if !histograms.is_empty() {
        println!("   └─ Histograms");
        for (name, labels, count, sum) in &histograms {
            println!("      └─ {}{} count={} sum={:.4}", name, labels, count, sum);
        }
    }
}
