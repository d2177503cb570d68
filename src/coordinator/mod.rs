// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search engine coordinator.
//!
//! The [`SearchEngine`] ties the components together:
//! - one [`IndexSyncer`](crate::sync::IndexSyncer) per entity type, driven by the run loop
//! - one [`SearchExecutor`](crate::search::SearchExecutor) per entity type, behind the registry
//! - a shared [`Reconciler`] for stale-hit deletes
//!
//! # Lifecycle
//!
//! ```text
//! Created → Starting → FullSync → Ready → Running → ShuttingDown
//! ```
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use index_sync::{EngineState, IndexSyncConfig, SearchEngine};
//! use index_sync::model::Post;
//! use index_sync::storage::memory::{InMemoryIndex, InMemoryRecordStore};
//! use tokio::sync::watch;
//!
//! # #[tokio::main]
//! # async fn main() {
//! let config = IndexSyncConfig::default();
//! let (_tx, rx) = watch::channel(config.clone());
//! let engine = SearchEngine::builder(config, rx)
//!     .with_entity::<Post>(Arc::new(InMemoryRecordStore::<Post>::new()), Arc::new(InMemoryIndex::new("post")))
//!     .build()
//!     .expect("wiring");
//!
//! assert_eq!(engine.state(), EngineState::Created);
//! engine.start().await.expect("full sync");
//! assert!(engine.is_ready());
//! # }
//! ```

mod types;
mod builder;
mod lifecycle;
mod search_api;

pub use types::EngineState;
pub use builder::EngineBuilder;

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};

use crate::config::IndexSyncConfig;
use crate::datasource::SearchFacade;
use crate::search::{ReconcileStats, Reconciler};
use crate::storage::traits::IndexStore;
use crate::sync::SyncJob;

/// Main search engine coordinator.
///
/// `Send + Sync`; every method takes `&self`, so the engine can be shared
/// behind an `Arc` between the run loop and request handlers.
pub struct SearchEngine {
    /// Current configuration (updated at runtime via the watch channel)
    pub(super) config: RwLock<IndexSyncConfig>,

    /// Runtime config updates, consumed by the run loop
    pub(super) config_rx: Mutex<watch::Receiver<IndexSyncConfig>>,

    /// Engine state (broadcast to watchers)
    pub(super) state: watch::Sender<EngineState>,

    /// Engine state receiver (for internal use)
    pub(super) state_rx: watch::Receiver<EngineState>,

    /// One sync job per entity type
    pub(super) jobs: Vec<Arc<dyn SyncJob>>,

    /// Index per type tag, for proactive deletes
    pub(super) indexes: HashMap<&'static str, Arc<dyn IndexStore>>,

    pub(super) facade: SearchFacade,

    pub(super) reconciler: Reconciler,

    /// Serializes sync passes (run loop tick vs. `sync_now`)
    pub(super) sync_lock: Mutex<()>,
}

impl SearchEngine {
    /// Get current engine state.
    #[must_use]
    pub fn state(&self) -> EngineState {
        *self.state_rx.borrow()
    }

    /// Get a receiver to watch state changes.
    #[must_use]
    pub fn state_receiver(&self) -> watch::Receiver<EngineState> {
        self.state_rx.clone()
    }

    /// Check if engine is ready to serve searches.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        matches!(self.state(), EngineState::Ready | EngineState::Running)
    }

    /// Snapshot of the active configuration.
    #[must_use]
    pub fn config(&self) -> IndexSyncConfig {
        self.config.read().clone()
    }

    /// Registered type tags, sorted.
    #[must_use]
    pub fn datasource_types(&self) -> Vec<&str> {
        self.facade.registry().types()
    }

    #[must_use]
    pub fn reconcile_stats(&self) -> ReconcileStats {
        self.reconciler.stats()
    }

    /// Wait until queued stale-hit deletes have run.
    pub async fn wait_reconciled(&self) {
        self.reconciler.wait_idle().await;
    }

    pub(super) fn set_state(&self, state: EngineState) {
        let _ = self.state.send(state);
        crate::metrics::record_engine_state_transition(&state.to_string());
    }
}
