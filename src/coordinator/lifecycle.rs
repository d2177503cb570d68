// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Engine lifecycle management: start, run loop, shutdown.

use std::time::Instant;

use tokio::time::{interval_at, Duration, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::IndexSyncConfig;
use crate::storage::traits::StorageError;
use crate::sync::{now_millis, SyncOptions, SyncReport};

use super::{EngineState, SearchEngine};

fn ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(tokio::time::Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

fn warn_if_window_too_short(config: &IndexSyncConfig) {
    if config.sync_window() < config.sync_interval() {
        warn!(
            window_secs = config.incremental_sync_window_secs,
            interval_secs = config.incremental_sync_interval_secs,
            "Incremental window is shorter than the sync interval; updates between ticks can be missed"
        );
    }
}

impl SearchEngine {
    /// Start the engine.
    ///
    /// 1. Validate configuration
    /// 2. Full sync of every entity type (when `full_sync_on_start`)
    /// 3. Ready
    ///
    /// A store that cannot be read during the full sync fails startup.
    /// Batch push failures do not; they are reported in the returned
    /// [`SyncReport`]s.
    #[tracing::instrument(skip(self))]
    pub async fn start(&self) -> Result<Vec<SyncReport>, StorageError> {
        if self.state() != EngineState::Created {
            warn!(state = %self.state(), "start() called on an engine that is already started");
            return Ok(Vec::new());
        }

        let startup_start = Instant::now();
        self.set_state(EngineState::Starting);
        let config = self.config();
        warn_if_window_too_short(&config);
        info!(types = ?self.datasource_types(), "Starting search engine");

        let mut reports = Vec::new();
        if config.full_sync_on_start {
            self.set_state(EngineState::FullSync);
            let _guard = self.sync_lock.lock().await;
            for job in &self.jobs {
                match job.full_sync().await {
                    Ok(report) => reports.push(report),
                    Err(e) => {
                        error!(kind = job.type_tag(), error = %e, "Full sync could not read the authoritative store");
                        self.set_state(EngineState::Created);
                        return Err(e);
                    }
                }
            }
        } else {
            debug!("Full sync on start disabled");
        }

        self.set_state(EngineState::Ready);
        info!(
            elapsed_ms = startup_start.elapsed().as_millis() as u64,
            synced = reports.iter().map(|r| r.succeeded).sum::<usize>(),
            "Search engine ready"
        );
        Ok(reports)
    }

    /// Run one incremental pass over every entity type now.
    ///
    /// Errors are logged per entity type and never stop the other types.
    pub async fn sync_now(&self) -> Vec<SyncReport> {
        let _guard = self.sync_lock.lock().await;
        let now = now_millis();
        let mut reports = Vec::with_capacity(self.jobs.len());
        for job in &self.jobs {
            match job.incremental_sync(now).await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    error!(kind = job.type_tag(), error = %e, "Incremental sync failed; will retry next tick");
                }
            }
        }
        reports
    }

    /// Main loop: incremental sync on every tick, config updates as they
    /// arrive. Returns once [`shutdown()`](Self::shutdown) is called.
    pub async fn run(&self) {
        if self.state() == EngineState::ShuttingDown {
            return;
        }
        self.set_state(EngineState::Running);
        info!("Search engine running");

        let mut config_rx = self.config_rx.lock().await;
        let mut state_rx = self.state_receiver();
        let mut period = self.config.read().sync_interval();
        let mut tick = ticker(period);
        let mut config_open = true;

        loop {
            tokio::select! {
                _ = tick.tick() => {
                    let reports = self.sync_now().await;
                    debug!(
                        types = reports.len(),
                        pushed = reports.iter().map(|r| r.succeeded).sum::<usize>(),
                        "Incremental tick complete"
                    );
                }

                changed = config_rx.changed(), if config_open => {
                    if changed.is_err() {
                        debug!("Config channel closed; keeping current configuration");
                        config_open = false;
                        continue;
                    }
                    let new_config = config_rx.borrow_and_update().clone();
                    self.apply_config(new_config);

                    let new_period = self.config.read().sync_interval();
                    if new_period != period {
                        info!(interval_secs = new_period.as_secs(), "Sync interval changed");
                        period = new_period;
                        tick = ticker(period);
                    }
                }

                _ = async {
                    state_rx.wait_for(|s| *s == EngineState::ShuttingDown).await.is_ok()
                } => {
                    break;
                }
            }
        }

        info!("Search engine run loop stopped");
    }

    fn apply_config(&self, new_config: IndexSyncConfig) {
        warn_if_window_too_short(&new_config);
        let options = SyncOptions::from_config(&new_config);
        for job in &self.jobs {
            job.set_options(options.clone());
        }

        let current = self.config.read().clone();
        if current.max_page_size != new_config.max_page_size
            || current.reconcile_workers != new_config.reconcile_workers
            || current.reconcile_queue_capacity != new_config.reconcile_queue_capacity
        {
            warn!("Page size and reconciler settings only take effect on rebuild");
        }

        info!(
            batch_size = new_config.sync_batch_size,
            window_secs = new_config.incremental_sync_window_secs,
            "Config updated"
        );
        *self.config.write() = new_config;
    }

    /// Initiate graceful shutdown: stop the run loop and drain queued
    /// reconciliation deletes.
    #[tracing::instrument(skip(self))]
    pub async fn shutdown(&self) {
        let shutdown_start = Instant::now();
        info!("Initiating search engine shutdown...");
        self.set_state(EngineState::ShuttingDown);

        self.reconciler.shutdown().await;

        let stats = self.reconciler.stats();
        info!(
            elapsed_ms = shutdown_start.elapsed().as_millis() as u64,
            reconciled = stats.completed,
            dropped = stats.dropped,
            "Search engine shutdown complete"
        );
    }
}
