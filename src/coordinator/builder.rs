// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Explicit wiring of entity types into an engine.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::sync::{watch, Mutex};
use tracing::info;

use crate::config::IndexSyncConfig;
use crate::datasource::{Datasource, DatasourceRegistry, SearchFacade};
use crate::error::SearchError;
use crate::model::{Chart, Entity, Post, User};
use crate::search::{Reconciler, SearchExecutor};
use crate::storage::elastic::ElasticIndex;
use crate::storage::sql::{connect_pool, SqlRecordStore};
use crate::storage::traits::{IndexStore, RecordStore, StorageError};
use crate::sync::{IndexSyncer, SyncJob, SyncOptions};

use super::{EngineState, SearchEngine};

/// Everything the engine holds for one entity type.
struct EntityWiring {
    type_tag: &'static str,
    datasource: Arc<dyn Datasource>,
    job: Arc<dyn SyncJob>,
    index: Arc<dyn IndexStore>,
}

type WiringFactory = Box<dyn FnOnce(&IndexSyncConfig, &Reconciler) -> EntityWiring + Send>;

/// Builder returned by [`SearchEngine::builder`].
pub struct EngineBuilder {
    config: IndexSyncConfig,
    config_rx: watch::Receiver<IndexSyncConfig>,
    factories: Vec<WiringFactory>,
}

impl EngineBuilder {
    pub(super) fn new(config: IndexSyncConfig, config_rx: watch::Receiver<IndexSyncConfig>) -> Self {
        Self {
            config,
            config_rx,
            factories: Vec::new(),
        }
    }

    /// Register entity type `R` with its authoritative store and index.
    pub fn with_entity<R: Entity>(
        mut self,
        records: Arc<dyn RecordStore<R>>,
        index: Arc<dyn IndexStore>,
    ) -> Self {
        self.factories.push(Box::new(move |config, reconciler| {
            let executor = SearchExecutor::new(
                records.clone(),
                index.clone(),
                reconciler.clone(),
                config.max_page_size,
            );
            EntityWiring {
                type_tag: R::schema().type_tag,
                datasource: Arc::new(executor),
                job: Arc::new(IndexSyncer::new(records, index.clone(), SyncOptions::from_config(config))),
                index,
            }
        }));
        self
    }

    /// Assemble the engine. Must be called from within a Tokio runtime
    /// (the reconciler spawns its workers here). Fails if two entities
    /// claim the same type tag.
    pub fn build(self) -> Result<SearchEngine, SearchError> {
        let reconciler = Reconciler::new(self.config.reconcile());
        let wirings: Vec<EntityWiring> = self
            .factories
            .into_iter()
            .map(|factory| factory(&self.config, &reconciler))
            .collect();

        let registry = DatasourceRegistry::new(wirings.iter().map(|w| w.datasource.clone()).collect())?;
        let facade = SearchFacade::new(Arc::new(registry), self.config.default_datasource.clone());

        let mut indexes = HashMap::with_capacity(wirings.len());
        let mut jobs = Vec::with_capacity(wirings.len());
        for wiring in wirings {
            indexes.insert(wiring.type_tag, wiring.index);
            jobs.push(wiring.job);
        }

        let (state_tx, state_rx) = watch::channel(EngineState::Created);
        crate::metrics::record_engine_state_transition("Created");

        Ok(SearchEngine {
            config: RwLock::new(self.config),
            config_rx: Mutex::new(self.config_rx),
            state: state_tx,
            state_rx,
            jobs,
            indexes,
            facade,
            reconciler,
            sync_lock: Mutex::new(()),
        })
    }
}

impl SearchEngine {
    /// Start wiring an engine by hand.
    pub fn builder(config: IndexSyncConfig, config_rx: watch::Receiver<IndexSyncConfig>) -> EngineBuilder {
        EngineBuilder::new(config, config_rx)
    }

    /// Build an engine for posts, users and charts against the configured
    /// SQL database and Elasticsearch cluster, creating missing indices.
    #[tracing::instrument(skip_all)]
    pub async fn connect(
        config: IndexSyncConfig,
        config_rx: watch::Receiver<IndexSyncConfig>,
    ) -> Result<Self, SearchError> {
        let database_url = config
            .database_url
            .clone()
            .ok_or_else(|| StorageError::Connection("database_url is not configured".into()))?;
        let es_url = config
            .elasticsearch_url
            .clone()
            .ok_or_else(|| StorageError::Connection("elasticsearch_url is not configured".into()))?;

        let pool = connect_pool(&database_url).await?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| StorageError::Connection(e.to_string()))?;

        let post_index = elastic_index::<Post>(&client, &es_url, &config).await?;
        let user_index = elastic_index::<User>(&client, &es_url, &config).await?;
        let chart_index = elastic_index::<Chart>(&client, &es_url, &config).await?;

        info!(indices = ?[post_index.name(), user_index.name(), chart_index.name()], "Search backends connected");

        Self::builder(config, config_rx)
            .with_entity::<Post>(Arc::new(SqlRecordStore::<Post>::new(pool.clone())), post_index)
            .with_entity::<User>(Arc::new(SqlRecordStore::<User>::new(pool.clone())), user_index)
            .with_entity::<Chart>(Arc::new(SqlRecordStore::<Chart>::new(pool)), chart_index)
            .build()
    }
}

async fn elastic_index<R: Entity>(
    client: &reqwest::Client,
    base_url: &str,
    config: &IndexSyncConfig,
) -> Result<Arc<dyn IndexStore>, StorageError> {
    let index = ElasticIndex::with_client(client.clone(), base_url, config.index_name(R::schema().type_tag));
    let definition = R::search_index().with_text_analyzer(config.text_analyzer.as_deref());
    index.ensure_index(&definition).await?;
    Ok(Arc::new(index))
}
