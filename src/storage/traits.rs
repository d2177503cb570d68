// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::search::{BoolQuery, SortSpec};

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("Storage backend error: {0}")]
    Backend(String),
    #[error("Connection error: {0}")]
    Connection(String),
    #[error("Failed to encode/decode '{context}': {message}")]
    Codec { context: String, message: String },
}

/// Result of a batch write against the index
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchWriteResult {
    /// Number of documents acknowledged by the index
    pub written: usize,
    /// Number of documents the index rejected
    pub failed: usize,
}

/// A document ready to be written to the index, keyed by record id.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexedDocument {
    pub id: i64,
    pub source: Value,
}

/// A single search hit. Only the identifier is needed; records are
/// re-hydrated from the authoritative store.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexHit {
    pub id: i64,
    pub score: Option<f32>,
}

/// Ordered hits plus the index-reported total.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexHits {
    pub hits: Vec<IndexHit>,
    pub total: u64,
}

impl IndexHits {
    pub fn ids(&self) -> Vec<i64> {
        self.hits.iter().map(|h| h.id).collect()
    }
}

/// The authoritative (relational) side. Never written by this crate.
///
/// `get_by_id`, `get_by_ids` and `list_all` only see live rows;
/// `list_updated_since` also returns soft-deleted rows so their
/// tombstones can be pushed to the index.
#[async_trait]
pub trait RecordStore<R>: Send + Sync {
    async fn get_by_id(&self, id: i64) -> Result<Option<R>, StorageError>;

    /// Batch lookup. Result order is not guaranteed and missing ids are
    /// simply absent.
    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<R>, StorageError>;

    async fn list_all(&self) -> Result<Vec<R>, StorageError>;

    async fn list_updated_since(&self, since_millis: i64) -> Result<Vec<R>, StorageError>;
}

/// The search index side.
#[async_trait]
pub trait IndexStore: Send + Sync {
    /// Index name, used for logging and metrics labels.
    fn name(&self) -> &str;

    async fn search(
        &self,
        query: &BoolQuery,
        sort: &SortSpec,
        offset: usize,
        size: usize,
    ) -> Result<IndexHits, StorageError>;

    /// Create-or-overwrite every document by id.
    async fn upsert_batch(&self, docs: &[IndexedDocument]) -> Result<BatchWriteResult, StorageError>;

    /// Deleting a missing id is not an error.
    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError>;
}
