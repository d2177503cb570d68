// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! In-memory record store and search index.
//!
//! Both are DashMap-backed and safe to share across tasks. The index
//! evaluates the same [`BoolQuery`] tree the Elasticsearch backend receives,
//! with simplified text analysis: lowercase tokens split on anything that is
//! not alphanumeric, and a match clause hits when any token overlaps. The
//! relevance score is the number of `should` clauses that matched.

use std::cmp::Ordering as CmpOrdering;
use std::marker::PhantomData;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::Value;

use crate::model::Entity;
use crate::search::{BoolQuery, Clause, SortOrder, SortSpec};
use super::traits::{
    BatchWriteResult, IndexHit, IndexHits, IndexStore, IndexedDocument, RecordStore, StorageError,
};

/// Authoritative store held in memory.
pub struct InMemoryRecordStore<R> {
    rows: DashMap<i64, R>,
    batch_fetches: AtomicUsize,
    _marker: PhantomData<fn() -> R>,
}

impl<R: Entity> InMemoryRecordStore<R> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            rows: DashMap::new(),
            batch_fetches: AtomicUsize::new(0),
            _marker: PhantomData,
        }
    }

    pub fn with_records(records: impl IntoIterator<Item = R>) -> Self {
        let store = Self::new();
        for record in records {
            store.insert(record);
        }
        store
    }

    /// Insert or replace a row (soft-deleted rows included).
    pub fn insert(&self, record: R) {
        self.rows.insert(record.id(), record);
    }

    /// Hard delete: the row disappears without a tombstone.
    pub fn remove(&self, id: i64) -> Option<R> {
        self.rows.remove(&id).map(|(_, r)| r)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Number of `get_by_ids` calls served
    #[must_use]
    pub fn batch_fetches(&self) -> usize {
        self.batch_fetches.load(Ordering::Relaxed)
    }

    fn sorted(&self, keep: impl Fn(&R) -> bool) -> Vec<R> {
        let mut rows: Vec<R> = self
            .rows
            .iter()
            .filter(|r| keep(r.value()))
            .map(|r| r.value().clone())
            .collect();
        rows.sort_by_key(|r| r.id());
        rows
    }
}

impl<R: Entity> Default for InMemoryRecordStore<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Entity> RecordStore<R> for InMemoryRecordStore<R> {
    async fn get_by_id(&self, id: i64) -> Result<Option<R>, StorageError> {
        Ok(self
            .rows
            .get(&id)
            .map(|r| r.value().clone())
            .filter(|r| !r.is_deleted()))
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<R>, StorageError> {
        self.batch_fetches.fetch_add(1, Ordering::Relaxed);
        // Ascending id order, like an unordered `IN (...)` lookup usually comes back
        let mut wanted: Vec<i64> = ids.to_vec();
        wanted.sort_unstable();
        wanted.dedup();
        Ok(wanted
            .into_iter()
            .filter_map(|id| self.rows.get(&id).map(|r| r.value().clone()))
            .filter(|r| !r.is_deleted())
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<R>, StorageError> {
        Ok(self.sorted(|r| !r.is_deleted()))
    }

    async fn list_updated_since(&self, since_millis: i64) -> Result<Vec<R>, StorageError> {
        Ok(self.sorted(|r| r.update_time() >= since_millis))
    }
}

/// Search index held in memory.
pub struct InMemoryIndex {
    name: String,
    docs: DashMap<i64, Value>,
    search_calls: AtomicUsize,
    upsert_calls: AtomicUsize,
    delete_calls: AtomicUsize,
}

impl InMemoryIndex {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            docs: DashMap::new(),
            search_calls: AtomicUsize::new(0),
            upsert_calls: AtomicUsize::new(0),
            delete_calls: AtomicUsize::new(0),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.docs.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.docs.is_empty()
    }

    #[must_use]
    pub fn contains(&self, id: i64) -> bool {
        self.docs.contains_key(&id)
    }

    /// Stored source of a document
    #[must_use]
    pub fn get(&self, id: i64) -> Option<Value> {
        self.docs.get(&id).map(|d| d.value().clone())
    }

    #[must_use]
    pub fn search_calls(&self) -> usize {
        self.search_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn upsert_calls(&self) -> usize {
        self.upsert_calls.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn delete_calls(&self) -> usize {
        self.delete_calls.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl IndexStore for InMemoryIndex {
    fn name(&self) -> &str {
        &self.name
    }

    async fn search(
        &self,
        query: &BoolQuery,
        sort: &SortSpec,
        offset: usize,
        size: usize,
    ) -> Result<IndexHits, StorageError> {
        self.search_calls.fetch_add(1, Ordering::Relaxed);

        let mut matched: Vec<(i64, u32, Value)> = self
            .docs
            .iter()
            .filter_map(|d| score(d.value(), query).map(|s| (*d.key(), s, d.value().clone())))
            .collect();

        match sort {
            SortSpec::Score => {
                matched.sort_by(|a, b| b.1.cmp(&a.1).then(a.0.cmp(&b.0)));
            }
            SortSpec::Field { field, order } => {
                matched.sort_by(|a, b| {
                    let ord = compare_values(a.2.get(field), b.2.get(field));
                    let ord = match order {
                        SortOrder::Asc => ord,
                        SortOrder::Desc => ord.reverse(),
                    };
                    ord.then(a.0.cmp(&b.0))
                });
            }
        }

        let total = matched.len() as u64;
        let hits = matched
            .into_iter()
            .skip(offset)
            .take(size)
            .map(|(id, s, _)| IndexHit { id, score: Some(s as f32) })
            .collect();

        Ok(IndexHits { hits, total })
    }

    async fn upsert_batch(&self, docs: &[IndexedDocument]) -> Result<BatchWriteResult, StorageError> {
        self.upsert_calls.fetch_add(1, Ordering::Relaxed);
        for doc in docs {
            self.docs.insert(doc.id, doc.source.clone());
        }
        Ok(BatchWriteResult { written: docs.len(), failed: 0 })
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        self.delete_calls.fetch_add(1, Ordering::Relaxed);
        self.docs.remove(&id);
        Ok(())
    }
}

/// `Some(score)` when `doc` satisfies `query`.
fn score(doc: &Value, query: &BoolQuery) -> Option<u32> {
    if !query.filter.iter().all(|c| clause_matches(doc, c)) {
        return None;
    }
    if !query.must.iter().all(|c| clause_matches(doc, c)) {
        return None;
    }
    if query.must_not.iter().any(|c| clause_matches(doc, c)) {
        return None;
    }

    let should_hits = query.should.iter().filter(|c| clause_matches(doc, c)).count() as u32;
    let required = query.minimum_should_match.unwrap_or(
        if query.filter.is_empty() && query.must.is_empty() && !query.should.is_empty() { 1 } else { 0 },
    );
    (should_hits >= required).then_some(should_hits)
}

fn clause_matches(doc: &Value, clause: &Clause) -> bool {
    match clause {
        Clause::MatchAll => true,
        Clause::Term { field, value } => match doc.get(field) {
            Some(Value::Array(items)) => items.iter().any(|item| values_equal(item, value)),
            Some(actual) => values_equal(actual, value),
            None => false,
        },
        Clause::Match { field, text } => {
            let wanted = tokenize(text);
            let Some(actual) = doc.get(field) else { return false };
            let mut haystack = Vec::new();
            match actual {
                Value::Array(items) => {
                    for item in items.iter().filter_map(Value::as_str) {
                        haystack.extend(tokenize(item));
                    }
                }
                Value::String(s) => haystack = tokenize(s),
                other => haystack = tokenize(&other.to_string()),
            }
            wanted.iter().any(|t| haystack.contains(t))
        }
        Clause::Bool(inner) => score(doc, inner).is_some(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        _ => a == b,
    }
}

fn compare_values(a: Option<&Value>, b: Option<&Value>) -> CmpOrdering {
    match (a, b) {
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .partial_cmp(&y.as_f64())
            .unwrap_or(CmpOrdering::Equal),
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(_), None) => CmpOrdering::Greater,
        (None, Some(_)) => CmpOrdering::Less,
        _ => CmpOrdering::Equal,
    }
}

fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}
