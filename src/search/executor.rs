// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query execution with read-time reconciliation.
//!
//! The index decides *which* records match and in what order; the
//! authoritative store decides *what* they contain. Hits whose record is
//! gone are pruned from the page and handed to the [`Reconciler`].

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::error::SearchError;
use crate::metrics::{self, LatencyTimer};
use crate::model::Entity;
use crate::storage::traits::{IndexStore, RecordStore};
use super::query_builder::{build_predicate, build_sort};
use super::reconciler::Reconciler;
use super::request::{Page, QueryRequest};

/// Searches one entity type.
pub struct SearchExecutor<R: Entity> {
    records: Arc<dyn RecordStore<R>>,
    index: Arc<dyn IndexStore>,
    reconciler: Reconciler,
    max_page_size: u64,
}

impl<R: Entity> SearchExecutor<R> {
    pub fn new(
        records: Arc<dyn RecordStore<R>>,
        index: Arc<dyn IndexStore>,
        reconciler: Reconciler,
        max_page_size: u64,
    ) -> Self {
        Self { records, index, reconciler, max_page_size }
    }

    pub fn type_tag(&self) -> &'static str {
        R::schema().type_tag
    }

    pub fn index(&self) -> &Arc<dyn IndexStore> {
        &self.index
    }

    #[instrument(skip_all, fields(kind = R::schema().type_tag, current = request.current, size = request.page_size))]
    pub async fn search(&self, request: &QueryRequest) -> Result<Page<R>, SearchError> {
        let kind = self.type_tag();

        if let Err(e) = request.validate(self.max_page_size) {
            metrics::record_search_query(kind, "rejected");
            return Err(e);
        }
        let query = build_predicate(R::schema(), request).inspect_err(|_| {
            metrics::record_search_query(kind, "rejected");
        })?;
        let sort = build_sort(R::schema(), request.sort_field.as_deref(), request.sort_order.as_deref());

        let _timer = LatencyTimer::new(kind);
        let result = self.execute(request, &query, &sort).await;
        metrics::record_search_query(kind, if result.is_ok() { "success" } else { "error" });
        result
    }

    async fn execute(
        &self,
        request: &QueryRequest,
        query: &super::BoolQuery,
        sort: &super::SortSpec,
    ) -> Result<Page<R>, SearchError> {
        let kind = self.type_tag();
        let hits = self
            .index
            .search(query, sort, request.offset(), request.page_size as usize)
            .await?;

        let mut page = Page::empty(request.current, request.page_size);
        page.total = hits.total;
        if hits.hits.is_empty() {
            debug!(total = hits.total, "No hits on this page");
            metrics::record_search_results(kind, 0);
            return Ok(page);
        }

        let ids = hits.ids();
        let found: HashMap<i64, R> = self
            .records
            .get_by_ids(&ids)
            .await?
            .into_iter()
            .map(|r| (r.id(), r))
            .collect();

        let mut stale: HashSet<i64> = HashSet::new();
        // a repeated hit id is looked up again, never treated as stale
        for id in ids {
            match found.get(&id).cloned() {
                Some(record) => page.records.push(record),
                None => {
                    if stale.insert(id) {
                        info!(kind, id, "Index hit has no live record, scheduling removal");
                        self.reconciler.enqueue(self.index.clone(), kind, id);
                    }
                }
            }
        }

        if !stale.is_empty() {
            metrics::record_stale_hits(kind, stale.len());
        }
        metrics::record_search_results(kind, page.records.len());
        debug!(returned = page.records.len(), stale = stale.len(), total = page.total, "Search complete");
        Ok(page)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{to_indexed, Post};
    use crate::search::ReconcileConfig;
    use crate::storage::memory::{InMemoryIndex, InMemoryRecordStore};
    use crate::search::{BoolQuery, SortSpec};
    use crate::storage::traits::{BatchWriteResult, IndexHit, IndexHits, IndexedDocument, StorageError};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn post(id: i64, title: &str) -> Post {
        Post { id, title: title.into(), thumb_num: id, ..Default::default() }
    }

    struct Fixture {
        records: Arc<InMemoryRecordStore<Post>>,
        index: Arc<InMemoryIndex>,
        reconciler: Reconciler,
        executor: SearchExecutor<Post>,
    }

    async fn fixture(indexed: &[Post], live: &[Post]) -> Fixture {
        let records = Arc::new(InMemoryRecordStore::with_records(live.to_vec()));
        let index = Arc::new(InMemoryIndex::new("post"));
        let docs: Vec<IndexedDocument> = indexed.iter().map(|p| to_indexed(p).unwrap()).collect();
        index.upsert_batch(&docs).await.unwrap();
        let reconciler = Reconciler::new(ReconcileConfig::default());
        let executor = SearchExecutor::new(records.clone(), index.clone(), reconciler.clone(), 20);
        Fixture { records, index, reconciler, executor }
    }

    #[tokio::test]
    async fn test_results_follow_index_order() {
        let posts = vec![post(1, "a"), post(2, "b"), post(3, "c")];
        let f = fixture(&posts, &posts).await;

        let request = QueryRequest::new().with_sort("thumbNum", "descend");
        let page = f.executor.search(&request).await.unwrap();

        let ids: Vec<i64> = page.records.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![3, 2, 1]);
        assert_eq!(page.total, 3);
    }

    #[tokio::test]
    async fn test_stale_hit_is_pruned_and_reconciled() {
        let indexed = vec![post(1, "rust"), post(2, "rust")];
        let f = fixture(&indexed, &indexed[..1]).await;

        let page = f.executor.search(&QueryRequest::new().with_search_text("rust")).await.unwrap();
        assert_eq!(page.records.len(), 1);
        assert_eq!(page.records[0].id, 1);
        assert_eq!(page.total, 2);

        f.reconciler.wait_idle().await;
        assert!(!f.index.contains(2));
        assert!(f.index.contains(1));
    }

    #[tokio::test]
    async fn test_zero_hits_skips_record_fetch() {
        let f = fixture(&[post(1, "go")], &[post(1, "go")]).await;

        let page = f.executor.search(&QueryRequest::new().with_search_text("rust")).await.unwrap();
        assert!(page.records.is_empty());
        assert_eq!(page.total, 0);
        assert_eq!(f.records.batch_fetches(), 0);
    }

    #[tokio::test]
    async fn test_invalid_page_never_touches_index() {
        let f = fixture(&[], &[]).await;

        let err = f.executor.search(&QueryRequest::new().with_page(1, 21)).await.unwrap_err();
        assert!(err.is_client_error());
        let err = f.executor.search(&QueryRequest::new().with_page(0, 10)).await.unwrap_err();
        assert!(err.is_client_error());
        assert_eq!(f.index.search_calls(), 0);

        assert!(f.executor.search(&QueryRequest::new().with_page(1, 20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_filter_is_rejected() {
        let f = fixture(&[], &[]).await;
        let err = f
            .executor
            .search(&QueryRequest::new().with_filter("password", "x"))
            .await
            .unwrap_err();
        assert!(matches!(err, SearchError::Validation(_)));
        assert_eq!(f.index.search_calls(), 0);
    }

    /// Returns a fixed hit list regardless of the query.
    struct FixedHits {
        ids: Vec<i64>,
        deletes: AtomicUsize,
    }

    #[async_trait]
    impl IndexStore for FixedHits {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn search(
            &self,
            _query: &BoolQuery,
            _sort: &SortSpec,
            _offset: usize,
            _size: usize,
        ) -> Result<IndexHits, StorageError> {
            Ok(IndexHits {
                hits: self
                    .ids
                    .iter()
                    .map(|id| IndexHit { id: *id, score: None })
                    .collect(),
                total: self.ids.len() as u64,
            })
        }

        async fn upsert_batch(
            &self,
            docs: &[IndexedDocument],
        ) -> Result<BatchWriteResult, StorageError> {
            Ok(BatchWriteResult { written: docs.len(), failed: 0 })
        }

        async fn delete_by_id(&self, _id: i64) -> Result<(), StorageError> {
            self.deletes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_repeated_hit_ids() {
        let records = Arc::new(InMemoryRecordStore::with_records(vec![post(1, "live")]));
        let index = Arc::new(FixedHits { ids: vec![1, 1, 2, 2], deletes: Default::default() });
        let reconciler = Reconciler::new(ReconcileConfig::default());
        let executor = SearchExecutor::<Post>::new(records, index.clone(), reconciler.clone(), 20);

        let page = executor.search(&QueryRequest::new()).await.unwrap();
        reconciler.wait_idle().await;

        let ids: Vec<i64> = page.records.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![1, 1]);
        // only the missing id is removed, and only once
        assert_eq!(index.deletes.load(Ordering::SeqCst), 1);
        assert_eq!(reconciler.stats().enqueued, 1);
    }
}
