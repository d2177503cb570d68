// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch index backend over the REST API.
//!
//! | Operation | Request |
//! |-----------|---------|
//! | search | `POST /{index}/_search` with `_source: false` |
//! | upsert | `POST /_bulk` (NDJSON `index` actions keyed by record id) |
//! | delete | `DELETE /{index}/_doc/{id}` (404 is success) |
//! | create | `HEAD /{index}`, then `PUT /{index}` with the mapping |
//!
//! Response parsing is split out into pure functions so it can be tested
//! without a cluster.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::metrics;
use crate::search::{BoolQuery, EsTranslator, SearchIndex, SortSpec};
use super::traits::{BatchWriteResult, IndexHit, IndexHits, IndexStore, IndexedDocument, StorageError};

fn request_error(op: &str, e: reqwest::Error) -> StorageError {
    if e.is_connect() || e.is_timeout() {
        StorageError::Connection(format!("{}: {}", op, e))
    } else {
        StorageError::Backend(format!("{}: {}", op, e))
    }
}

async fn status_error(op: &str, response: reqwest::Response) -> StorageError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    StorageError::Backend(format!("{} returned {}: {}", op, status, body))
}

/// One Elasticsearch index.
pub struct ElasticIndex {
    client: Client,
    base_url: String,
    index: String,
}

impl ElasticIndex {
    /// Share one HTTP client (and its connection pool) across indices.
    pub fn with_client(client: Client, base_url: &str, index: impl Into<String>) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            index: index.into(),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Create the index from `definition` unless it already exists.
    /// Returns true if it was created.
    pub async fn ensure_index(&self, definition: &SearchIndex) -> Result<bool, StorageError> {
        let exists = self
            .client
            .head(self.url(&self.index))
            .send()
            .await
            .map_err(|e| request_error("index_exists", e))?;

        if exists.status().is_success() {
            debug!(index = %self.index, "Index already exists");
            return Ok(false);
        }

        let response = self
            .client
            .put(self.url(&self.index))
            .json(&definition.to_create_body())
            .send()
            .await
            .map_err(|e| request_error("index_create", e))?;

        if !response.status().is_success() {
            metrics::record_index_operation("create", false);
            return Err(status_error("index_create", response).await);
        }

        metrics::record_index_operation("create", true);
        info!(index = %self.index, fields = definition.fields.len(), "Created search index");
        Ok(true)
    }
}

#[async_trait]
impl IndexStore for ElasticIndex {
    fn name(&self) -> &str {
        &self.index
    }

    async fn search(
        &self,
        query: &BoolQuery,
        sort: &SortSpec,
        offset: usize,
        size: usize,
    ) -> Result<IndexHits, StorageError> {
        let body = EsTranslator::search_body(query, sort, offset, size);
        let response = self
            .client
            .post(self.url(&format!("{}/_search", self.index)))
            .json(&body)
            .send()
            .await
            .map_err(|e| request_error("search", e))?;

        if !response.status().is_success() {
            return Err(status_error("search", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| request_error("search", e))?;
        parse_search_response(&body)
    }

    async fn upsert_batch(&self, docs: &[IndexedDocument]) -> Result<BatchWriteResult, StorageError> {
        if docs.is_empty() {
            return Ok(BatchWriteResult { written: 0, failed: 0 });
        }

        let body = bulk_body(&self.index, docs)?;
        let response = self
            .client
            .post(self.url("_bulk"))
            .header(reqwest::header::CONTENT_TYPE, "application/x-ndjson")
            .body(body)
            .send()
            .await
            .map_err(|e| request_error("bulk", e))?;

        if !response.status().is_success() {
            return Err(status_error("bulk", response).await);
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| request_error("bulk", e))?;
        let result = parse_bulk_response(&body, docs.len());
        if result.failed > 0 {
            warn!(index = %self.index, failed = result.failed, "Bulk request had item failures");
        }
        Ok(result)
    }

    async fn delete_by_id(&self, id: i64) -> Result<(), StorageError> {
        let response = self
            .client
            .delete(self.url(&format!("{}/_doc/{}", self.index, id)))
            .send()
            .await
            .map_err(|e| request_error("delete", e))?;

        match response.status() {
            s if s.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                debug!(index = %self.index, id, "Delete of missing document");
                Ok(())
            }
            _ => Err(status_error("delete", response).await),
        }
    }
}

/// NDJSON body for a bulk `index` request.
pub fn bulk_body(index: &str, docs: &[IndexedDocument]) -> Result<String, StorageError> {
    let mut body = String::new();
    for doc in docs {
        let action = serde_json::json!({ "index": { "_index": index, "_id": doc.id.to_string() } });
        let source = serde_json::to_string(&doc.source).map_err(|e| StorageError::Codec {
            context: format!("{}:{}", index, doc.id),
            message: e.to_string(),
        })?;
        body.push_str(&action.to_string());
        body.push('\n');
        body.push_str(&source);
        body.push('\n');
    }
    Ok(body)
}

/// Extract ordered hit ids and the total from a `_search` response.
pub fn parse_search_response(body: &Value) -> Result<IndexHits, StorageError> {
    let hits = body
        .get("hits")
        .ok_or_else(|| StorageError::Backend("search response has no 'hits'".into()))?;

    // `total` is an object since ES 7, a bare number before
    let total = match hits.get("total") {
        Some(Value::Object(t)) => t.get("value").and_then(Value::as_u64).unwrap_or(0),
        Some(v) => v.as_u64().unwrap_or(0),
        None => 0,
    };

    let mut parsed = Vec::new();
    for hit in hits.get("hits").and_then(Value::as_array).into_iter().flatten() {
        let id = match hit.get("_id") {
            Some(Value::String(s)) => s.parse::<i64>().ok(),
            Some(v) => v.as_i64(),
            None => None,
        };
        let Some(id) = id else {
            warn!(hit = %hit, "Skipping hit with a non-numeric id");
            continue;
        };
        let score = hit.get("_score").and_then(Value::as_f64).map(|s| s as f32);
        parsed.push(IndexHit { id, score });
    }

    Ok(IndexHits { hits: parsed, total })
}

/// Count acknowledged and failed items in a `_bulk` response.
pub fn parse_bulk_response(body: &Value, sent: usize) -> BatchWriteResult {
    if body.get("errors").and_then(Value::as_bool) == Some(false) {
        return BatchWriteResult { written: sent, failed: 0 };
    }

    let failed = body
        .get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter(|item| {
                    item.as_object()
                        .and_then(|o| o.values().next())
                        .map(|action| action.get("error").is_some())
                        .unwrap_or(true)
                })
                .count()
        })
        .unwrap_or(sent);

    BatchWriteResult { written: sent.saturating_sub(failed), failed }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bulk_body_is_ndjson() {
        let docs = vec![
            IndexedDocument { id: 1, source: json!({"id": 1, "title": "a"}) },
            IndexedDocument { id: 2, source: json!({"id": 2, "title": "b"}) },
        ];
        let body = bulk_body("post", &docs).unwrap();
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 4);
        let action: Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(action["index"]["_id"], "1");
        assert_eq!(action["index"]["_index"], "post");
        assert!(body.ends_with('\n'));
    }

    #[test]
    fn test_parse_search_response() {
        let body = json!({
            "hits": {
                "total": {"value": 42, "relation": "eq"},
                "hits": [
                    {"_id": "7", "_score": 2.5},
                    {"_id": "3", "_score": 1.0},
                    {"_id": "not-a-number"}
                ]
            }
        });
        let hits = parse_search_response(&body).unwrap();
        assert_eq!(hits.total, 42);
        assert_eq!(hits.ids(), vec![7, 3]);
        assert_eq!(hits.hits[0].score, Some(2.5));
    }

    #[test]
    fn test_parse_legacy_total() {
        let body = json!({"hits": {"total": 5, "hits": []}});
        assert_eq!(parse_search_response(&body).unwrap().total, 5);
        assert!(parse_search_response(&json!({})).is_err());
    }

    #[test]
    fn test_parse_bulk_response() {
        let ok = json!({"errors": false, "items": []});
        assert_eq!(parse_bulk_response(&ok, 3), BatchWriteResult { written: 3, failed: 0 });

        let partial = json!({
            "errors": true,
            "items": [
                {"index": {"_id": "1", "status": 200}},
                {"index": {"_id": "2", "status": 400, "error": {"type": "mapper_parsing_exception"}}}
            ]
        });
        assert_eq!(parse_bulk_response(&partial, 2), BatchWriteResult { written: 1, failed: 1 });
    }

    #[test]
    fn test_base_url_trailing_slash() {
        let index = ElasticIndex::with_client(Client::new(), "http://localhost:9200/", "post");
        assert_eq!(index.url("post/_search"), "http://localhost:9200/post/_search");
        assert_eq!(index.name(), "post");
    }
}
