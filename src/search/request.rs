// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query request and page types shared by every datasource.
//!
//! Requests arrive as plain structured fields (camelCase on the wire):
//!
//! ```
//! use index_sync::search::QueryRequest;
//!
//! let request: QueryRequest = serde_json::from_str(r#"{
//!     "current": 2,
//!     "pageSize": 10,
//!     "searchText": "rust",
//!     "type": "post",
//!     "tags": ["backend"],
//!     "orTags": ["tokio", "async"],
//!     "sortField": "createTime",
//!     "sortOrder": "ascend"
//! }"#).unwrap();
//!
//! assert_eq!(request.offset(), 10);
//! assert!(request.validate(20).is_ok());
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::SearchError;

/// Canonical ascending sort marker. Any other order token sorts descending.
pub const SORT_ORDER_ASC: &str = "ascend";

fn default_current() -> u64 { 1 }
fn default_page_size() -> u64 { 10 }

/// A structured search request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryRequest {
    /// 1-based page number
    #[serde(default = "default_current")]
    pub current: u64,
    #[serde(default = "default_page_size")]
    pub page_size: u64,
    #[serde(default)]
    pub search_text: Option<String>,
    /// Datasource type tag (e.g. "post"); the facade defaults it
    #[serde(default, rename = "type")]
    pub datasource_type: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub not_id: Option<i64>,
    /// Exact-match filters keyed by document field name
    #[serde(default)]
    pub filters: BTreeMap<String, String>,
    /// Every tag must be present
    #[serde(default)]
    pub tags: Vec<String>,
    /// At least one tag must be present
    #[serde(default)]
    pub or_tags: Vec<String>,
    #[serde(default)]
    pub sort_field: Option<String>,
    #[serde(default)]
    pub sort_order: Option<String>,
}

impl Default for QueryRequest {
    fn default() -> Self {
        Self {
            current: default_current(),
            page_size: default_page_size(),
            search_text: None,
            datasource_type: None,
            id: None,
            not_id: None,
            filters: BTreeMap::new(),
            tags: Vec::new(),
            or_tags: Vec::new(),
            sort_field: None,
            sort_order: None,
        }
    }
}

impl QueryRequest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_search_text(mut self, text: impl Into<String>) -> Self {
        self.search_text = Some(text.into());
        self
    }

    pub fn with_type(mut self, datasource_type: impl Into<String>) -> Self {
        self.datasource_type = Some(datasource_type.into());
        self
    }

    pub fn with_page(mut self, current: u64, page_size: u64) -> Self {
        self.current = current;
        self.page_size = page_size;
        self
    }

    pub fn with_filter(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    pub fn with_tags(mut self, tags: Vec<String>) -> Self {
        self.tags = tags;
        self
    }

    pub fn with_or_tags(mut self, or_tags: Vec<String>) -> Self {
        self.or_tags = or_tags;
        self
    }

    pub fn with_sort(mut self, field: impl Into<String>, order: impl Into<String>) -> Self {
        self.sort_field = Some(field.into());
        self.sort_order = Some(order.into());
        self
    }

    /// Free-text query, trimmed; `None` when blank.
    pub fn search_text(&self) -> Option<&str> {
        self.search_text.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }

    /// Zero-based document offset of the requested page.
    pub fn offset(&self) -> usize {
        (self.current.saturating_sub(1) as usize).saturating_mul(self.page_size as usize)
    }

    /// Reject paging outside `1..=max_page_size` before any store is touched.
    pub fn validate(&self, max_page_size: u64) -> Result<(), SearchError> {
        if self.current < 1 {
            return Err(SearchError::Validation("current page must be >= 1".into()));
        }
        if self.page_size < 1 {
            return Err(SearchError::Validation("page size must be >= 1".into()));
        }
        if self.page_size > max_page_size {
            return Err(SearchError::Validation(format!(
                "page size {} exceeds the maximum of {}",
                self.page_size, max_page_size
            )));
        }
        Ok(())
    }
}

/// One page of search results.
///
/// `total` is the index-reported hit count. Records whose authoritative row
/// is gone are pruned from `records`, so `records.len()` may fall short of
/// what `total` implies for this page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    pub records: Vec<T>,
    pub total: u64,
    pub current: u64,
    pub size: u64,
}

impl<T> Page<T> {
    pub fn empty(current: u64, size: u64) -> Self {
        Self { records: Vec::new(), total: 0, current, size }
    }

    pub fn map<U>(self, f: impl FnMut(T) -> U) -> Page<U> {
        Page {
            records: self.records.into_iter().map(f).collect(),
            total: self.total,
            current: self.current,
            size: self.size,
        }
    }
}
