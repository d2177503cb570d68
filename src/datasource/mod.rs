// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Polymorphic search dispatch.
//!
//! Every entity type is reachable through the [`Datasource`] trait under its
//! type tag. The [`DatasourceRegistry`] is an explicit table assembled when
//! the engine is built and never changes afterwards; the [`SearchFacade`]
//! resolves a request's `type` through it and returns a uniform envelope.

mod registry;
mod facade;

pub use registry::DatasourceRegistry;
pub use facade::{SearchEnvelope, SearchFacade};

use async_trait::async_trait;
use serde_json::Value;

use crate::error::SearchError;
use crate::model::Entity;
use crate::search::{Page, QueryRequest, SearchExecutor};
use crate::storage::traits::StorageError;

/// A searchable source of records addressed by type tag.
#[async_trait]
pub trait Datasource: Send + Sync {
    fn type_tag(&self) -> &str;

    /// Search and return records flattened to JSON.
    async fn search(&self, request: &QueryRequest) -> Result<Page<Value>, SearchError>;
}

#[async_trait]
impl<R: Entity> Datasource for SearchExecutor<R> {
    fn type_tag(&self) -> &str {
        SearchExecutor::type_tag(self)
    }

    async fn search(&self, request: &QueryRequest) -> Result<Page<Value>, SearchError> {
        let page = SearchExecutor::search(self, request).await?;
        let mut records = Vec::with_capacity(page.records.len());
        for record in &page.records {
            let value = serde_json::to_value(record).map_err(|e| StorageError::Codec {
                context: format!("{}:{}", R::schema().type_tag, record.id()),
                message: e.to_string(),
            })?;
            records.push(value);
        }
        Ok(Page {
            records,
            total: page.total,
            current: page.current,
            size: page.size,
        })
    }
}
