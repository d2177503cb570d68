// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search-facing API of the engine.

use tracing::{info, instrument};

use crate::datasource::SearchEnvelope;
use crate::error::SearchError;
use crate::search::QueryRequest;

use super::SearchEngine;

impl SearchEngine {
    /// Search the datasource named by `request.type` (default from config).
    pub async fn search(&self, request: &QueryRequest) -> Result<SearchEnvelope, SearchError> {
        self.facade.search_all(request).await
    }

    /// Remove a document from its index right away.
    ///
    /// For hosts that hard-delete records: without this call the document
    /// lingers until a search surfaces it and the reconciler removes it.
    #[instrument(skip(self))]
    pub async fn remove_document(&self, type_tag: &str, id: i64) -> Result<(), SearchError> {
        let index = self
            .indexes
            .get(type_tag)
            .ok_or_else(|| SearchError::UnknownDatasource(type_tag.to_string()))?;
        index.delete_by_id(id).await?;
        info!(kind = type_tag, id, "Removed document on request");
        Ok(())
    }
}
