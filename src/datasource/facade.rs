// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, instrument};

use crate::error::SearchError;
use crate::search::QueryRequest;
use super::DatasourceRegistry;

/// Uniform search response across all datasources.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchEnvelope {
    pub data_list: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
}

/// Single entry point that routes a request to the datasource named by its
/// `type`.
#[derive(Debug, Clone)]
pub struct SearchFacade {
    registry: Arc<DatasourceRegistry>,
    default_type: String,
}

impl SearchFacade {
    pub fn new(registry: Arc<DatasourceRegistry>, default_type: impl Into<String>) -> Self {
        Self {
            registry,
            default_type: default_type.into(),
        }
    }

    pub fn registry(&self) -> &DatasourceRegistry {
        &self.registry
    }

    #[instrument(skip_all, fields(kind))]
    pub async fn search_all(&self, request: &QueryRequest) -> Result<SearchEnvelope, SearchError> {
        let kind = request
            .datasource_type
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .unwrap_or(&self.default_type);
        tracing::Span::current().record("kind", kind);

        let source = self.registry.get(kind)?;
        let page = source.search(request).await?;
        debug!(returned = page.records.len(), total = page.total, "Facade search complete");

        Ok(SearchEnvelope {
            data_list: page.records,
            total: Some(page.total),
        })
    }
}
