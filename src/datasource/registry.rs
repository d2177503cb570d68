// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::info;

use crate::error::SearchError;
use super::Datasource;

/// Immutable map from type tag to datasource.
pub struct DatasourceRegistry {
    sources: HashMap<String, Arc<dyn Datasource>>,
}

impl std::fmt::Debug for DatasourceRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DatasourceRegistry")
            .field("types", &self.types())
            .finish()
    }
}

impl DatasourceRegistry {
    /// Build the registry. Two datasources claiming the same tag is a
    /// wiring mistake and fails here rather than at query time.
    pub fn new(entries: Vec<Arc<dyn Datasource>>) -> Result<Self, SearchError> {
        let mut sources: HashMap<String, Arc<dyn Datasource>> = HashMap::with_capacity(entries.len());
        for source in entries {
            let tag = source.type_tag().to_string();
            if sources.contains_key(&tag) {
                return Err(SearchError::Validation(format!(
                    "datasource type '{}' registered twice",
                    tag
                )));
            }
            sources.insert(tag, source);
        }

        let registry = Self { sources };
        info!(types = ?registry.types(), "Datasource registry built");
        Ok(registry)
    }

    pub fn get(&self, type_tag: &str) -> Result<Arc<dyn Datasource>, SearchError> {
        self.sources
            .get(type_tag)
            .cloned()
            .ok_or_else(|| SearchError::UnknownDatasource(type_tag.to_string()))
    }

    /// Registered tags, sorted
    pub fn types(&self) -> Vec<&str> {
        let mut types: Vec<&str> = self.sources.keys().map(String::as_str).collect();
        types.sort_unstable();
        types
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }
}
