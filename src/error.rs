// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Errors surfaced to search callers.

use thiserror::Error;

use crate::storage::traits::StorageError;

#[derive(Error, Debug)]
pub enum SearchError {
    /// The request was rejected before any store was touched.
    #[error("Invalid request: {0}")]
    Validation(String),
    #[error("No such datasource type: '{0}'")]
    UnknownDatasource(String),
    /// Index or authoritative store failed while answering.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SearchError {
    /// True for errors caused by the request itself (bad-request class).
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::UnknownDatasource(_))
    }
}
