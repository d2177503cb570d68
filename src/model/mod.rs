// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Authoritative records and their index documents.
//!
//! Each entity type pairs a record (the relational row, source of truth)
//! with a flattened, denormalized document (the index-side projection).
//! The document id always equals the record id.
//!
//! | Type tag | Record | Document | Tags |
//! |----------|--------|----------|------|
//! | `post`   | [`Post`]  | [`PostDocument`]  | yes |
//! | `user`   | [`User`]  | [`UserDocument`]  | yes |
//! | `chart`  | [`Chart`] | [`ChartDocument`] | no  |

pub mod tags;
mod post;
mod user;
mod chart;

pub use post::{Post, PostDocument};
pub use user::{User, UserDocument};
pub use chart::{Chart, ChartDocument};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::search::{EntitySchema, SearchIndex};
use crate::storage::traits::{IndexedDocument, StorageError};

/// A searchable entity type.
pub trait Entity: Clone + Send + Sync + Serialize + 'static {
    /// Index-side projection
    type Document: Clone + Send + Sync + Serialize + DeserializeOwned + 'static;

    /// How requests against this entity are turned into predicates
    fn schema() -> &'static EntitySchema;

    /// Index field layout
    fn search_index() -> SearchIndex;

    fn id(&self) -> i64;

    /// Last update, epoch millis
    fn update_time(&self) -> i64;

    fn is_deleted(&self) -> bool;

    fn to_document(&self) -> Self::Document;

    /// Partial record rebuilt from a document; fields the document does not
    /// carry are defaulted.
    fn from_document(doc: &Self::Document) -> Self;
}

/// Null-safe record → document mapping.
pub fn to_document<R: Entity>(record: Option<&R>) -> Option<R::Document> {
    record.map(R::to_document)
}

/// Null-safe document → record mapping.
pub fn from_document<R: Entity>(doc: Option<&R::Document>) -> Option<R> {
    doc.map(R::from_document)
}

/// Map a record to the untyped form pushed to the index.
pub fn to_indexed<R: Entity>(record: &R) -> Result<IndexedDocument, StorageError> {
    let source = serde_json::to_value(record.to_document()).map_err(|e| StorageError::Codec {
        context: format!("{}:{}", R::schema().type_tag, record.id()),
        message: e.to_string(),
    })?;
    Ok(IndexedDocument { id: record.id(), source })
}
