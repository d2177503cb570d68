// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Search Infrastructure
//!
//! Query construction, index translation and the reconciling executor.
//!
//! # Architecture
//!
//! ```text
//! QueryRequest
//!     ↓ build_predicate / build_sort (per EntitySchema)
//! BoolQuery + SortSpec
//!     ↓ IndexStore::search  (EsTranslator for Elasticsearch)
//! ordered hit ids + total
//!     ↓ RecordStore::get_by_ids (one round trip)
//! Page<Record>   ── missing ids ──→ Reconciler (background deletes)
//! ```

mod query_builder;
mod es_translator;
mod index_manager;
mod request;
mod executor;
mod reconciler;

pub use query_builder::{
    build_predicate, build_sort, BoolQuery, Clause, EntitySchema, FilterField, FilterKind,
    SortOrder, SortSpec, FIELD_ID, FIELD_IS_DELETE,
};
pub use es_translator::EsTranslator;
pub use index_manager::{SearchField, SearchFieldType, SearchIndex};
pub use request::{Page, QueryRequest, SORT_ORDER_ASC};
pub use executor::SearchExecutor;
pub use reconciler::{ReconcileConfig, ReconcileStats, Reconciler};
