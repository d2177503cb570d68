// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Query Builder - boolean predicate tree for index queries
//!
//! Turns a [`QueryRequest`] into a [`BoolQuery`] plus a [`SortSpec`] for one
//! entity type, driven by that entity's static [`EntitySchema`].
//!
//! # Construction order
//!
//! ```text
//! filter   isDelete == 0                       (always)
//! filter   status == <schema status>           (charts: "succeed")
//! filter   id == ..  / must_not id == notId    (exact filters)
//! filter   <field> == ..                        (declared filter fields)
//! filter   tags == a, tags == b                 (AND tags)
//! filter   bool { should: tags == x | tags == y, msm: 1 }   (OR tags)
//! should   match(<text field>, searchText) ..   (msm: 1)
//!   or
//! must     match_all                            (no search text)
//! ```
//!
//! # Example
//!
//! ```rust
//! use index_sync::search::{build_predicate, QueryRequest};
//! use index_sync::model::{Entity, Post};
//!
//! let request = QueryRequest::new()
//!     .with_search_text("alpha")
//!     .with_tags(vec!["rust".into()]);
//!
//! let query = build_predicate(Post::schema(), &request).unwrap();
//! assert_eq!(query.minimum_should_match, Some(1));
//! assert!(query.has_not_deleted_filter());
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::SearchError;
use super::request::{QueryRequest, SORT_ORDER_ASC};

/// Soft-delete flag field present on every document
pub const FIELD_IS_DELETE: &str = "isDelete";
/// Identifier field present on every document
pub const FIELD_ID: &str = "id";

/// A single predicate clause
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Clause {
    /// Exact (keyword/numeric) equality; on list fields, membership
    Term { field: String, value: Value },
    /// Analyzed full-text match
    Match { field: String, text: String },
    /// Matches every document
    MatchAll,
    /// Nested boolean group
    Bool(Box<BoolQuery>),
}

impl Clause {
    /// Exact-match clause
    pub fn term(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Term {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Full-text clause
    pub fn text(field: impl Into<String>, text: impl Into<String>) -> Self {
        Self::Match {
            field: field.into(),
            text: text.into(),
        }
    }

    /// Wrap a nested group
    pub fn group(query: BoolQuery) -> Self {
        Self::Bool(Box::new(query))
    }
}

/// Boolean predicate tree.
///
/// - `filter`: must match, not scored
/// - `must`: must match, scored
/// - `must_not`: must not match
/// - `should`: scored; at least `minimum_should_match` must hit when set
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BoolQuery {
    pub filter: Vec<Clause>,
    pub must: Vec<Clause>,
    pub must_not: Vec<Clause>,
    pub should: Vec<Clause>,
    pub minimum_should_match: Option<u32>,
}

impl BoolQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn filter(mut self, clause: Clause) -> Self {
        self.filter.push(clause);
        self
    }

    pub fn must(mut self, clause: Clause) -> Self {
        self.must.push(clause);
        self
    }

    pub fn must_not(mut self, clause: Clause) -> Self {
        self.must_not.push(clause);
        self
    }

    pub fn should(mut self, clause: Clause) -> Self {
        self.should.push(clause);
        self
    }

    pub fn minimum_should_match(mut self, n: u32) -> Self {
        self.minimum_should_match = Some(n);
        self
    }

    /// True when the tree carries the `isDelete == 0` filter.
    pub fn has_not_deleted_filter(&self) -> bool {
        self.filter.iter().any(|c| {
            matches!(c, Clause::Term { field, value } if field == FIELD_IS_DELETE && *value == Value::from(0))
        })
    }

    /// True when the only scored clause is an explicit match-all.
    pub fn is_match_all(&self) -> bool {
        self.should.is_empty() && self.must.iter().all(|c| matches!(c, Clause::MatchAll)) && !self.must.is_empty()
    }
}

/// Sort direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortOrder {
    Asc,
    Desc,
}

impl SortOrder {
    /// Ascending iff the token equals the canonical marker.
    pub fn from_token(token: Option<&str>) -> Self {
        match token {
            Some(t) if t.trim() == SORT_ORDER_ASC => Self::Asc,
            _ => Self::Desc,
        }
    }
}

/// Result ordering
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum SortSpec {
    /// Relevance (score descending)
    #[default]
    Score,
    /// Explicit field sort
    Field { field: String, order: SortOrder },
}

/// Value type of an exact-filter field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Keyword,
    Long,
}

/// A field that may be used as an exact filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterField {
    pub name: &'static str,
    pub kind: FilterKind,
}

impl FilterField {
    pub const fn keyword(name: &'static str) -> Self {
        Self { name, kind: FilterKind::Keyword }
    }

    pub const fn long(name: &'static str) -> Self {
        Self { name, kind: FilterKind::Long }
    }
}

/// Static description of how one entity type is searched.
#[derive(Debug, Clone, Copy)]
pub struct EntitySchema {
    /// Datasource type tag (e.g. "post")
    pub type_tag: &'static str,
    /// Fields matched by free text (one `should` clause each)
    pub text_fields: &'static [&'static str],
    /// Fields usable in `filters`
    pub filter_fields: &'static [FilterField],
    /// Fields usable as `sortField`
    pub sort_fields: &'static [&'static str],
    /// Keyword-list field for tag filters, if the entity carries tags
    pub tag_field: Option<&'static str>,
    /// Mandatory status filter, if only some statuses are searchable
    pub status_filter: Option<(&'static str, &'static str)>,
}

impl EntitySchema {
    fn filter_field(&self, name: &str) -> Option<&FilterField> {
        self.filter_fields.iter().find(|f| f.name == name)
    }
}

/// Build the predicate tree for `request` against `schema`.
pub fn build_predicate(schema: &EntitySchema, request: &QueryRequest) -> Result<BoolQuery, SearchError> {
    let mut query = BoolQuery::new().filter(Clause::term(FIELD_IS_DELETE, 0));

    if let Some((field, status)) = schema.status_filter {
        query = query.filter(Clause::term(field, status));
    }

    if let Some(id) = request.id {
        query = query.filter(Clause::term(FIELD_ID, id));
    }
    if let Some(not_id) = request.not_id {
        query = query.must_not(Clause::term(FIELD_ID, not_id));
    }

    // BTreeMap iteration keeps clause order deterministic
    for (name, raw) in &request.filters {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        let field = schema.filter_field(name).ok_or_else(|| {
            SearchError::Validation(format!(
                "field '{}' is not filterable on '{}'",
                name, schema.type_tag
            ))
        })?;
        let clause = match field.kind {
            FilterKind::Keyword => Clause::term(field.name, value),
            FilterKind::Long => {
                let n: i64 = value.parse().map_err(|_| {
                    SearchError::Validation(format!("field '{}' expects an integer, got '{}'", name, value))
                })?;
                Clause::term(field.name, n)
            }
        };
        query = query.filter(clause);
    }

    let tags: Vec<&str> = non_blank(&request.tags);
    let or_tags: Vec<&str> = non_blank(&request.or_tags);
    if !tags.is_empty() || !or_tags.is_empty() {
        let tag_field = schema.tag_field.ok_or_else(|| {
            SearchError::Validation(format!("'{}' does not support tag filters", schema.type_tag))
        })?;
        for tag in tags {
            query = query.filter(Clause::term(tag_field, tag));
        }
        if !or_tags.is_empty() {
            let group = or_tags
                .into_iter()
                .fold(BoolQuery::new(), |g, tag| g.should(Clause::term(tag_field, tag)))
                .minimum_should_match(1);
            query = query.filter(Clause::group(group));
        }
    }

    match request.search_text() {
        Some(text) if !schema.text_fields.is_empty() => {
            for field in schema.text_fields {
                query = query.should(Clause::text(*field, text));
            }
            query = query.minimum_should_match(1);
        }
        _ => {
            query = query.must(Clause::MatchAll);
        }
    }

    Ok(query)
}

/// Build the sort specification. Unknown or blank fields fall back to relevance.
pub fn build_sort(schema: &EntitySchema, field: Option<&str>, order: Option<&str>) -> SortSpec {
    match field.map(str::trim) {
        Some(f) if schema.sort_fields.contains(&f) => SortSpec::Field {
            field: f.to_string(),
            order: SortOrder::from_token(order),
        },
        _ => SortSpec::Score,
    }
}

fn non_blank(values: &[String]) -> Vec<&str> {
    values
        .iter()
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .collect()
}
