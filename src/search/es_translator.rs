// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Elasticsearch Translator
//!
//! Translates the predicate tree to the Elasticsearch query DSL.
//!
//! # Mapping
//!
//! ```text
//! Clause::Term      → {"term":  {"field": value}}
//! Clause::Match     → {"match": {"field": "text"}}
//! Clause::MatchAll  → {"match_all": {}}
//! Clause::Bool      → {"bool": {...}}       (nested)
//! SortSpec::Score   → [{"_score": {"order": "desc"}}]
//! SortSpec::Field   → [{"field": {"order": "asc|desc"}}]
//! ```
//!
//! Empty clause lists are omitted from the `bool` object.

use serde_json::{json, Map, Value};

use super::query_builder::{BoolQuery, Clause, SortOrder, SortSpec};

/// Elasticsearch query DSL translator
pub struct EsTranslator;

impl EsTranslator {
    /// Translate a predicate tree to a `{"bool": {...}}` query object
    pub fn translate(query: &BoolQuery) -> Value {
        let mut body = Map::new();
        Self::push_clauses(&mut body, "filter", &query.filter);
        Self::push_clauses(&mut body, "must", &query.must);
        Self::push_clauses(&mut body, "must_not", &query.must_not);
        Self::push_clauses(&mut body, "should", &query.should);
        if let Some(n) = query.minimum_should_match {
            body.insert("minimum_should_match".into(), json!(n));
        }
        json!({ "bool": Value::Object(body) })
    }

    /// Translate a sort specification to an Elasticsearch `sort` array
    pub fn translate_sort(sort: &SortSpec) -> Value {
        match sort {
            SortSpec::Score => json!([{ "_score": { "order": "desc" } }]),
            SortSpec::Field { field, order } => {
                let order = match order {
                    SortOrder::Asc => "asc",
                    SortOrder::Desc => "desc",
                };
                let mut entry = Map::new();
                entry.insert(field.clone(), json!({ "order": order }));
                Value::Array(vec![Value::Object(entry)])
            }
        }
    }

    /// Full `_search` request body for one page.
    ///
    /// `_source` is disabled: only hit ids are read back.
    pub fn search_body(query: &BoolQuery, sort: &SortSpec, offset: usize, size: usize) -> Value {
        json!({
            "query": Self::translate(query),
            "sort": Self::translate_sort(sort),
            "from": offset,
            "size": size,
            "_source": false,
            "track_total_hits": true,
        })
    }

    fn push_clauses(body: &mut Map<String, Value>, key: &str, clauses: &[Clause]) {
        if clauses.is_empty() {
            return;
        }
        let translated: Vec<Value> = clauses.iter().map(Self::translate_clause).collect();
        body.insert(key.to_string(), Value::Array(translated));
    }

    fn translate_clause(clause: &Clause) -> Value {
        match clause {
            Clause::Term { field, value } => {
                let mut inner = Map::new();
                inner.insert(field.clone(), value.clone());
                json!({ "term": Value::Object(inner) })
            }
            Clause::Match { field, text } => {
                let mut inner = Map::new();
                inner.insert(field.clone(), Value::String(text.clone()));
                json!({ "match": Value::Object(inner) })
            }
            Clause::MatchAll => json!({ "match_all": {} }),
            Clause::Bool(nested) => Self::translate(nested),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_term_clause() {
        let query = BoolQuery::new().filter(Clause::term("isDelete", 0));
        assert_eq!(
            EsTranslator::translate(&query),
            json!({ "bool": { "filter": [ { "term": { "isDelete": 0 } } ] } })
        );
    }

    #[test]
    fn test_match_all_fallback() {
        let query = BoolQuery::new()
            .filter(Clause::term("isDelete", 0))
            .must(Clause::MatchAll);
        assert_eq!(
            EsTranslator::translate(&query),
            json!({ "bool": {
                "filter": [ { "term": { "isDelete": 0 } } ],
                "must": [ { "match_all": {} } ]
            } })
        );
    }

    #[test]
    fn test_should_with_minimum() {
        let query = BoolQuery::new()
            .should(Clause::text("title", "alpha"))
            .should(Clause::text("content", "alpha"))
            .minimum_should_match(1);
        assert_eq!(
            EsTranslator::translate(&query),
            json!({ "bool": {
                "should": [
                    { "match": { "title": "alpha" } },
                    { "match": { "content": "alpha" } }
                ],
                "minimum_should_match": 1
            } })
        );
    }

    #[test]
    fn test_nested_or_group() {
        let group = BoolQuery::new()
            .should(Clause::term("tags", "x"))
            .should(Clause::term("tags", "y"))
            .minimum_should_match(1);
        let query = BoolQuery::new().filter(Clause::group(group));

        let translated = EsTranslator::translate(&query);
        assert_eq!(
            translated["bool"]["filter"][0]["bool"]["should"][1],
            json!({ "term": { "tags": "y" } })
        );
        assert_eq!(translated["bool"]["filter"][0]["bool"]["minimum_should_match"], json!(1));
    }

    #[test]
    fn test_must_not() {
        let query = BoolQuery::new().must_not(Clause::term("id", 9));
        assert_eq!(
            EsTranslator::translate(&query),
            json!({ "bool": { "must_not": [ { "term": { "id": 9 } } ] } })
        );
    }

    #[test]
    fn test_sort_translation() {
        assert_eq!(
            EsTranslator::translate_sort(&SortSpec::Score),
            json!([{ "_score": { "order": "desc" } }])
        );
        assert_eq!(
            EsTranslator::translate_sort(&SortSpec::Field { field: "createTime".into(), order: SortOrder::Asc }),
            json!([{ "createTime": { "order": "asc" } }])
        );
    }

    #[test]
    fn test_search_body_paging() {
        let body = EsTranslator::search_body(&BoolQuery::new(), &SortSpec::Score, 20, 10);
        assert_eq!(body["from"], json!(20));
        assert_eq!(body["size"], json!(10));
        assert_eq!(body["_source"], json!(false));
        assert_eq!(body["track_total_hits"], json!(true));
    }
}
