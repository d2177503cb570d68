// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Index definitions
//!
//! Describes the field layout of one entity index and renders it as an
//! Elasticsearch index-creation body.
//!
//! ```text
//! PUT /post
//! {
//!   "mappings": {
//!     "properties": {
//!       "title":      { "type": "text" },
//!       "tags":       { "type": "keyword" },
//!       "userId":     { "type": "long" },
//!       "createTime": { "type": "date" }
//!     }
//!   }
//! }
//! ```

use serde_json::{json, Map, Value};

/// Index definition for one entity type
#[derive(Debug, Clone, PartialEq)]
pub struct SearchIndex {
    /// Index name (before any configured prefix)
    pub name: String,
    /// Field definitions
    pub fields: Vec<SearchField>,
}

impl SearchIndex {
    /// Create a new index definition
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Add an analyzed full-text field
    pub fn text(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Text, None)
    }


    /// Add an exact-match field (single value or list)
    pub fn keyword(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Keyword, None)
    }

    /// Add an integer field
    pub fn long(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Long, None)
    }

    /// Add an epoch-millis date field
    pub fn date(self, name: impl Into<String>) -> Self {
        self.field(name, SearchFieldType::Date, None)
    }

    fn field(mut self, name: impl Into<String>, field_type: SearchFieldType, analyzer: Option<String>) -> Self {
        self.fields.push(SearchField {
            name: name.into(),
            field_type,
            analyzer,
        });
        self
    }

    /// Use `analyzer` for every text field that has none. `None` keeps the
    /// index default.
    pub fn with_text_analyzer(mut self, analyzer: Option<&str>) -> Self {
        if let Some(analyzer) = analyzer {
            for field in &mut self.fields {
                if field.field_type == SearchFieldType::Text && field.analyzer.is_none() {
                    field.analyzer = Some(analyzer.to_string());
                }
            }
        }
        self
    }

    /// Look up a field by name
    pub fn get(&self, name: &str) -> Option<&SearchField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Elasticsearch `mappings` object
    pub fn to_mapping(&self) -> Value {
        let mut properties = Map::new();
        for field in &self.fields {
            properties.insert(field.name.clone(), field.to_property());
        }
        json!({ "properties": Value::Object(properties) })
    }

    /// Body for `PUT /{index}`
    pub fn to_create_body(&self) -> Value {
        json!({ "mappings": self.to_mapping() })
    }
}

/// Field definition
#[derive(Debug, Clone, PartialEq)]
pub struct SearchField {
    pub name: String,
    pub field_type: SearchFieldType,
    pub analyzer: Option<String>,
}

impl SearchField {
    fn to_property(&self) -> Value {
        let mut property = Map::new();
        property.insert("type".into(), json!(self.field_type.to_string()));
        if self.field_type == SearchFieldType::Date {
            property.insert("format".into(), json!("epoch_millis"));
        }
        if let Some(ref analyzer) = self.analyzer {
            property.insert("analyzer".into(), json!(analyzer));
        }
        Value::Object(property)
    }
}

/// Field types understood by the index
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SearchFieldType {
    /// Analyzed, scored full text
    Text,
    /// Exact value, filterable, also used for tag lists
    Keyword,
    /// 64-bit integer
    Long,
    /// Epoch milliseconds
    Date,
}

impl std::fmt::Display for SearchFieldType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SearchFieldType::Text => write!(f, "text"),
            SearchFieldType::Keyword => write!(f, "keyword"),
            SearchFieldType::Long => write!(f, "long"),
            SearchFieldType::Date => write!(f, "date"),
        }
    }
}
