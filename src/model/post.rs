// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::search::{EntitySchema, FilterField, SearchIndex};
use super::tags::{parse_tags, serialize_tags};
use super::Entity;

/// A post row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Post {
    pub id: i64,
    pub title: String,
    pub content: String,
    /// JSON array in a string, e.g. `["rust","tokio"]`
    pub tags: String,
    pub thumb_num: i64,
    pub favour_num: i64,
    pub user_id: i64,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

/// Index projection of a [`Post`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDocument {
    pub id: i64,
    pub title: String,
    pub content: String,
    pub tags: Vec<String>,
    pub thumb_num: i64,
    pub favour_num: i64,
    pub user_id: i64,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

static POST_SCHEMA: EntitySchema = EntitySchema {
    type_tag: "post",
    text_fields: &["title", "content"],
    filter_fields: &[FilterField::long("userId")],
    sort_fields: &["createTime", "updateTime", "thumbNum", "favourNum"],
    tag_field: Some("tags"),
    status_filter: None,
};

impl Entity for Post {
    type Document = PostDocument;

    fn schema() -> &'static EntitySchema {
        &POST_SCHEMA
    }

    fn search_index() -> SearchIndex {
        SearchIndex::new("post")
            .text("title")
            .text("content")
            .keyword("tags")
            .long("thumbNum")
            .long("favourNum")
            .long("userId")
            .date("createTime")
            .date("updateTime")
            .long("isDelete")
    }

    fn id(&self) -> i64 {
        self.id
    }

    fn update_time(&self) -> i64 {
        self.update_time
    }

    fn is_deleted(&self) -> bool {
        self.is_delete != 0
    }

    fn to_document(&self) -> PostDocument {
        PostDocument {
            id: self.id,
            title: self.title.clone(),
            content: self.content.clone(),
            tags: parse_tags(&self.tags),
            thumb_num: self.thumb_num,
            favour_num: self.favour_num,
            user_id: self.user_id,
            create_time: self.create_time,
            update_time: self.update_time,
            is_delete: self.is_delete,
        }
    }

    fn from_document(doc: &PostDocument) -> Self {
        Self {
            id: doc.id,
            title: doc.title.clone(),
            content: doc.content.clone(),
            tags: serialize_tags(&doc.tags),
            thumb_num: doc.thumb_num,
            favour_num: doc.favour_num,
            user_id: doc.user_id,
            create_time: doc.create_time,
            update_time: doc.update_time,
            is_delete: doc.is_delete,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_document_parses_tags() {
        let post = Post {
            id: 1,
            title: "alpha".into(),
            tags: r#"["rust","search"]"#.into(),
            ..Default::default()
        };
        let doc = post.to_document();
        assert_eq!(doc.id, 1);
        assert_eq!(doc.tags, vec!["rust", "search"]);
    }

    #[test]
    fn test_malformed_tags_become_empty() {
        let post = Post { id: 2, tags: "rust,search".into(), ..Default::default() };
        assert!(post.to_document().tags.is_empty());
    }

    #[test]
    fn test_from_document() {
        let doc = PostDocument {
            id: 3,
            title: "t".into(),
            tags: vec!["a".into()],
            is_delete: 1,
            ..Default::default()
        };
        let post = Post::from_document(&doc);
        assert_eq!(post.id, 3);
        assert_eq!(post.tags, r#"["a"]"#);
        assert!(post.is_deleted());
    }

    #[test]
    fn test_document_field_names() {
        let doc = Post { id: 4, user_id: 9, ..Default::default() }.to_document();
        let value = serde_json::to_value(doc).unwrap();
        assert_eq!(value["userId"], 9);
        assert!(value.get("isDelete").is_some());
        assert!(value.get("updateTime").is_some());
    }

    #[test]
    fn test_schema_fields_are_indexed() {
        let index = Post::search_index();
        for field in Post::schema().text_fields {
            assert!(index.get(field).is_some(), "missing {}", field);
        }
        for field in Post::schema().sort_fields {
            assert!(index.get(field).is_some(), "missing {}", field);
        }
    }
}
