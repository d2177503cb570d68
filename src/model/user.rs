// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::search::{EntitySchema, FilterField, SearchIndex};
use super::tags::{parse_tags, serialize_tags};
use super::Entity;

/// A user row. Credentials never leave the authoritative store and are not
/// part of this record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub user_account: String,
    pub user_name: String,
    pub user_avatar: String,
    pub user_profile: String,
    /// "user", "admin" or "ban"
    pub user_role: String,
    /// JSON array in a string
    pub tags: String,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

/// Index projection of a [`User`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDocument {
    pub id: i64,
    pub user_account: String,
    pub user_name: String,
    pub user_profile: String,
    pub user_role: String,
    pub tags: Vec<String>,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

static USER_SCHEMA: EntitySchema = EntitySchema {
    type_tag: "user",
    text_fields: &["userName", "userProfile"],
    filter_fields: &[FilterField::keyword("userRole"), FilterField::keyword("userAccount")],
    sort_fields: &["createTime", "updateTime"],
    tag_field: Some("tags"),
    status_filter: None,
};

impl Entity for User {
    type Document = UserDocument;

    fn schema() -> &'static EntitySchema {
        &USER_SCHEMA
    }

    fn search_index() -> SearchIndex {
        SearchIndex::new("user")
            .keyword("userAccount")
            .text("userName")
            .text("userProfile")
            .keyword("userRole")
            .keyword("tags")
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

    fn to_document(&self) -> UserDocument {
        UserDocument {
            id: self.id,
            user_account: self.user_account.clone(),
            user_name: self.user_name.clone(),
            user_profile: self.user_profile.clone(),
            user_role: self.user_role.clone(),
            tags: parse_tags(&self.tags),
            create_time: self.create_time,
            update_time: self.update_time,
            is_delete: self.is_delete,
        }
    }

    fn from_document(doc: &UserDocument) -> Self {
        Self {
            id: doc.id,
            user_account: doc.user_account.clone(),
            user_name: doc.user_name.clone(),
            user_avatar: String::new(),
            user_profile: doc.user_profile.clone(),
            user_role: doc.user_role.clone(),
            tags: serialize_tags(&doc.tags),
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
    fn test_round_trip_drops_avatar() {
        let user = User {
            id: 5,
            user_name: "alice".into(),
            user_avatar: "https://cdn/a.png".into(),
            user_role: "admin".into(),
            tags: r#"["go"]"#.into(),
            ..Default::default()
        };
        let doc = user.to_document();
        assert_eq!(doc.tags, vec!["go"]);

        let partial = User::from_document(&doc);
        assert_eq!(partial.id, 5);
        assert_eq!(partial.user_role, "admin");
        assert!(partial.user_avatar.is_empty());
    }

    #[test]
    fn test_filter_fields_are_keywords() {
        let index = User::search_index();
        for field in User::schema().filter_fields {
            assert!(index.get(field.name).is_some());
        }
    }
}
