// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

use serde::{Deserialize, Serialize};

use crate::search::{EntitySchema, FilterField, SearchIndex};
use super::Entity;

/// Generation status a chart must have to be searchable.
pub const CHART_STATUS_SUCCEED: &str = "succeed";

/// A generated-chart row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chart {
    pub id: i64,
    pub name: String,
    /// Analysis goal as entered by the user
    pub goal: String,
    pub chart_type: String,
    pub chart_data: String,
    pub gen_chart: String,
    pub gen_result: String,
    /// "wait", "running", "succeed" or "failed"
    pub status: String,
    pub exec_message: String,
    pub user_id: i64,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

/// Index projection of a [`Chart`]. Raw data and the generated chart
/// definition stay in the authoritative store.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChartDocument {
    pub id: i64,
    pub name: String,
    pub goal: String,
    pub chart_type: String,
    pub status: String,
    pub user_id: i64,
    pub create_time: i64,
    pub update_time: i64,
    pub is_delete: i32,
}

static CHART_SCHEMA: EntitySchema = EntitySchema {
    type_tag: "chart",
    text_fields: &["name", "goal"],
    filter_fields: &[FilterField::keyword("chartType"), FilterField::long("userId")],
    sort_fields: &["createTime", "updateTime"],
    tag_field: None,
    status_filter: Some(("status", CHART_STATUS_SUCCEED)),
};

impl Entity for Chart {
    type Document = ChartDocument;

    fn schema() -> &'static EntitySchema {
        &CHART_SCHEMA
    }

    fn search_index() -> SearchIndex {
        SearchIndex::new("chart")
            .text("name")
            .text("goal")
            .keyword("chartType")
            .keyword("status")
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

    fn to_document(&self) -> ChartDocument {
        ChartDocument {
            id: self.id,
            name: self.name.clone(),
            goal: self.goal.clone(),
            chart_type: self.chart_type.clone(),
            status: self.status.clone(),
            user_id: self.user_id,
            create_time: self.create_time,
            update_time: self.update_time,
            is_delete: self.is_delete,
        }
    }

    fn from_document(doc: &ChartDocument) -> Self {
        Self {
            id: doc.id,
            name: doc.name.clone(),
            goal: doc.goal.clone(),
            chart_type: doc.chart_type.clone(),
            status: doc.status.clone(),
            user_id: doc.user_id,
            create_time: doc.create_time,
            update_time: doc.update_time,
            is_delete: doc.is_delete,
            ..Default::default()
        }
    }
}
