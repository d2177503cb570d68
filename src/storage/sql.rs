// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! SQL record store (authoritative side).
//!
//! Reads the relational tables owned by the CRUD backend. This crate never
//! writes to them. Each entity maps one table with camelCase columns:
//!
//! ```sql
//! CREATE TABLE post (
//!   id         BIGINT PRIMARY KEY,
//!   title      VARCHAR(512),
//!   content    TEXT,
//!   tags       VARCHAR(1024),   -- JSON array in a string
//!   thumbNum   INT,
//!   favourNum  INT,
//!   userId     BIGINT,
//!   createTime BIGINT,          -- epoch millis
//!   updateTime BIGINT,
//!   isDelete   TINYINT DEFAULT 0
//! )
//! ```
//!
//! ## sqlx Any Driver Quirks
//!
//! The `Any` driver reports MySQL TEXT columns as BLOB, so text is read as
//! `String` first and `Vec<u8>` second. Integers are always read as `i64`.

use std::marker::PhantomData;
use std::sync::Once;
use std::time::Duration;

use async_trait::async_trait;
use sqlx::any::{AnyPoolOptions, AnyRow};
use sqlx::{AnyPool, Row};
use tracing::info;

use crate::model::{Chart, Entity, Post, User};
use crate::resilience::retry::{retry, RetryConfig};
use super::traits::{RecordStore, StorageError};

// SQLx `Any` driver requires runtime installation
static INSTALL_DRIVERS: Once = Once::new();

fn install_drivers() {
    INSTALL_DRIVERS.call_once(|| {
        sqlx::any::install_default_drivers();
    });
}

/// Open a pool with startup-mode retry (fails fast if config is wrong).
pub async fn connect_pool(connection_string: &str) -> Result<AnyPool, StorageError> {
    install_drivers();

    let pool = retry("sql_connect", &RetryConfig::startup(), || async {
        AnyPoolOptions::new()
            .max_connections(20)
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .connect(connection_string)
            .await
            .map_err(|e| StorageError::Connection(e.to_string()))
    })
    .await?;

    if connection_string.starts_with("sqlite:") {
        // Readers must not block the CRUD backend's writers
        sqlx::query("PRAGMA journal_mode = WAL")
            .execute(&pool)
            .await
            .map_err(|e| StorageError::Backend(format!("Failed to enable WAL mode: {}", e)))?;
    }

    info!("Connected to authoritative SQL store");
    Ok(pool)
}

/// Row mapping for an entity table.
pub trait SqlRecord: Entity {
    const TABLE: &'static str;
    /// Select list, in table column names
    const COLUMNS: &'static str;

    fn from_row(row: &AnyRow) -> Result<Self, StorageError>;
}

fn text(row: &AnyRow, column: &str) -> String {
    row.try_get::<String, _>(column)
        .ok()
        .or_else(|| {
            row.try_get::<Vec<u8>, _>(column)
                .ok()
                .and_then(|bytes| String::from_utf8(bytes).ok())
        })
        .unwrap_or_default()
}

fn long(row: &AnyRow, column: &str) -> i64 {
    row.try_get::<i64, _>(column).unwrap_or(0)
}

fn row_id(row: &AnyRow, table: &str) -> Result<i64, StorageError> {
    row.try_get::<i64, _>("id").map_err(|e| StorageError::Codec {
        context: table.to_string(),
        message: e.to_string(),
    })
}

impl SqlRecord for Post {
    const TABLE: &'static str = "post";
    const COLUMNS: &'static str =
        "id, title, content, tags, thumbNum, favourNum, userId, createTime, updateTime, isDelete";

    fn from_row(row: &AnyRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: row_id(row, Self::TABLE)?,
            title: text(row, "title"),
            content: text(row, "content"),
            tags: text(row, "tags"),
            thumb_num: long(row, "thumbNum"),
            favour_num: long(row, "favourNum"),
            user_id: long(row, "userId"),
            create_time: long(row, "createTime"),
            update_time: long(row, "updateTime"),
            is_delete: long(row, "isDelete") as i32,
        })
    }
}

impl SqlRecord for User {
    const TABLE: &'static str = "user";
    const COLUMNS: &'static str = "id, userAccount, userName, userAvatar, userProfile, userRole, tags, \
                                   createTime, updateTime, isDelete";

    fn from_row(row: &AnyRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: row_id(row, Self::TABLE)?,
            user_account: text(row, "userAccount"),
            user_name: text(row, "userName"),
            user_avatar: text(row, "userAvatar"),
            user_profile: text(row, "userProfile"),
            user_role: text(row, "userRole"),
            tags: text(row, "tags"),
            create_time: long(row, "createTime"),
            update_time: long(row, "updateTime"),
            is_delete: long(row, "isDelete") as i32,
        })
    }
}

impl SqlRecord for Chart {
    const TABLE: &'static str = "chart";
    const COLUMNS: &'static str = "id, name, goal, chartType, chartData, genChart, genResult, status, \
                                   execMessage, userId, createTime, updateTime, isDelete";

    fn from_row(row: &AnyRow) -> Result<Self, StorageError> {
        Ok(Self {
            id: row_id(row, Self::TABLE)?,
            name: text(row, "name"),
            goal: text(row, "goal"),
            chart_type: text(row, "chartType"),
            chart_data: text(row, "chartData"),
            gen_chart: text(row, "genChart"),
            gen_result: text(row, "genResult"),
            status: text(row, "status"),
            exec_message: text(row, "execMessage"),
            user_id: long(row, "userId"),
            create_time: long(row, "createTime"),
            update_time: long(row, "updateTime"),
            is_delete: long(row, "isDelete") as i32,
        })
    }
}

/// Read-only view of one entity table.
pub struct SqlRecordStore<R> {
    pool: AnyPool,
    _marker: PhantomData<fn() -> R>,
}

impl<R: SqlRecord> SqlRecordStore<R> {
    pub fn new(pool: AnyPool) -> Self {
        Self { pool, _marker: PhantomData }
    }

    fn select(filter: &str) -> String {
        format!("SELECT {} FROM `{}` WHERE {}", R::COLUMNS, R::TABLE, filter)
    }

    fn decode(rows: Vec<AnyRow>) -> Result<Vec<R>, StorageError> {
        rows.iter().map(R::from_row).collect()
    }
}

#[async_trait]
impl<R: SqlRecord> RecordStore<R> for SqlRecordStore<R> {
    async fn get_by_id(&self, id: i64) -> Result<Option<R>, StorageError> {
        let row = sqlx::query(&Self::select("id = ? AND isDelete = 0"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;

        row.as_ref().map(R::from_row).transpose()
    }

    async fn get_by_ids(&self, ids: &[i64]) -> Result<Vec<R>, StorageError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let placeholders = vec!["?"; ids.len()].join(", ");
        let sql = Self::select(&format!("id IN ({}) AND isDelete = 0", placeholders));

        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(*id);
        }

        let rows = query
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Self::decode(rows)
    }

    async fn list_all(&self) -> Result<Vec<R>, StorageError> {
        let rows = sqlx::query(&Self::select("isDelete = 0 ORDER BY id"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Self::decode(rows)
    }

    async fn list_updated_since(&self, since_millis: i64) -> Result<Vec<R>, StorageError> {
        let rows = sqlx::query(&Self::select("updateTime >= ? ORDER BY id"))
            .bind(since_millis)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StorageError::Backend(e.to_string()))?;
        Self::decode(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn temp_db_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("index_sync_sql_test_{}.db", name))
    }

    /// Clean up SQLite database and its WAL files
    fn cleanup_db(path: &PathBuf) {
        let _ = std::fs::remove_file(path);
        let _ = std::fs::remove_file(format!("{}-wal", path.display()));
        let _ = std::fs::remove_file(format!("{}-shm", path.display()));
    }

    async fn post_table(name: &str) -> (AnyPool, PathBuf) {
        let db_path = temp_db_path(name);
        cleanup_db(&db_path);
        let url = format!("sqlite://{}?mode=rwc", db_path.display());
        let pool = connect_pool(&url).await.unwrap();

        sqlx::query(
            "CREATE TABLE post (id INTEGER PRIMARY KEY, title TEXT, content TEXT, tags TEXT, \
             thumbNum INTEGER, favourNum INTEGER, userId INTEGER, createTime INTEGER, \
             updateTime INTEGER, isDelete INTEGER DEFAULT 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (id, title, update_time, is_delete) in
            [(1_i64, "alpha", 100_i64, 0_i64), (2, "beta", 200, 0), (3, "gamma", 300, 1)]
        {
            sqlx::query(
                "INSERT INTO post (id, title, content, tags, thumbNum, favourNum, userId, createTime, updateTime, isDelete) \
                 VALUES (?, ?, '', '[\"rust\"]', 0, 0, 7, 0, ?, ?)",
            )
            .bind(id)
            .bind(title)
            .bind(update_time)
            .bind(is_delete)
            .execute(&pool)
            .await
            .unwrap();
        }
        (pool, db_path)
    }

    #[tokio::test]
    async fn test_get_by_id_hides_soft_deleted() {
        let (pool, path) = post_table("get_by_id").await;
        let store: SqlRecordStore<Post> = SqlRecordStore::new(pool);

        let post = store.get_by_id(1).await.unwrap().unwrap();
        assert_eq!(post.title, "alpha");
        assert_eq!(post.tags, r#"["rust"]"#);
        assert_eq!(post.user_id, 7);
        assert!(store.get_by_id(3).await.unwrap().is_none());
        assert!(store.get_by_id(99).await.unwrap().is_none());

        cleanup_db(&path);
    }

    #[tokio::test]
    async fn test_get_by_ids() {
        let (pool, path) = post_table("get_by_ids").await;
        let store: SqlRecordStore<Post> = SqlRecordStore::new(pool);

        let mut ids: Vec<i64> = store.get_by_ids(&[3, 2, 1, 42]).await.unwrap().iter().map(|p| p.id).collect();
        ids.sort_unstable();
        assert_eq!(ids, vec![1, 2]);
        assert!(store.get_by_ids(&[]).await.unwrap().is_empty());

        cleanup_db(&path);
    }

    #[tokio::test]
    async fn test_listing() {
        let (pool, path) = post_table("listing").await;
        let store: SqlRecordStore<Post> = SqlRecordStore::new(pool);

        assert_eq!(store.list_all().await.unwrap().len(), 2);

        let changed = store.list_updated_since(200).await.unwrap();
        let ids: Vec<i64> = changed.iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![2, 3]);
        assert!(changed[1].is_deleted());

        cleanup_db(&path);
    }
}
