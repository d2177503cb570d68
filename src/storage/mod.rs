// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Storage collaborators.
//!
//! - [`traits`]: `RecordStore` (authoritative, read-only here) and `IndexStore`
//! - [`memory`]: DashMap-backed implementations of both
//! - [`sql`]: sqlx `Any` record store (MySQL, SQLite)
//! - [`elastic`]: Elasticsearch index over REST

pub mod traits;
pub mod memory;
pub mod sql;
pub mod elastic;
