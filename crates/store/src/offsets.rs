// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Tailer offset checkpoints.
//!
//! Stored with primitive columns so the store does not depend on the
//! tailer crate; the daemon adapts these rows to the tailer's sink trait.

use crate::{Store, StoreError};
use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

/// Raw offset row for one observed path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OffsetRow {
    pub path: String,
    pub identity: String,
    pub offset: i64,
    pub last_read_at: DateTime<Utc>,
}

impl Store {
    pub async fn get_offset(&self, path: &str) -> Result<Option<OffsetRow>, StoreError> {
        let row = sqlx::query(
            "SELECT path, identity, offset, last_read_at FROM log_offsets WHERE path = ?",
        )
        .bind(path)
        .fetch_optional(self.pool())
        .await?;

        row.map(|row| {
            Ok(OffsetRow {
                path: row.try_get("path")?,
                identity: row.try_get("identity")?,
                offset: row.try_get("offset")?,
                last_read_at: row.try_get("last_read_at")?,
            })
        })
        .transpose()
    }

    pub async fn set_offset(&self, row: &OffsetRow) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        exec_set_offset(&mut conn, row).await
    }
}

pub(crate) async fn exec_set_offset(
    conn: &mut SqliteConnection,
    row: &OffsetRow,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR REPLACE INTO log_offsets (path, identity, offset, last_read_at)
         VALUES (?, ?, ?, ?)",
    )
    .bind(&row.path)
    .bind(&row.identity)
    .bind(row.offset)
    .bind(row.last_read_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[cfg(test)]
#[path = "offsets_tests.rs"]
mod tests;
