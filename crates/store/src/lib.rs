// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mtgc-store: Single-writer SQLite persistence.
//!
//! All persistent state lives here: raw events, matches, draft sessions,
//! card ratings, and tailer offsets. Writes go through transactions; the
//! [`writer`] task batches queued write intents into one transaction per
//! collect window. Schema changes are versioned migrations with an
//! explicit dirty flag.

mod drafts;
mod events;
mod matches;
pub mod migrate;
mod offsets;
mod ratings;
pub mod writer;

pub use offsets::OffsetRow;
pub use writer::{spawn_writer, WriteOp, WriterHandle};

use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use sqlx::SqlitePool;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Errors from store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    #[error("stored row failed to decode: {0}")]
    Decode(String),

    #[error("migration {version} failed: {message}")]
    MigrationFailed { version: i64, message: String },

    #[error("schema is dirty at version {version}; run force_version to recover")]
    MigrationDirty { version: i64 },

    #[error("unknown target schema version {0}")]
    UnknownVersion(i64),

    #[error("database busy after retries")]
    Busy,
}

/// Handle to the SQLite database.
///
/// Cloning shares the underlying pool. Readers and the single writer task
/// coexist through WAL mode.
#[derive(Clone)]
pub struct Store {
    pool: SqlitePool,
}

impl Store {
    /// Open (creating if missing) and migrate to the latest schema.
    ///
    /// Refuses to operate when a previous migration left the schema dirty.
    pub async fn open(path: &Path) -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .filename(path)
            .create_if_missing(true)
            .journal_mode(sqlx::sqlite::SqliteJournalMode::Wal)
            .foreign_keys(true)
            .busy_timeout(Duration::from_secs(5));

        let pool = SqlitePoolOptions::new()
            .max_connections(4)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_version_table().await?;
        store.refuse_if_dirty().await?;
        store.apply_migrations(migrate::latest_version()).await?;
        Ok(store)
    }

    /// In-memory database for tests. Single connection, since each
    /// `:memory:` connection is its own database.
    pub async fn in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::new()
            .in_memory(true)
            .foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await?;

        let store = Self { pool };
        store.ensure_version_table().await?;
        store.apply_migrations(migrate::latest_version()).await?;
        Ok(store)
    }

    pub(crate) fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Truncate session and match data ahead of a `clear_data` replay.
    /// Events, ratings, and offsets are preserved.
    pub async fn clear_session_data(&self) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        for table in [
            "games",
            "matches",
            "draft_picks",
            "draft_packs",
            "draft_sessions",
        ] {
            sqlx::query(&format!("DELETE FROM {table}"))
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await?;
        Ok(())
    }

    pub async fn close(&self) {
        self.pool.close().await;
    }
}

#[cfg(test)]
#[path = "store_tests.rs"]
mod tests;
