// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Versioned schema migrations with an explicit dirty flag.
//!
//! `schema_version` holds a single `(version, dirty)` row. The dirty flag
//! is set before a migration runs and cleared after it commits; a crash in
//! between leaves it set, and the store refuses normal operation until an
//! explicit `force_version` acknowledges manual recovery.

use crate::{Store, StoreError};
use sqlx::Row;

/// One reversible schema step.
pub struct Migration {
    pub version: i64,
    pub name: &'static str,
    pub up: &'static str,
    pub down: &'static str,
}

/// Ordered registry of every schema version.
pub fn registry() -> &'static [Migration] {
    &[
        Migration {
            version: 1,
            name: "events_and_offsets",
            up: "
                CREATE TABLE events (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    event_type TEXT NOT NULL,
                    arrival_seq INTEGER NOT NULL,
                    timestamp TEXT NOT NULL,
                    payload TEXT NOT NULL,
                    source_offset INTEGER NOT NULL DEFAULT 0,
                    UNIQUE (event_type, arrival_seq)
                );
                CREATE INDEX idx_events_type_time ON events (event_type, timestamp);
                CREATE TABLE log_offsets (
                    path TEXT PRIMARY KEY,
                    identity TEXT NOT NULL,
                    offset INTEGER NOT NULL,
                    last_read_at TEXT NOT NULL
                );
            ",
            down: "
                DROP TABLE log_offsets;
                DROP TABLE events;
            ",
        },
        Migration {
            version: 2,
            name: "matches_and_games",
            up: "
                CREATE TABLE matches (
                    match_id TEXT PRIMARY KEY,
                    event_id TEXT NOT NULL,
                    event_name TEXT NOT NULL,
                    format TEXT NOT NULL,
                    timestamp TEXT NOT NULL,
                    player_wins INTEGER NOT NULL DEFAULT 0,
                    opponent_wins INTEGER NOT NULL DEFAULT 0,
                    result TEXT NOT NULL DEFAULT 'unknown',
                    result_reason TEXT NOT NULL DEFAULT '',
                    duration_s INTEGER,
                    deck_id TEXT,
                    opponent_id TEXT,
                    rank_before TEXT,
                    rank_after TEXT
                );
                CREATE INDEX idx_matches_time ON matches (timestamp);
                CREATE TABLE games (
                    match_id TEXT NOT NULL REFERENCES matches (match_id) ON DELETE CASCADE,
                    game_number INTEGER NOT NULL,
                    result TEXT NOT NULL,
                    duration_s INTEGER,
                    result_reason TEXT NOT NULL DEFAULT '',
                    PRIMARY KEY (match_id, game_number)
                );
            ",
            down: "
                DROP TABLE games;
                DROP TABLE matches;
            ",
        },
        Migration {
            version: 3,
            name: "draft_sessions",
            up: "
                CREATE TABLE draft_sessions (
                    session_id TEXT PRIMARY KEY,
                    set_code TEXT NOT NULL,
                    draft_type TEXT NOT NULL,
                    event_name TEXT NOT NULL,
                    start_time TEXT NOT NULL,
                    end_time TEXT,
                    status TEXT NOT NULL DEFAULT 'active',
                    overall_grade TEXT,
                    overall_score REAL,
                    predicted_win_rate REAL,
                    wins INTEGER,
                    losses INTEGER
                );
                CREATE INDEX idx_draft_sessions_time ON draft_sessions (start_time);
                CREATE TABLE draft_packs (
                    session_id TEXT NOT NULL REFERENCES draft_sessions (session_id) ON DELETE CASCADE,
                    pack_number INTEGER NOT NULL,
                    pick_number INTEGER NOT NULL,
                    card_ids TEXT NOT NULL,
                    PRIMARY KEY (session_id, pack_number, pick_number)
                );
                CREATE TABLE draft_picks (
                    session_id TEXT NOT NULL REFERENCES draft_sessions (session_id) ON DELETE CASCADE,
                    pack_number INTEGER NOT NULL,
                    pick_number INTEGER NOT NULL,
                    card_id INTEGER NOT NULL,
                    timestamp TEXT NOT NULL,
                    grade TEXT,
                    alternatives TEXT,
                    PRIMARY KEY (session_id, pack_number, pick_number)
                );
            ",
            down: "
                DROP TABLE draft_picks;
                DROP TABLE draft_packs;
                DROP TABLE draft_sessions;
            ",
        },
        Migration {
            version: 4,
            name: "card_ratings",
            up: "
                CREATE TABLE card_ratings (
                    set_code TEXT NOT NULL,
                    format TEXT NOT NULL,
                    arena_id INTEGER NOT NULL,
                    card_name TEXT NOT NULL DEFAULT '',
                    gihwr REAL NOT NULL DEFAULT 0,
                    ohwr REAL NOT NULL DEFAULT 0,
                    alsa REAL NOT NULL DEFAULT 0,
                    ata REAL NOT NULL DEFAULT 0,
                    games_in_hand INTEGER NOT NULL DEFAULT 0,
                    games_played INTEGER NOT NULL DEFAULT 0,
                    num_decks INTEGER NOT NULL DEFAULT 0,
                    cached_at TEXT NOT NULL,
                    PRIMARY KEY (set_code, format, arena_id)
                );
            ",
            down: "
                DROP TABLE card_ratings;
            ",
        },
    ]
}

pub fn latest_version() -> i64 {
    registry().last().map(|m| m.version).unwrap_or(0)
}

impl Store {
    pub(crate) async fn ensure_version_table(&self) -> Result<(), StoreError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER NOT NULL,
                dirty INTEGER NOT NULL DEFAULT 0
            )",
        )
        .execute(self.pool())
        .await?;

        let count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM schema_version")
            .fetch_one(self.pool())
            .await?
            .try_get("n")?;
        if count == 0 {
            sqlx::query("INSERT INTO schema_version (version, dirty) VALUES (0, 0)")
                .execute(self.pool())
                .await?;
        }
        Ok(())
    }

    /// Current schema version and dirty flag.
    pub async fn schema_state(&self) -> Result<(i64, bool), StoreError> {
        let row = sqlx::query("SELECT version, dirty FROM schema_version LIMIT 1")
            .fetch_one(self.pool())
            .await?;
        let version: i64 = row.try_get("version")?;
        let dirty: i64 = row.try_get("dirty")?;
        Ok((version, dirty != 0))
    }

    pub async fn current_version(&self) -> Result<i64, StoreError> {
        Ok(self.schema_state().await?.0)
    }

    pub(crate) async fn refuse_if_dirty(&self) -> Result<(), StoreError> {
        let (version, dirty) = self.schema_state().await?;
        if dirty {
            return Err(StoreError::MigrationDirty { version });
        }
        Ok(())
    }

    /// Migrate up or down to `target`. Applying the current version is a
    /// no-op.
    pub async fn apply_migrations(&self, target: i64) -> Result<(), StoreError> {
        let registry = registry();
        if target != 0 && !registry.iter().any(|m| m.version == target) {
            return Err(StoreError::UnknownVersion(target));
        }
        let (mut current, dirty) = self.schema_state().await?;
        if dirty {
            return Err(StoreError::MigrationDirty { version: current });
        }

        while current < target {
            let Some(next) = registry.iter().find(|m| m.version == current + 1) else {
                return Err(StoreError::UnknownVersion(current + 1));
            };
            self.run_step(next, next.up, next.version).await?;
            current = next.version;
        }

        while current > target {
            let Some(step) = registry.iter().find(|m| m.version == current) else {
                return Err(StoreError::UnknownVersion(current));
            };
            self.run_step(step, step.down, step.version - 1).await?;
            current = step.version - 1;
        }

        Ok(())
    }

    /// Clear the dirty flag and pin the schema version after manual repair.
    pub async fn force_version(&self, version: i64) -> Result<(), StoreError> {
        sqlx::query("UPDATE schema_version SET version = ?, dirty = 0")
            .bind(version)
            .execute(self.pool())
            .await?;
        Ok(())
    }

    async fn run_step(
        &self,
        migration: &Migration,
        sql: &str,
        resulting_version: i64,
    ) -> Result<(), StoreError> {
        tracing::info!(
            version = migration.version,
            name = migration.name,
            to = resulting_version,
            "applying migration"
        );

        sqlx::query("UPDATE schema_version SET dirty = 1")
            .execute(self.pool())
            .await?;

        let mut tx = self.pool().begin().await?;
        if let Err(e) = sqlx::raw_sql(sql).execute(&mut *tx).await {
            // Roll back the DDL but leave the dirty flag set: SQLite DDL
            // is not always transactional with other statements and the
            // schema may be half-applied.
            drop(tx);
            return Err(StoreError::MigrationFailed {
                version: migration.version,
                message: e.to_string(),
            });
        }
        tx.commit().await?;

        sqlx::query("UPDATE schema_version SET version = ?, dirty = 0")
            .bind(resulting_version)
            .execute(self.pool())
            .await?;
        Ok(())
    }
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
