// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match and game persistence.

use crate::{Store, StoreError};
use chrono::{DateTime, Utc};
use mtgc_core::{GameRecord, MatchId, MatchRecord, MatchResult};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

impl Store {
    /// Replace any existing row with the same `match_id`, games included.
    pub async fn upsert_match(
        &self,
        record: &MatchRecord,
        games: &[GameRecord],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await?;
        exec_upsert_match(&mut *tx, record, games).await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn get_match(&self, match_id: &MatchId) -> Result<Option<MatchRecord>, StoreError> {
        let row = sqlx::query("SELECT * FROM matches WHERE match_id = ?")
            .bind(match_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(match_from_row).transpose()
    }

    pub async fn games_for_match(&self, match_id: &MatchId) -> Result<Vec<GameRecord>, StoreError> {
        let rows = sqlx::query(
            "SELECT match_id, game_number, result, duration_s, result_reason
             FROM games WHERE match_id = ? ORDER BY game_number",
        )
        .bind(match_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                Ok(GameRecord {
                    match_id: MatchId::new(row.try_get::<String, _>("match_id")?),
                    game_number: row.try_get::<i64, _>("game_number")? as u32,
                    result: MatchResult::from_str(&row.try_get::<String, _>("result")?),
                    duration_s: row
                        .try_get::<Option<i64>, _>("duration_s")?
                        .map(|d| d as u32),
                    result_reason: row.try_get("result_reason")?,
                })
            })
            .collect()
    }

    /// Matches whose begin timestamp falls in `[from, to)`, oldest first.
    pub async fn matches_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<MatchRecord>, StoreError> {
        let rows =
            sqlx::query("SELECT * FROM matches WHERE timestamp >= ? AND timestamp < ? ORDER BY timestamp")
                .bind(from)
                .bind(to)
                .fetch_all(self.pool())
                .await?;
        rows.into_iter().map(match_from_row).collect()
    }

    pub async fn match_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM matches")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get("n")?)
    }
}

pub(crate) async fn exec_upsert_match(
    conn: &mut SqliteConnection,
    record: &MatchRecord,
    games: &[GameRecord],
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR REPLACE INTO matches
             (match_id, event_id, event_name, format, timestamp,
              player_wins, opponent_wins, result, result_reason,
              duration_s, deck_id, opponent_id, rank_before, rank_after)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(record.match_id.as_str())
    .bind(&record.event_id)
    .bind(&record.event_name)
    .bind(&record.format)
    .bind(record.timestamp)
    .bind(record.player_wins as i64)
    .bind(record.opponent_wins as i64)
    .bind(record.result.as_str())
    .bind(&record.result_reason)
    .bind(record.duration_s.map(|d| d as i64))
    .bind(&record.deck_id)
    .bind(&record.opponent_id)
    .bind(&record.rank_before)
    .bind(&record.rank_after)
    .execute(&mut *conn)
    .await?;

    sqlx::query("DELETE FROM games WHERE match_id = ?")
        .bind(record.match_id.as_str())
        .execute(&mut *conn)
        .await?;

    for game in games {
        sqlx::query(
            "INSERT INTO games (match_id, game_number, result, duration_s, result_reason)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(game.match_id.as_str())
        .bind(game.game_number as i64)
        .bind(game.result.as_str())
        .bind(game.duration_s.map(|d| d as i64))
        .bind(&game.result_reason)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

fn match_from_row(row: SqliteRow) -> Result<MatchRecord, StoreError> {
    Ok(MatchRecord {
        match_id: MatchId::new(row.try_get::<String, _>("match_id")?),
        event_id: row.try_get("event_id")?,
        event_name: row.try_get("event_name")?,
        format: row.try_get("format")?,
        timestamp: row.try_get("timestamp")?,
        player_wins: row.try_get::<i64, _>("player_wins")? as u32,
        opponent_wins: row.try_get::<i64, _>("opponent_wins")? as u32,
        result: MatchResult::from_str(&row.try_get::<String, _>("result")?),
        result_reason: row.try_get("result_reason")?,
        duration_s: row
            .try_get::<Option<i64>, _>("duration_s")?
            .map(|d| d as u32),
        deck_id: row.try_get("deck_id")?,
        opponent_id: row.try_get("opponent_id")?,
        rank_before: row.try_get("rank_before")?,
        rank_after: row.try_get("rank_after")?,
    })
}

#[cfg(test)]
#[path = "matches_tests.rs"]
mod tests;
