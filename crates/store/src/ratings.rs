// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Card rating persistence.

use crate::{Store, StoreError};
use mtgc_core::{ArenaId, CardRating};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

impl Store {
    /// Transactional bulk replace of one `(set, format)` scope.
    pub async fn replace_ratings(
        &self,
        set_code: &str,
        format: &str,
        rows: &[CardRating],
    ) -> Result<(), StoreError> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("DELETE FROM card_ratings WHERE set_code = ? AND format = ?")
            .bind(set_code)
            .bind(format)
            .execute(&mut *tx)
            .await?;

        for rating in rows {
            sqlx::query(
                "INSERT OR REPLACE INTO card_ratings
                     (set_code, format, arena_id, card_name, gihwr, ohwr, alsa, ata,
                      games_in_hand, games_played, num_decks, cached_at)
                 VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(set_code)
            .bind(format)
            .bind(rating.arena_id)
            .bind(&rating.card_name)
            .bind(rating.gihwr)
            .bind(rating.ohwr)
            .bind(rating.alsa)
            .bind(rating.ata)
            .bind(rating.games_in_hand)
            .bind(rating.games_played)
            .bind(rating.num_decks)
            .bind(rating.cached_at)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    pub async fn get_rating(
        &self,
        set_code: &str,
        format: &str,
        arena_id: ArenaId,
    ) -> Result<Option<CardRating>, StoreError> {
        let row = sqlx::query(
            "SELECT * FROM card_ratings WHERE set_code = ? AND format = ? AND arena_id = ?",
        )
        .bind(set_code)
        .bind(format)
        .bind(arena_id)
        .fetch_optional(self.pool())
        .await?;
        row.map(rating_from_row).transpose()
    }

    /// All ratings for one scope, for warming the cache.
    pub async fn ratings_for_scope(
        &self,
        set_code: &str,
        format: &str,
    ) -> Result<Vec<CardRating>, StoreError> {
        let rows = sqlx::query("SELECT * FROM card_ratings WHERE set_code = ? AND format = ?")
            .bind(set_code)
            .bind(format)
            .fetch_all(self.pool())
            .await?;
        rows.into_iter().map(rating_from_row).collect()
    }
}

fn rating_from_row(row: SqliteRow) -> Result<CardRating, StoreError> {
    Ok(CardRating {
        set_code: row.try_get("set_code")?,
        format: row.try_get("format")?,
        arena_id: row.try_get("arena_id")?,
        card_name: row.try_get("card_name")?,
        gihwr: row.try_get("gihwr")?,
        ohwr: row.try_get("ohwr")?,
        alsa: row.try_get("alsa")?,
        ata: row.try_get("ata")?,
        games_in_hand: row.try_get("games_in_hand")?,
        games_played: row.try_get("games_played")?,
        num_decks: row.try_get("num_decks")?,
        cached_at: row.try_get("cached_at")?,
    })
}

#[cfg(test)]
#[path = "ratings_tests.rs"]
mod tests;
