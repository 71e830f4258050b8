// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft session, pack, and pick persistence.

use crate::{Store, StoreError};
use chrono::{DateTime, Utc};
use mtgc_core::{DraftSession, DraftSessionId, DraftStatus, Grade, PackRow, PickRow};
use sqlx::sqlite::{SqliteConnection, SqliteRow};
use sqlx::Row;

impl Store {
    /// Insert or update a session row.
    pub async fn upsert_draft_session(&self, session: &DraftSession) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        exec_upsert_session(&mut conn, session).await
    }

    /// Insert or update the pack row at the session position.
    pub async fn upsert_draft_pack(&self, pack: &PackRow) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        exec_upsert_pack(&mut conn, pack).await
    }

    /// Insert or update the pick row at the session position.
    pub async fn upsert_draft_pick(&self, pick: &PickRow) -> Result<(), StoreError> {
        let mut conn = self.pool().acquire().await?;
        exec_upsert_pick(&mut conn, pick).await
    }

    pub async fn get_draft_session(
        &self,
        session_id: &DraftSessionId,
    ) -> Result<Option<DraftSession>, StoreError> {
        let row = sqlx::query("SELECT * FROM draft_sessions WHERE session_id = ?")
            .bind(session_id.as_str())
            .fetch_optional(self.pool())
            .await?;
        row.map(session_from_row).transpose()
    }

    /// Sessions whose start time falls in `[from, to)`, oldest first.
    pub async fn draft_sessions_in_range(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<Vec<DraftSession>, StoreError> {
        let rows = sqlx::query(
            "SELECT * FROM draft_sessions
             WHERE start_time >= ? AND start_time < ? ORDER BY start_time",
        )
        .bind(from)
        .bind(to)
        .fetch_all(self.pool())
        .await?;
        rows.into_iter().map(session_from_row).collect()
    }

    pub async fn packs_for_session(
        &self,
        session_id: &DraftSessionId,
    ) -> Result<Vec<PackRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT session_id, pack_number, pick_number, card_ids
             FROM draft_packs WHERE session_id = ?
             ORDER BY pack_number, pick_number",
        )
        .bind(session_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let card_ids: String = row.try_get("card_ids")?;
                Ok(PackRow {
                    session_id: DraftSessionId::new(row.try_get::<String, _>("session_id")?),
                    pack_number: row.try_get::<i64, _>("pack_number")? as u32,
                    pick_number: row.try_get::<i64, _>("pick_number")? as u32,
                    card_ids: serde_json::from_str(&card_ids)
                        .map_err(|e| StoreError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }

    pub async fn picks_for_session(
        &self,
        session_id: &DraftSessionId,
    ) -> Result<Vec<PickRow>, StoreError> {
        let rows = sqlx::query(
            "SELECT session_id, pack_number, pick_number, card_id, timestamp, grade, alternatives
             FROM draft_picks WHERE session_id = ?
             ORDER BY pack_number, pick_number",
        )
        .bind(session_id.as_str())
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let grade: Option<String> = row.try_get("grade")?;
                let alternatives: Option<String> = row.try_get("alternatives")?;
                Ok(PickRow {
                    session_id: DraftSessionId::new(row.try_get::<String, _>("session_id")?),
                    pack_number: row.try_get::<i64, _>("pack_number")? as u32,
                    pick_number: row.try_get::<i64, _>("pick_number")? as u32,
                    card_id: row.try_get("card_id")?,
                    timestamp: row.try_get("timestamp")?,
                    grade: grade.as_deref().and_then(Grade::from_str),
                    alternatives: alternatives
                        .map(|a| serde_json::from_str(&a))
                        .transpose()
                        .map_err(|e| StoreError::Decode(e.to_string()))?,
                })
            })
            .collect()
    }
}

pub(crate) async fn exec_upsert_session(
    conn: &mut SqliteConnection,
    session: &DraftSession,
) -> Result<(), StoreError> {
    sqlx::query(
        "INSERT OR REPLACE INTO draft_sessions
             (session_id, set_code, draft_type, event_name, start_time, end_time,
              status, overall_grade, overall_score, predicted_win_rate, wins, losses)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(session.session_id.as_str())
    .bind(&session.set_code)
    .bind(&session.draft_type)
    .bind(&session.event_name)
    .bind(session.start_time)
    .bind(session.end_time)
    .bind(session.status.as_str())
    .bind(session.overall_grade.map(|g| g.as_str()))
    .bind(session.overall_score)
    .bind(session.predicted_win_rate)
    .bind(session.wins.map(|w| w as i64))
    .bind(session.losses.map(|l| l as i64))
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn exec_upsert_pack(
    conn: &mut SqliteConnection,
    pack: &PackRow,
) -> Result<(), StoreError> {
    let card_ids =
        serde_json::to_string(&pack.card_ids).map_err(|e| StoreError::Decode(e.to_string()))?;
    sqlx::query(
        "INSERT OR REPLACE INTO draft_packs (session_id, pack_number, pick_number, card_ids)
         VALUES (?, ?, ?, ?)",
    )
    .bind(pack.session_id.as_str())
    .bind(pack.pack_number as i64)
    .bind(pack.pick_number as i64)
    .bind(card_ids)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn exec_upsert_pick(
    conn: &mut SqliteConnection,
    pick: &PickRow,
) -> Result<(), StoreError> {
    let alternatives = pick
        .alternatives
        .as_ref()
        .map(serde_json::to_string)
        .transpose()
        .map_err(|e| StoreError::Decode(e.to_string()))?;
    sqlx::query(
        "INSERT OR REPLACE INTO draft_picks
             (session_id, pack_number, pick_number, card_id, timestamp, grade, alternatives)
         VALUES (?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(pick.session_id.as_str())
    .bind(pick.pack_number as i64)
    .bind(pick.pick_number as i64)
    .bind(pick.card_id)
    .bind(pick.timestamp)
    .bind(pick.grade.map(|g| g.as_str()))
    .bind(alternatives)
    .execute(conn)
    .await?;
    Ok(())
}

fn session_from_row(row: SqliteRow) -> Result<DraftSession, StoreError> {
    let grade: Option<String> = row.try_get("overall_grade")?;
    Ok(DraftSession {
        session_id: DraftSessionId::new(row.try_get::<String, _>("session_id")?),
        set_code: row.try_get("set_code")?,
        draft_type: row.try_get("draft_type")?,
        event_name: row.try_get("event_name")?,
        start_time: row.try_get("start_time")?,
        end_time: row.try_get("end_time")?,
        status: DraftStatus::from_str(&row.try_get::<String, _>("status")?),
        overall_grade: grade.as_deref().and_then(Grade::from_str),
        overall_score: row.try_get("overall_score")?,
        predicted_win_rate: row.try_get("predicted_win_rate")?,
        wins: row.try_get::<Option<i64>, _>("wins")?.map(|w| w as u32),
        losses: row.try_get::<Option<i64>, _>("losses")?.map(|l| l as u32),
    })
}

#[cfg(test)]
#[path = "drafts_tests.rs"]
mod tests;
