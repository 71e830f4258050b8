// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Raw event persistence.

use crate::{Store, StoreError};
use mtgc_core::{LogEvent, LogEventKind};
use sqlx::sqlite::SqliteConnection;
use sqlx::Row;

impl Store {
    /// Record a raw event. Idempotent on `(event_type, arrival_seq)`;
    /// returns whether a row was inserted.
    pub async fn record_event(&self, event: &LogEvent) -> Result<bool, StoreError> {
        let mut conn = self.pool().acquire().await?;
        exec_record_event(&mut conn, event).await
    }

    pub async fn event_count(&self) -> Result<i64, StoreError> {
        let row = sqlx::query("SELECT COUNT(*) AS n FROM events")
            .fetch_one(self.pool())
            .await?;
        Ok(row.try_get("n")?)
    }

    /// Events of one type in arrival order, for debugging and tests.
    pub async fn events_of_type(&self, event_type: &str) -> Result<Vec<LogEvent>, StoreError> {
        let rows = sqlx::query(
            "SELECT event_type, arrival_seq, timestamp, payload, source_offset
             FROM events WHERE event_type = ? ORDER BY arrival_seq",
        )
        .bind(event_type)
        .fetch_all(self.pool())
        .await?;

        rows.into_iter()
            .map(|row| {
                let event_type: String = row.try_get("event_type")?;
                let payload: String = row.try_get("payload")?;
                Ok(LogEvent {
                    kind: LogEventKind::from_marker(&event_type),
                    timestamp: row.try_get("timestamp")?,
                    arrival_seq: row.try_get::<i64, _>("arrival_seq")? as u64,
                    payload: serde_json::from_str(&payload)
                        .map_err(|e| StoreError::Decode(e.to_string()))?,
                    source_offset: row.try_get::<i64, _>("source_offset")? as u64,
                })
            })
            .collect()
    }
}

/// Executor-level insert used by both the one-shot path and the batching
/// writer task.
pub(crate) async fn exec_record_event(
    conn: &mut SqliteConnection,
    event: &LogEvent,
) -> Result<bool, StoreError> {
    let result = sqlx::query(
        "INSERT OR IGNORE INTO events
             (event_type, arrival_seq, timestamp, payload, source_offset)
         VALUES (?, ?, ?, ?, ?)",
    )
    .bind(event.kind.name())
    .bind(event.arrival_seq as i64)
    .bind(event.timestamp)
    .bind(event.payload.to_string())
    .bind(event.source_offset as i64)
    .execute(conn)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
