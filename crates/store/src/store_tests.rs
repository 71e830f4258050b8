// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mtgc_core::test_support::log_event;
use mtgc_core::{LogEventKind, MatchId, MatchRecord};
use serde_json::json;
use tempfile::TempDir;

#[tokio::test]
async fn file_store_persists_across_reopen() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("companion.db");

    {
        let store = Store::open(&db_path).await.unwrap();
        store
            .record_event(&log_event(LogEventKind::DraftPack, 1, json!({"n": 1})))
            .await
            .unwrap();
        store.close().await;
    }

    let store = Store::open(&db_path).await.unwrap();
    assert_eq!(store.event_count().await.unwrap(), 1);
    assert_eq!(
        store.current_version().await.unwrap(),
        migrate::latest_version()
    );
}

#[tokio::test]
async fn dirty_schema_refuses_open() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("companion.db");

    {
        let store = Store::open(&db_path).await.unwrap();
        sqlx::query("UPDATE schema_version SET dirty = 1")
            .execute(store.pool())
            .await
            .unwrap();
        store.close().await;
    }

    let result = Store::open(&db_path).await;
    assert!(matches!(result, Err(StoreError::MigrationDirty { .. })));
}

#[tokio::test]
async fn clear_session_data_preserves_events_and_ratings() {
    let store = Store::in_memory().await.unwrap();

    store
        .record_event(&log_event(LogEventKind::MatchBegin, 1, json!({})))
        .await
        .unwrap();
    store
        .upsert_match(
            &MatchRecord::begin(
                MatchId::new("m-1"),
                "evt".to_string(),
                "Ladder".to_string(),
                "Standard".to_string(),
                chrono::Utc::now(),
            ),
            &[],
        )
        .await
        .unwrap();

    store.clear_session_data().await.unwrap();

    assert_eq!(store.match_count().await.unwrap(), 0);
    assert_eq!(store.event_count().await.unwrap(), 1);
}
