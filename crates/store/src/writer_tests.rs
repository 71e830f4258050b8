// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use mtgc_core::test_support::log_event;
use mtgc_core::{LogEventKind, MatchId, MatchRecord, MatchResult};
use serde_json::json;

#[tokio::test]
async fn queued_events_are_committed() {
    let store = Store::in_memory().await.unwrap();
    let writer = spawn_writer(store.clone(), Duration::from_millis(10), 64);
    let tx = writer.sender();

    for seq in 1..=5 {
        tx.send(WriteOp::Event(log_event(
            LogEventKind::GameResult,
            seq,
            json!({"seq": seq}),
        )))
        .await
        .unwrap();
    }

    writer.shutdown(Duration::from_secs(2)).await;
    assert_eq!(store.event_count().await.unwrap(), 5);
}

#[tokio::test]
async fn burst_within_window_lands_in_one_pass() {
    let store = Store::in_memory().await.unwrap();
    let writer = spawn_writer(store.clone(), Duration::from_millis(50), 256);
    let tx = writer.sender();

    // Mixed op burst: event + match + offset.
    tx.send(WriteOp::Event(log_event(
        LogEventKind::MatchBegin,
        1,
        json!({"MatchId": "m-1"}),
    )))
    .await
    .unwrap();

    let mut record = MatchRecord::begin(
        MatchId::new("m-1"),
        "evt".to_string(),
        "Ladder".to_string(),
        "Standard".to_string(),
        chrono::Utc::now(),
    );
    record.player_wins = 2;
    record.result = MatchResult::Win;
    tx.send(WriteOp::UpsertMatch {
        record,
        games: Vec::new(),
    })
    .await
    .unwrap();

    tx.send(WriteOp::SaveOffset(OffsetRow {
        path: "/tmp/Player.log".to_string(),
        identity: "1:1".to_string(),
        offset: 1000,
        last_read_at: chrono::Utc::now(),
    }))
    .await
    .unwrap();

    writer.shutdown(Duration::from_secs(2)).await;

    assert_eq!(store.event_count().await.unwrap(), 1);
    assert_eq!(store.match_count().await.unwrap(), 1);
    assert_eq!(
        store
            .get_offset("/tmp/Player.log")
            .await
            .unwrap()
            .unwrap()
            .offset,
        1000
    );
}

#[tokio::test]
async fn duplicate_events_in_one_batch_commit_once() {
    let store = Store::in_memory().await.unwrap();
    let writer = spawn_writer(store.clone(), Duration::from_millis(20), 64);
    let tx = writer.sender();

    let event = log_event(LogEventKind::DraftPack, 1, json!({"PackNumber": 1}));
    tx.send(WriteOp::Event(event.clone())).await.unwrap();
    tx.send(WriteOp::Event(event)).await.unwrap();

    writer.shutdown(Duration::from_secs(2)).await;
    assert_eq!(store.event_count().await.unwrap(), 1);
}

#[tokio::test]
async fn shutdown_drains_pending_ops() {
    let store = Store::in_memory().await.unwrap();
    // Long window: shutdown must still flush what is queued.
    let writer = spawn_writer(store.clone(), Duration::from_millis(200), 64);
    let tx = writer.sender();

    tx.send(WriteOp::Event(log_event(
        LogEventKind::RankUpdate,
        1,
        json!({}),
    )))
    .await
    .unwrap();
    drop(tx);

    writer.shutdown(Duration::from_secs(2)).await;
    assert_eq!(store.event_count().await.unwrap(), 1);
}
