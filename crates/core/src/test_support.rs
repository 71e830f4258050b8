// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Event builders shared by tests across crates.
//!
//! Payload shapes here mirror what the state machine reads from real client
//! events, reduced to the fields that matter.

use crate::event::{LogEvent, LogEventKind};
use crate::id::IdGen;
use crate::rating::ArenaId;
use chrono::{DateTime, Utc};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Deterministic sequential ID generator for replay/round-trip tests.
#[derive(Clone, Default)]
pub struct SeqIdGen {
    counter: Arc<AtomicU64>,
}

impl SeqIdGen {
    pub fn new() -> Self {
        Self::default()
    }
}

impl IdGen for SeqIdGen {
    fn next(&self) -> String {
        format!("{:04}", self.counter.fetch_add(1, Ordering::SeqCst) + 1)
    }
}

/// Build a [`LogEvent`] with an explicit sequence and payload.
pub fn log_event(kind: LogEventKind, arrival_seq: u64, payload: Value) -> LogEvent {
    log_event_at(kind, arrival_seq, payload, Utc::now())
}

/// Build a [`LogEvent`] with a fixed timestamp (for clock-driven tests).
pub fn log_event_at(
    kind: LogEventKind,
    arrival_seq: u64,
    payload: Value,
    timestamp: DateTime<Utc>,
) -> LogEvent {
    LogEvent {
        kind,
        timestamp,
        arrival_seq,
        payload,
        source_offset: 0,
    }
}

/// A `DraftPack` event for the given position.
pub fn pack_event(
    seq: u64,
    set: &str,
    event_name: &str,
    pack: u32,
    pick: u32,
    cards: &[ArenaId],
) -> LogEvent {
    log_event(
        LogEventKind::DraftPack,
        seq,
        json!({
            "SetCode": set,
            "DraftType": "QuickDraft",
            "EventName": event_name,
            "PackNumber": pack,
            "PickNumber": pick,
            "PackCards": cards,
        }),
    )
}

/// A `DraftMakePick` event for the given position.
pub fn pick_event(seq: u64, set: &str, event_name: &str, pack: u32, pick: u32, card: ArenaId) -> LogEvent {
    log_event(
        LogEventKind::DraftMakePick,
        seq,
        json!({
            "SetCode": set,
            "DraftType": "QuickDraft",
            "EventName": event_name,
            "PackNumber": pack,
            "PickNumber": pick,
            "CardId": card,
        }),
    )
}

/// A `DraftComplete` event with a final record.
pub fn draft_complete_event(seq: u64, wins: u32, losses: u32) -> LogEvent {
    log_event(
        LogEventKind::DraftComplete,
        seq,
        json!({ "Wins": wins, "Losses": losses }),
    )
}

/// A `MatchBegin` event for the given match id.
pub fn match_begin_event(seq: u64, match_id: &str) -> LogEvent {
    log_event(
        LogEventKind::MatchBegin,
        seq,
        json!({
            "MatchId": match_id,
            "EventId": "evt-1",
            "EventName": "Ladder",
            "Format": "Standard",
            "OpponentId": "opp-1",
        }),
    )
}

/// A `GameResult` event for the given game.
pub fn game_result_event(seq: u64, match_id: &str, game: u32, result: &str) -> LogEvent {
    log_event(
        LogEventKind::GameResult,
        seq,
        json!({
            "MatchId": match_id,
            "GameNumber": game,
            "Result": result,
            "DurationSeconds": 240,
            "Reason": "Game.Concede",
        }),
    )
}

/// A `MatchComplete` event for the given match.
pub fn match_complete_event(seq: u64, match_id: &str) -> LogEvent {
    log_event(
        LogEventKind::MatchComplete,
        seq,
        json!({
            "MatchId": match_id,
            "Reason": "Match.Complete",
            "DurationSeconds": 600,
        }),
    )
}
