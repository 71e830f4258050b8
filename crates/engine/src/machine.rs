// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The session state machine: classified events in, deltas out.
//!
//! Owned by a single task; transitions are serialized by construction.
//! Field access into payloads is tolerant — a malformed payload logs and
//! produces no transition, never an error.

use crate::drafts::{DraftTracker, PickMade, PackObserved};
use crate::grader::{PickGrader, RatingSource};
use crate::matches::{GameFinished, MatchBegun, MatchTracker};
use crate::Delta;
use mtgc_core::{
    ArenaId, Clock, DraftSession, IdGen, LogEvent, LogEventKind, MatchId, MatchRecord, MatchResult,
};
use serde_json::Value;
use std::time::Duration;

/// Read-only view of live state, published over a watch channel.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MachineSnapshot {
    pub active_draft: Option<DraftSession>,
    pub active_match: Option<MatchRecord>,
}

/// Combined draft/match automaton with pick grading.
pub struct SessionMachine<C: Clock, G: IdGen, R: RatingSource> {
    drafts: DraftTracker<C, G>,
    matches: MatchTracker<C>,
    grader: PickGrader<R>,
}

impl<C: Clock, G: IdGen, R: RatingSource> SessionMachine<C, G, R> {
    pub fn new(clock: C, ids: G, rating_source: R, stale_after: Duration) -> Self {
        Self {
            drafts: DraftTracker::new(clock.clone(), ids, stale_after),
            matches: MatchTracker::new(clock),
            grader: PickGrader::new(rating_source),
        }
    }

    pub fn drafts_mut(&mut self) -> &mut DraftTracker<C, G> {
        &mut self.drafts
    }

    pub fn snapshot(&self) -> MachineSnapshot {
        MachineSnapshot {
            active_draft: self.drafts.active_session().cloned(),
            active_match: self.matches.active_match().cloned(),
        }
    }

    /// Apply one classified event.
    pub async fn handle_event(&mut self, event: &LogEvent) -> Vec<Delta> {
        match &event.kind {
            LogEventKind::DraftPack => match parse_pack(&event.payload) {
                Some(obs) => self.drafts.observe_pack(obs),
                None => skip(event, "pack fields missing"),
            },
            LogEventKind::DraftMakePick => match parse_pick(&event.payload) {
                Some(pick) => self.handle_pick(pick).await,
                None => skip(event, "pick fields missing"),
            },
            LogEventKind::DraftComplete => {
                let wins = event.u64_field("Wins").map(|w| w as u32);
                let losses = event.u64_field("Losses").map(|l| l as u32);
                self.drafts.complete(wins, losses)
            }
            LogEventKind::MatchBegin => match parse_match_begin(&event.payload) {
                Some(begun) => self.matches.begin(begun),
                None => skip(event, "match fields missing"),
            },
            LogEventKind::GameResult => match parse_game(&event.payload) {
                Some(game) => self.matches.game_result(game),
                None => skip(event, "game fields missing"),
            },
            LogEventKind::MatchComplete => {
                let reason = event.str_field("Reason").map(str::to_string);
                let duration = event.u64_field("DurationSeconds").map(|d| d as u32);
                self.matches.complete(reason, duration)
            }
            LogEventKind::DeckSubmit => match event.str_field("DeckId") {
                Some(deck_id) => self.matches.deck_submitted(deck_id.to_string()),
                None => skip(event, "deck id missing"),
            },
            LogEventKind::RankUpdate => {
                let before = event.str_field("RankBefore").map(str::to_string);
                let after = event.str_field("RankAfter").map(str::to_string);
                self.matches.rank_update(before, after)
            }
            // Persisted verbatim by ingest; no live-state transition.
            LogEventKind::EventGetCoursesV2
            | LogEventKind::InventoryInfo
            | LogEventKind::Other(_) => Vec::new(),
        }
    }

    /// Idle-horizon tick from the coordinator.
    pub fn check_stale(&mut self) -> Vec<Delta> {
        self.drafts.check_stale()
    }

    async fn handle_pick(&mut self, pick: PickMade) -> Vec<Delta> {
        let scope = self.drafts.active_session().map(|s| {
            (
                s.set_code.clone(),
                s.draft_type.clone(),
            )
        });
        let cards = self
            .drafts
            .pack_cards(pick.pack_number, pick.pick_number)
            .map(<[ArenaId]>::to_vec);

        let quality = match (scope, cards) {
            (Some((set_code, format)), Some(cards)) => {
                match self
                    .grader
                    .grade_pick(&set_code, &format, &cards, pick.card_id)
                    .await
                {
                    Ok(quality) => quality,
                    Err(e) => {
                        tracing::warn!(
                            pack = pick.pack_number,
                            pick = pick.pick_number,
                            card = pick.card_id,
                            error = %e,
                            "pick not gradable, storing without grade"
                        );
                        None
                    }
                }
            }
            _ => None,
        };

        self.drafts.record_pick(pick, quality)
    }
}

fn skip(event: &LogEvent, why: &str) -> Vec<Delta> {
    tracing::debug!(kind = event.kind.name(), seq = event.arrival_seq, why, "event skipped");
    Vec::new()
}

fn parse_pack(payload: &Value) -> Option<PackObserved> {
    Some(PackObserved {
        set_code: payload.get("SetCode")?.as_str()?.to_string(),
        draft_type: payload
            .get("DraftType")
            .and_then(Value::as_str)
            .unwrap_or("Draft")
            .to_string(),
        event_name: payload.get("EventName")?.as_str()?.to_string(),
        pack_number: payload.get("PackNumber")?.as_u64()? as u32,
        pick_number: payload.get("PickNumber")?.as_u64()? as u32,
        card_ids: payload
            .get("PackCards")?
            .as_array()?
            .iter()
            .filter_map(Value::as_i64)
            .collect(),
    })
}

fn parse_pick(payload: &Value) -> Option<PickMade> {
    Some(PickMade {
        pack_number: payload.get("PackNumber")?.as_u64()? as u32,
        pick_number: payload.get("PickNumber")?.as_u64()? as u32,
        card_id: payload.get("CardId")?.as_i64()?,
    })
}

fn parse_match_begin(payload: &Value) -> Option<MatchBegun> {
    Some(MatchBegun {
        match_id: MatchId::new(payload.get("MatchId")?.as_str()?),
        event_id: payload
            .get("EventId")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        event_name: payload
            .get("EventName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        format: payload
            .get("Format")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
        opponent_id: payload
            .get("OpponentId")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

fn parse_game(payload: &Value) -> Option<GameFinished> {
    Some(GameFinished {
        game_number: payload.get("GameNumber")?.as_u64()? as u32,
        result: MatchResult::from_str(&payload.get("Result")?.as_str()?.to_lowercase()),
        duration_s: payload
            .get("DurationSeconds")
            .and_then(Value::as_u64)
            .map(|d| d as u32),
        result_reason: payload
            .get("Reason")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string(),
    })
}

#[cfg(test)]
#[path = "machine_tests.rs"]
mod tests;
