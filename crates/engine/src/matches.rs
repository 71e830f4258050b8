// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match tracking.
//!
//! At most one match is in flight. A `MatchBegin` while one is open
//! finalizes the prior as unknown/abandoned before starting the new one.

use crate::delta::Delta;
use mtgc_core::{Clock, Frame, FrameKind, GameRecord, MatchId, MatchRecord, MatchResult};
use serde_json::json;

/// A `MatchBegin` event, reduced to the fields the tracker reads.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchBegun {
    pub match_id: MatchId,
    pub event_id: String,
    pub event_name: String,
    pub format: String,
    pub opponent_id: Option<String>,
}

/// A `GameResult` event, reduced to the fields the tracker reads.
#[derive(Debug, Clone, PartialEq)]
pub struct GameFinished {
    pub game_number: u32,
    pub result: MatchResult,
    pub duration_s: Option<u32>,
    pub result_reason: String,
}

/// Match half of the session state machine.
pub struct MatchTracker<C: Clock> {
    clock: C,
    active: Option<(MatchRecord, Vec<GameRecord>)>,
}

impl<C: Clock> MatchTracker<C> {
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            active: None,
        }
    }

    pub fn active_match(&self) -> Option<&MatchRecord> {
        self.active.as_ref().map(|(record, _)| record)
    }

    /// `MatchBegin`: open a match, abandoning any prior one.
    pub fn begin(&mut self, begun: MatchBegun) -> Vec<Delta> {
        let now = self.clock.now();
        let mut deltas = self.abandon_active();

        let mut record = MatchRecord::begin(
            begun.match_id,
            begun.event_id,
            begun.event_name,
            begun.format,
            now,
        );
        record.opponent_id = begun.opponent_id;
        tracing::info!(match_id = %record.match_id, event = %record.event_name, "match started");

        let data = json!({
            "match_id": record.match_id.as_str(),
            "event_name": record.event_name,
            "format": record.format,
        });
        self.active = Some((record.clone(), Vec::new()));
        deltas.push(Delta::UpsertMatch {
            record,
            games: Vec::new(),
        });
        deltas.push(Delta::Broadcast(Frame::new(FrameKind::MatchBegin, data, now)));
        deltas
    }

    /// `GameResult`: append the game and update win counts.
    pub fn game_result(&mut self, game: GameFinished) -> Vec<Delta> {
        let Some((record, games)) = self.active.as_mut() else {
            tracing::debug!(game = game.game_number, "game result with no active match");
            return Vec::new();
        };

        match game.result {
            MatchResult::Win => record.player_wins += 1,
            MatchResult::Loss => record.opponent_wins += 1,
            MatchResult::Draw | MatchResult::Unknown => {}
        }
        games.push(GameRecord {
            match_id: record.match_id.clone(),
            game_number: game.game_number,
            result: game.result,
            duration_s: game.duration_s,
            result_reason: game.result_reason,
        });

        vec![Delta::UpsertMatch {
            record: record.clone(),
            games: games.clone(),
        }]
    }

    /// `MatchComplete`: freeze the record and announce it.
    pub fn complete(
        &mut self,
        result_reason: Option<String>,
        duration_s: Option<u32>,
    ) -> Vec<Delta> {
        let now = self.clock.now();
        let Some((mut record, games)) = self.active.take() else {
            tracing::debug!("match complete with no active match");
            return Vec::new();
        };

        record.result = MatchResult::from_wins(record.player_wins, record.opponent_wins);
        if let Some(reason) = result_reason {
            record.result_reason = reason;
        }
        record.duration_s = duration_s.or(record.duration_s);
        tracing::info!(
            match_id = %record.match_id,
            result = record.result.as_str(),
            "match complete"
        );

        let data = json!({
            "match_id": record.match_id.as_str(),
            "result": record.result.as_str(),
            "player_wins": record.player_wins,
            "opponent_wins": record.opponent_wins,
        });
        vec![
            Delta::UpsertMatch { record, games },
            Delta::Broadcast(Frame::new(FrameKind::MatchComplete, data, now)),
            Delta::Broadcast(Frame::new(FrameKind::StatsUpdated, json!({}), now)),
        ]
    }

    /// `DeckSubmit`: remember the deck for the next/current match.
    pub fn deck_submitted(&mut self, deck_id: String) -> Vec<Delta> {
        if let Some((record, games)) = self.active.as_mut() {
            record.deck_id = Some(deck_id);
            return vec![Delta::UpsertMatch {
                record: record.clone(),
                games: games.clone(),
            }];
        }
        Vec::new()
    }

    /// `RankUpdate`: attach rank movement to the active match.
    pub fn rank_update(
        &mut self,
        rank_before: Option<String>,
        rank_after: Option<String>,
    ) -> Vec<Delta> {
        if let Some((record, games)) = self.active.as_mut() {
            record.rank_before = rank_before.or(record.rank_before.take());
            record.rank_after = rank_after.or(record.rank_after.take());
            return vec![Delta::UpsertMatch {
                record: record.clone(),
                games: games.clone(),
            }];
        }
        Vec::new()
    }

    fn abandon_active(&mut self) -> Vec<Delta> {
        let Some((mut record, games)) = self.active.take() else {
            return Vec::new();
        };
        record.result = MatchResult::Unknown;
        record.result_reason = "abandoned".to_string();
        tracing::warn!(
            match_id = %record.match_id,
            "new match began while one was in flight; prior marked abandoned"
        );
        vec![Delta::UpsertMatch { record, games }]
    }
}

#[cfg(test)]
#[path = "matches_tests.rs"]
mod tests;
