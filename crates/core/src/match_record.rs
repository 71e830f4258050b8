// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Match and game records.
//!
//! A match is created on `MatchBegin`, mutated as games complete, finalized
//! on `MatchComplete`, and frozen afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_id! {
    /// Identifier assigned by the game client to a match room.
    pub struct MatchId;
}

/// Terminal result of a match or a single game.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchResult {
    Win,
    Loss,
    Draw,
    /// The terminal event was never observed (e.g. client crash, new match
    /// started while one was in flight).
    Unknown,
}

impl MatchResult {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Win => "win",
            Self::Loss => "loss",
            Self::Draw => "draw",
            Self::Unknown => "unknown",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "win" => Self::Win,
            "loss" => Self::Loss,
            "draw" => Self::Draw,
            _ => Self::Unknown,
        }
    }

    /// Derive the match result from game win counts.
    pub fn from_wins(player_wins: u32, opponent_wins: u32) -> Self {
        match player_wins.cmp(&opponent_wins) {
            std::cmp::Ordering::Greater => Self::Win,
            std::cmp::Ordering::Less => Self::Loss,
            std::cmp::Ordering::Equal => Self::Draw,
        }
    }
}

/// A completed or in-flight match.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchRecord {
    pub match_id: MatchId,
    pub event_id: String,
    pub event_name: String,
    pub format: String,
    pub timestamp: DateTime<Utc>,
    pub player_wins: u32,
    pub opponent_wins: u32,
    pub result: MatchResult,
    pub result_reason: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deck_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opponent_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_before: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rank_after: Option<String>,
}

impl MatchRecord {
    /// Fresh record for a match that just began.
    pub fn begin(
        match_id: MatchId,
        event_id: String,
        event_name: String,
        format: String,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            match_id,
            event_id,
            event_name,
            format,
            timestamp,
            player_wins: 0,
            opponent_wins: 0,
            result: MatchResult::Unknown,
            result_reason: String::new(),
            duration_s: None,
            deck_id: None,
            opponent_id: None,
            rank_before: None,
            rank_after: None,
        }
    }
}

/// One game within a match. Games are contiguous from 1..N.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GameRecord {
    pub match_id: MatchId,
    pub game_number: u32,
    pub result: MatchResult,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_s: Option<u32>,
    pub result_reason: String,
}

#[cfg(test)]
#[path = "match_record_tests.rs"]
mod tests;
