// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Card rating records from the external draft-statistics feed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The game client's numeric card identifier.
pub type ArenaId = i64;

/// Lookup key for a rating scope.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RatingKey {
    pub set_code: String,
    pub format: String,
    pub arena_id: ArenaId,
}

/// One card's aggregate statistics for a `(set, format)` scope.
///
/// GIHWR is the card's win rate in games where it was in hand; the other
/// columns mirror the upstream feed and are carried for display.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CardRating {
    pub set_code: String,
    pub format: String,
    pub arena_id: ArenaId,
    pub card_name: String,
    pub gihwr: f64,
    pub ohwr: f64,
    pub alsa: f64,
    pub ata: f64,
    pub games_in_hand: i64,
    pub games_played: i64,
    pub num_decks: i64,
    pub cached_at: DateTime<Utc>,
}

impl CardRating {
    pub fn key(&self) -> RatingKey {
        RatingKey {
            set_code: self.set_code.clone(),
            format: self.format.clone(),
            arena_id: self.arena_id,
        }
    }
}
