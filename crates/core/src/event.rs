// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Parsed log event types.
//!
//! The game client writes structured payloads into its log file; the parser
//! extracts them into [`LogEvent`] records. Payloads stay opaque
//! (`serde_json::Value`) — strong typing is applied only where the state
//! machine reads specific fields, which keeps ingest resilient to client
//! schema drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Classification of a log event.
///
/// The marker set evolves with the game client, so the taxonomy is
/// deliberately open: unrecognized markers classify as `Other` and are
/// stored verbatim, never dropped.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogEventKind {
    /// Course/event list sync, carries active draft and deck state.
    EventGetCoursesV2,
    /// A match room opened.
    MatchBegin,
    /// A single game within a match finished.
    GameResult,
    /// The match reached its terminal state.
    MatchComplete,
    /// Deck submitted for an event.
    DeckSubmit,
    /// A draft pack was presented to the player.
    DraftPack,
    /// The player made a pick.
    DraftMakePick,
    /// The draft reached its terminal state.
    DraftComplete,
    /// Inventory delta; payload is opaque passthrough.
    InventoryInfo,
    /// Constructed/limited rank change.
    RankUpdate,
    /// Anything the classifier does not recognize.
    Other(String),
}

impl LogEventKind {
    /// Map a marker string to its kind. Unknown markers become `Other`.
    pub fn from_marker(marker: &str) -> Self {
        match marker {
            "EventGetCoursesV2" => Self::EventGetCoursesV2,
            "MatchBegin" | "MatchGameRoomStateChangedEvent" => Self::MatchBegin,
            "GameResult" => Self::GameResult,
            "MatchComplete" => Self::MatchComplete,
            "DeckSubmit" | "EventSetDeckV2" => Self::DeckSubmit,
            "DraftPack" | "DraftNotify" => Self::DraftPack,
            "DraftMakePick" | "EventPlayerDraftMakePick" => Self::DraftMakePick,
            "DraftComplete" | "EventCompleteDraft" => Self::DraftComplete,
            "InventoryInfo" => Self::InventoryInfo,
            "RankUpdate" | "RankUpdated" => Self::RankUpdate,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical name used for persistence and dedup fingerprints.
    pub fn name(&self) -> &str {
        match self {
            Self::EventGetCoursesV2 => "EventGetCoursesV2",
            Self::MatchBegin => "MatchBegin",
            Self::GameResult => "GameResult",
            Self::MatchComplete => "MatchComplete",
            Self::DeckSubmit => "DeckSubmit",
            Self::DraftPack => "DraftPack",
            Self::DraftMakePick => "DraftMakePick",
            Self::DraftComplete => "DraftComplete",
            Self::InventoryInfo => "InventoryInfo",
            Self::RankUpdate => "RankUpdate",
            Self::Other(name) => name,
        }
    }

    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Other(_))
    }
}

/// A structured event extracted from the observed log.
///
/// Identity is `(kind.name(), arrival_seq)`; `arrival_seq` is strictly
/// increasing within a process lifetime. `source_offset` records where in
/// the file the event balanced, for debugging only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEvent {
    pub kind: LogEventKind,
    pub timestamp: DateTime<Utc>,
    pub arrival_seq: u64,
    pub payload: Value,
    pub source_offset: u64,
}

impl LogEvent {
    /// Convenience accessor: payload field by name, if it is an object.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }

    /// Payload field as a string slice.
    pub fn str_field(&self, name: &str) -> Option<&str> {
        self.field(name).and_then(Value::as_str)
    }

    /// Payload field as an unsigned integer.
    pub fn u64_field(&self, name: &str) -> Option<u64> {
        self.field(name).and_then(Value::as_u64)
    }
}

#[cfg(test)]
#[path = "event_tests.rs"]
mod tests;
