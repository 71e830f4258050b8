// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Typed frames exchanged over the broadcast bus.
//!
//! Serializes as `{"type": "ns:verb", "data": {...}, "timestamp": "..."}`.
//! The `type` tags form a closed set; `data` stays an opaque map so GUI
//! clients and the daemon can evolve payloads independently.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Frame type tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FrameKind {
    #[serde(rename = "stats:updated")]
    StatsUpdated,
    #[serde(rename = "match:begin")]
    MatchBegin,
    #[serde(rename = "match:complete")]
    MatchComplete,
    #[serde(rename = "draft:started")]
    DraftStarted,
    #[serde(rename = "draft:pick")]
    DraftPick,
    #[serde(rename = "draft:updated")]
    DraftUpdated,
    #[serde(rename = "draft:completed")]
    DraftCompleted,
    #[serde(rename = "draft:stale")]
    DraftStale,
    #[serde(rename = "rotation:gap")]
    RotationGap,
    #[serde(rename = "tailer:stalled")]
    TailerStalled,
    #[serde(rename = "replay:ack")]
    ReplayAck,
    #[serde(rename = "ping")]
    Ping,
    #[serde(rename = "pong")]
    Pong,
    #[serde(rename = "error")]
    Error,
}

impl FrameKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StatsUpdated => "stats:updated",
            Self::MatchBegin => "match:begin",
            Self::MatchComplete => "match:complete",
            Self::DraftStarted => "draft:started",
            Self::DraftPick => "draft:pick",
            Self::DraftUpdated => "draft:updated",
            Self::DraftCompleted => "draft:completed",
            Self::DraftStale => "draft:stale",
            Self::RotationGap => "rotation:gap",
            Self::TailerStalled => "tailer:stalled",
            Self::ReplayAck => "replay:ack",
            Self::Ping => "ping",
            Self::Pong => "pong",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for FrameKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single frame delivered to bus subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    #[serde(rename = "type")]
    pub kind: FrameKind,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

impl Frame {
    pub fn new(kind: FrameKind, data: Value, timestamp: DateTime<Utc>) -> Self {
        Self {
            kind,
            data,
            timestamp,
        }
    }

    /// Error frame with a reason code, e.g. `unknown_command`.
    pub fn error(reason: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            FrameKind::Error,
            serde_json::json!({ "error": reason }),
            timestamp,
        )
    }

    /// Ack frame for a client-initiated replay command.
    pub fn replay_ack(command: &str, timestamp: DateTime<Utc>) -> Self {
        Self::new(
            FrameKind::ReplayAck,
            serde_json::json!({ "command": command }),
            timestamp,
        )
    }
}

#[cfg(test)]
#[path = "frame_tests.rs"]
mod tests;
