// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Draft session, pack, and pick records.

use crate::grade::Grade;
use crate::rating::ArenaId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

crate::define_id! {
    /// Unique identifier for one draft run.
    pub struct DraftSessionId;
}

/// Lifecycle status of a draft session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DraftStatus {
    Active,
    /// Terminal event observed.
    Completed,
    /// Superseded by a new session before its terminal event arrived.
    CompletedImplicit,
    /// No activity within the idle horizon; preserved, not deleted.
    Stale,
}

impl DraftStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Completed => "completed",
            Self::CompletedImplicit => "completed_implicit",
            Self::Stale => "stale",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "completed" => Self::Completed,
            "completed_implicit" => Self::CompletedImplicit,
            "stale" => Self::Stale,
            _ => Self::Active,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// One draft run from first pack to completion.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DraftSession {
    pub session_id: DraftSessionId,
    pub set_code: String,
    pub draft_type: String,
    pub event_name: String,
    pub start_time: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_time: Option<DateTime<Utc>>,
    pub status: DraftStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub overall_score: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub predicted_win_rate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub wins: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub losses: Option<u32>,
}

/// The cards offered at `(pack_number, pick_number)`.
///
/// At most one pack row exists per position within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackRow {
    pub session_id: DraftSessionId,
    pub pack_number: u32,
    pub pick_number: u32,
    pub card_ids: Vec<ArenaId>,
}

/// The card the player took at `(pack_number, pick_number)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickRow {
    pub session_id: DraftSessionId,
    pub pack_number: u32,
    pub pick_number: u32,
    pub card_id: ArenaId,
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grade: Option<Grade>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alternatives: Option<Value>,
}

/// Tuple identifying a distinct draft run for reconciliation.
///
/// Two observations belong to the same run when set, type, and event name
/// match and their start times fall within the same window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSignature {
    pub set_code: String,
    pub draft_type: String,
    pub event_name: String,
    pub start_window: DateTime<Utc>,
}

impl SessionSignature {
    /// Window granularity for grouping observations into one run.
    pub const WINDOW_SECS: i64 = 6 * 3600;

    pub fn new(
        set_code: impl Into<String>,
        draft_type: impl Into<String>,
        event_name: impl Into<String>,
        observed_at: DateTime<Utc>,
    ) -> Self {
        let secs = observed_at.timestamp().div_euclid(Self::WINDOW_SECS) * Self::WINDOW_SECS;
        Self {
            set_code: set_code.into(),
            draft_type: draft_type.into(),
            event_name: event_name.into(),
            start_window: DateTime::<Utc>::from_timestamp(secs, 0)
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
        }
    }

    /// Whether an observation with this signature belongs to `session`.
    pub fn matches(&self, session: &DraftSession) -> bool {
        self.set_code == session.set_code
            && self.draft_type == session.draft_type
            && self.event_name == session.event_name
            && (session.start_time.timestamp() - self.start_window.timestamp()).abs()
                < Self::WINDOW_SECS
    }
}

#[cfg(test)]
#[path = "draft_tests.rs"]
mod tests;
