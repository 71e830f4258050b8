// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pick grades and analyzer output.

use crate::rating::ArenaId;
use serde::{Deserialize, Serialize};

/// Letter grade for a pick, from best in pack (`A+`) down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    APlus,
    A,
    B,
    C,
    D,
    F,
}

impl Grade {
    /// Map a 1-indexed rank within the pack to a grade.
    pub fn for_rank(rank: usize) -> Self {
        match rank {
            0 | 1 => Self::APlus,
            2..=3 => Self::A,
            4..=5 => Self::B,
            6..=8 => Self::C,
            9..=10 => Self::D,
            _ => Self::F,
        }
    }

    /// Numeric score for averaging across a session.
    pub fn score(&self) -> f64 {
        match self {
            Self::APlus => 4.3,
            Self::A => 4.0,
            Self::B => 3.0,
            Self::C => 2.0,
            Self::D => 1.0,
            Self::F => 0.0,
        }
    }

    /// Inverse of [`score`](Self::score) by nearest threshold, used when
    /// summarizing a finished session.
    pub fn from_score(score: f64) -> Self {
        if score >= 4.15 {
            Self::APlus
        } else if score >= 3.5 {
            Self::A
        } else if score >= 2.5 {
            Self::B
        } else if score >= 1.5 {
            Self::C
        } else if score >= 0.5 {
            Self::D
        } else {
            Self::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::APlus => "A+",
            Self::A => "A",
            Self::B => "B",
            Self::C => "C",
            Self::D => "D",
            Self::F => "F",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "A+" => Some(Self::APlus),
            "A" => Some(Self::A),
            "B" => Some(Self::B),
            "C" => Some(Self::C),
            "D" => Some(Self::D),
            "F" => Some(Self::F),
            _ => None,
        }
    }
}

impl std::fmt::Display for Grade {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Grade {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Grade {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Self::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown grade: {s:?}")))
    }
}

/// A non-picked card that ranked above (or near) the pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alternative {
    pub card_id: ArenaId,
    pub card_name: String,
    pub gihwr: f64,
    pub rank: usize,
}

/// Analyzer output for one observed pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickQuality {
    pub grade: Grade,
    pub rank: usize,
    pub pack_best_gihwr: f64,
    pub picked_card_gihwr: f64,
    pub alternatives: Vec<Alternative>,
}

#[cfg(test)]
#[path = "grade_tests.rs"]
mod tests;
