// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Outputs of the state machine.
//!
//! A delta is either a persistence intent (routed to the store writer) or
//! a frame for the broadcast bus. Keeping these as values lets the machine
//! stay synchronous and testable without a database.

use mtgc_core::{DraftSession, Frame, GameRecord, MatchRecord, PackRow, PickRow};

/// One state-machine output.
#[derive(Debug, Clone)]
pub enum Delta {
    UpsertSession(DraftSession),
    UpsertPack(PackRow),
    UpsertPick(PickRow),
    UpsertMatch {
        record: MatchRecord,
        games: Vec<GameRecord>,
    },
    Broadcast(Frame),
}

impl Delta {
    pub fn frame(&self) -> Option<&Frame> {
        match self {
            Self::Broadcast(frame) => Some(frame),
            _ => None,
        }
    }
}
