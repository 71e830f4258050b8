// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! mtgc-engine: Live session state machines and pick analysis.
//!
//! The machine consumes classified events and produces [`Delta`] values:
//! persistence intents and bus frames. It never touches the store
//! directly; the coordinator routes deltas, which keeps the dependency
//! graph acyclic (machine → grader → rating source, nothing back).

pub mod delta;
pub mod drafts;
pub mod grader;
pub mod machine;
pub mod matches;
pub mod rating_cache;

pub use delta::Delta;
pub use drafts::{
    select_session_for_signature, DraftTracker, PackObserved, PickMade, SessionCandidate,
};
pub use grader::{GradeError, PickGrader, RatingSource};
pub use machine::{MachineSnapshot, SessionMachine};
pub use matches::{GameFinished, MatchBegun, MatchTracker};
pub use rating_cache::{spawn_sweeper, CacheStats, RatingCache};
