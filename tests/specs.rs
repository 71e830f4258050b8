//! End-to-end behavioral specifications for the companion daemon core.
//!
//! These tests exercise whole subsystems together — tailer through parser,
//! replay through the machine task — against real temp files and an
//! in-memory store. See tests/specs/prelude.rs for shared fixtures.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

#[path = "specs/prelude.rs"]
mod prelude;

// tailer/
#[path = "specs/tailer/rotation.rs"]
mod tailer_rotation;

// parser/
#[path = "specs/parser/extraction.rs"]
mod parser_extraction;
#[path = "specs/parser/dedup.rs"]
mod parser_dedup;

// analyzer/
#[path = "specs/analyzer/grading.rs"]
mod analyzer_grading;

// bus/
#[path = "specs/bus/fanout.rs"]
mod bus_fanout;

// replay/
#[path = "specs/replay/determinism.rs"]
mod replay_determinism;
