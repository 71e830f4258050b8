// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Coordinator command queue.
//!
//! Client-initiated bus commands are forwarded here; the replay controller
//! is the only consumer today.

use std::path::PathBuf;

/// Replay control commands forwarded from the bus.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    /// Stage a replay of historical log files.
    ReplayLogs {
        file_paths: Vec<PathBuf>,
        /// Events per second; `None` means as fast as possible.
        speed: Option<f64>,
        /// Event-type names to forward; empty forwards everything.
        filter: Vec<String>,
        /// Suspend after each observed pick until resumed.
        pause_on_draft: bool,
        /// Truncate session and match tables before replaying.
        clear_data: bool,
    },
    StartReplay,
    PauseReplay,
    ResumeReplay,
    StopReplay,
}

impl Command {
    /// Name echoed in the ack frame.
    pub fn name(&self) -> &'static str {
        match self {
            Self::ReplayLogs { .. } => "replay_logs",
            Self::StartReplay => "start_replay",
            Self::PauseReplay => "pause_replay",
            Self::ResumeReplay => "resume_replay",
            Self::StopReplay => "stop_replay",
        }
    }
}
