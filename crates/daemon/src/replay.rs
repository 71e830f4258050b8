// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Historical replay through the live pipeline.
//!
//! Replayed files flow through a fresh parser into the same machine task
//! as live ingest, so subscribers cannot distinguish replay frames from
//! live ones. `pause_on_draft` suspends after each observed pick until a
//! resume or stop command arrives.

use crate::command::Command;
use mtgc_core::{Clock, LogEvent, LogEventKind};
use mtgc_parser::{Parser, ParserConfig};
use mtgc_store::Store;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, watch};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("no replay staged; send replay_logs first")]
    NothingStaged,

    #[error("replay file unreadable: {path}: {source}")]
    FileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store error: {0}")]
    Store(#[from] mtgc_store::StoreError),
}

/// Staged replay parameters from a `replay_logs` command.
#[derive(Debug, Clone)]
struct Staged {
    file_paths: Vec<PathBuf>,
    speed: Option<f64>,
    filter: Vec<String>,
    pause_on_draft: bool,
    clear_data: bool,
}

/// Pause gate shared with an in-flight replay run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Gate {
    Running,
    Paused,
    Stopped,
}

/// Consumes the coordinator command queue and drives replay runs.
///
/// Runs on the coordinator context; the feed itself is spawned so pause
/// and stop commands stay responsive mid-run.
pub struct ReplayController<C: Clock> {
    store: Store,
    event_tx: mpsc::Sender<LogEvent>,
    parser_config: ParserConfig,
    clock: C,
    staged: Option<Staged>,
    gate_tx: Option<Arc<watch::Sender<Gate>>>,
}

impl<C: Clock> ReplayController<C> {
    pub fn new(
        store: Store,
        event_tx: mpsc::Sender<LogEvent>,
        parser_config: ParserConfig,
        clock: C,
    ) -> Self {
        Self {
            store,
            event_tx,
            parser_config,
            clock,
            staged: None,
            gate_tx: None,
        }
    }

    /// Run until the command channel closes.
    pub async fn run(mut self, mut command_rx: mpsc::Receiver<Command>) {
        while let Some(command) = command_rx.recv().await {
            if let Err(e) = self.handle(command).await {
                tracing::warn!(error = %e, "replay command failed");
            }
        }
    }

    async fn handle(&mut self, command: Command) -> Result<(), ReplayError> {
        match command {
            Command::ReplayLogs {
                file_paths,
                speed,
                filter,
                pause_on_draft,
                clear_data,
            } => {
                self.staged = Some(Staged {
                    file_paths,
                    speed,
                    filter,
                    pause_on_draft,
                    clear_data,
                });
                tracing::info!("replay staged");
                Ok(())
            }
            Command::StartReplay => self.start().await,
            Command::PauseReplay => {
                self.set_gate(Gate::Paused);
                Ok(())
            }
            Command::ResumeReplay => {
                self.set_gate(Gate::Running);
                Ok(())
            }
            Command::StopReplay => {
                self.set_gate(Gate::Stopped);
                self.gate_tx = None;
                Ok(())
            }
        }
    }

    async fn start(&mut self) -> Result<(), ReplayError> {
        let staged = self.staged.clone().ok_or(ReplayError::NothingStaged)?;

        if staged.clear_data {
            tracing::info!("clearing session data before replay");
            self.store.clear_session_data().await?;
        }

        let (gate_tx, _gate_rx) = watch::channel(Gate::Running);
        let gate_tx = Arc::new(gate_tx);
        self.gate_tx = Some(Arc::clone(&gate_tx));

        let parser = Parser::new(self.parser_config.clone(), self.clock.clone());
        let event_tx = self.event_tx.clone();
        tokio::spawn(async move {
            match feed(staged, parser, event_tx, gate_tx).await {
                Ok(count) => tracing::info!(events = count, "replay finished"),
                Err(e) => tracing::warn!(error = %e, "replay aborted"),
            }
        });
        Ok(())
    }

    fn set_gate(&self, gate: Gate) {
        match &self.gate_tx {
            Some(tx) => {
                let _ = tx.send(gate);
            }
            None => tracing::debug!("replay gate command with no replay in flight"),
        }
    }
}

/// Feed staged files through a fresh parser into the machine channel.
async fn feed<C: Clock>(
    staged: Staged,
    mut parser: Parser<C>,
    event_tx: mpsc::Sender<LogEvent>,
    gate_tx: Arc<watch::Sender<Gate>>,
) -> Result<u64, ReplayError> {
    let mut gate_rx = gate_tx.subscribe();
    let delay = staged
        .speed
        .filter(|s| s.is_finite() && *s > 0.0)
        .map(|s| Duration::from_secs_f64(1.0 / s));
    let mut sent = 0u64;

    for path in &staged.file_paths {
        let file =
            tokio::fs::File::open(path)
                .await
                .map_err(|source| ReplayError::FileUnreadable {
                    path: path.clone(),
                    source,
                })?;
        let mut lines = BufReader::new(file).lines();

        while let Some(line) = lines.next_line().await.map_err(|source| {
            ReplayError::FileUnreadable {
                path: path.clone(),
                source,
            }
        })? {
            for event in parser.push_line(&line) {
                if !staged.filter.is_empty()
                    && !staged.filter.iter().any(|f| f == event.kind.name())
                {
                    continue;
                }

                if wait_for_gate(&mut gate_rx).await == Gate::Stopped {
                    return Ok(sent);
                }

                let pause_after = staged.pause_on_draft
                    && matches!(event.kind, LogEventKind::DraftMakePick);

                if event_tx.send(event).await.is_err() {
                    return Ok(sent);
                }
                sent += 1;

                if pause_after {
                    tracing::info!("replay paused on draft pick");
                    let _ = gate_tx.send(Gate::Paused);
                    if wait_for_gate(&mut gate_rx).await == Gate::Stopped {
                        return Ok(sent);
                    }
                }

                if let Some(delay) = delay {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }

    Ok(sent)
}

/// Block while paused; resolve to the gate that released us.
async fn wait_for_gate(gate_rx: &mut watch::Receiver<Gate>) -> Gate {
    if *gate_rx.borrow() != Gate::Paused {
        return *gate_rx.borrow();
    }
    match gate_rx.wait_for(|g| *g != Gate::Paused).await {
        Ok(gate) => *gate,
        Err(_) => Gate::Stopped,
    }
}

#[cfg(test)]
#[path = "replay_tests.rs"]
mod tests;
