// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Live ingest pipeline: tailer → parser → state machine → store + bus.
//!
//! One task per producer/consumer role, bounded channels throughout.
//! Ordering: events are persisted in arrival order, and the machine sees
//! them in the same order the parser balanced them.

use crate::bus::Hub;
use chrono::Utc;
use mtgc_core::{Clock, Frame, FrameKind, IdGen, LogEvent};
use mtgc_engine::{Delta, MachineSnapshot, RatingSource, SessionMachine};
use mtgc_parser::{Parser, ParserMetrics};
use mtgc_store::WriteOp;
use mtgc_tailer::TailEvent;
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;

/// Interval for the machine's stale-session check.
const STALE_CHECK_INTERVAL: Duration = Duration::from_secs(60);

/// Parser task: tail events in, classified events out.
///
/// Rotation gaps reset the candidate buffer and surface to subscribers;
/// stalls surface as frames too. Metrics are mirrored into shared state
/// for the health endpoint.
pub fn spawn_parser_task<C: Clock>(
    mut parser: Parser<C>,
    mut tail_rx: mpsc::Receiver<TailEvent>,
    event_tx: mpsc::Sender<LogEvent>,
    hub: Hub,
    metrics: Arc<Mutex<ParserMetrics>>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(tail_event) = tail_rx.recv().await {
            match tail_event {
                TailEvent::Lines(lines) => {
                    for event in parser.push_lines(&lines) {
                        if event_tx.send(event).await.is_err() {
                            return;
                        }
                    }
                }
                TailEvent::RotationGap => {
                    parser.note_rotation();
                    hub.publish(Frame::new(
                        FrameKind::RotationGap,
                        serde_json::json!({}),
                        Utc::now(),
                    ));
                }
                TailEvent::OversizedLine { discarded } => {
                    tracing::warn!(discarded, "oversized log line discarded");
                }
                TailEvent::Stalled { since_secs } => {
                    hub.publish(Frame::new(
                        FrameKind::TailerStalled,
                        serde_json::json!({ "since_secs": since_secs }),
                        Utc::now(),
                    ));
                }
            }
            *metrics.lock() = parser.metrics();
        }
        tracing::debug!("parser task: tail channel closed");
    })
}

/// Machine task: events in, deltas routed to store writer and bus.
///
/// Also the only place live state mutates, which serializes transitions
/// and keeps external reads on the snapshot channel.
pub fn spawn_machine_task<C, G, R>(
    mut machine: SessionMachine<C, G, R>,
    mut event_rx: mpsc::Receiver<LogEvent>,
    write_tx: mpsc::Sender<WriteOp>,
    hub: Hub,
    snapshot_tx: watch::Sender<MachineSnapshot>,
) -> JoinHandle<()>
where
    C: Clock,
    G: IdGen + Send + Sync + 'static,
    R: RatingSource + 'static,
{
    tokio::spawn(async move {
        let mut stale_check = tokio::time::interval(STALE_CHECK_INTERVAL);
        stale_check.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

        loop {
            let deltas = tokio::select! {
                event = event_rx.recv() => match event {
                    Some(event) => {
                        // Raw event first so replay from the store can
                        // reconstruct what the machine saw.
                        if write_tx.send(WriteOp::Event(event.clone())).await.is_err() {
                            break;
                        }
                        machine.handle_event(&event).await
                    }
                    None => break,
                },
                _ = stale_check.tick() => machine.check_stale(),
            };

            route_deltas(&deltas, &write_tx, &hub).await;
            if !deltas.is_empty() {
                let _ = snapshot_tx.send(machine.snapshot());
            }
        }
        tracing::debug!("machine task: event channel closed");
    })
}

/// Fan deltas out to the writer queue and the bus.
pub async fn route_deltas(deltas: &[Delta], write_tx: &mpsc::Sender<WriteOp>, hub: &Hub) {
    for delta in deltas {
        match delta {
            Delta::UpsertSession(session) => {
                let _ = write_tx
                    .send(WriteOp::UpsertDraftSession(session.clone()))
                    .await;
            }
            Delta::UpsertPack(pack) => {
                let _ = write_tx.send(WriteOp::UpsertPack(pack.clone())).await;
            }
            Delta::UpsertPick(pick) => {
                let _ = write_tx.send(WriteOp::UpsertPick(pick.clone())).await;
            }
            Delta::UpsertMatch { record, games } => {
                let _ = write_tx
                    .send(WriteOp::UpsertMatch {
                        record: record.clone(),
                        games: games.clone(),
                    })
                    .await;
            }
            Delta::Broadcast(frame) => hub.publish(frame.clone()),
        }
    }
}

#[cfg(test)]
#[path = "ingest_tests.rs"]
mod tests;
