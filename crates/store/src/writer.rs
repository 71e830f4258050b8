// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-writer task with group commit.
//!
//! Components queue [`WriteOp`] intents; the writer drains everything that
//! arrives within the collect window into one transaction. This bounds
//! write amplification during event bursts (client startup floods the log)
//! while keeping the store the only component that mutates persistent
//! state.

use crate::offsets::{exec_set_offset, OffsetRow};
use crate::{drafts, events, matches, Store, StoreError};
use mtgc_core::{DraftSession, GameRecord, LogEvent, MatchRecord, PackRow, PickRow};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Retries for a busy database before the batch is dropped.
const BUSY_RETRIES: u32 = 5;

/// A queued write intent.
#[derive(Debug, Clone)]
pub enum WriteOp {
    Event(LogEvent),
    UpsertMatch {
        record: MatchRecord,
        games: Vec<GameRecord>,
    },
    UpsertDraftSession(DraftSession),
    UpsertPack(PackRow),
    UpsertPick(PickRow),
    SaveOffset(OffsetRow),
}

/// Handle to the running writer task.
pub struct WriterHandle {
    tx: mpsc::Sender<WriteOp>,
    handle: JoinHandle<()>,
}

impl WriterHandle {
    /// Sender for queueing write intents.
    pub fn sender(&self) -> mpsc::Sender<WriteOp> {
        self.tx.clone()
    }

    /// Close the queue and wait for the writer to drain, up to `deadline`.
    pub async fn shutdown(self, deadline: Duration) {
        drop(self.tx);
        if tokio::time::timeout(deadline, self.handle).await.is_err() {
            tracing::warn!("store writer did not drain within deadline");
        }
    }
}

/// Spawn the writer task.
pub fn spawn_writer(store: Store, batch_window: Duration, queue_capacity: usize) -> WriterHandle {
    let (tx, rx) = mpsc::channel(queue_capacity);
    let handle = tokio::spawn(writer_loop(store, rx, batch_window));
    WriterHandle { tx, handle }
}

async fn writer_loop(store: Store, mut rx: mpsc::Receiver<WriteOp>, batch_window: Duration) {
    while let Some(first) = rx.recv().await {
        let mut batch = vec![first];

        // Collect everything that arrives within the window.
        let window = tokio::time::sleep(batch_window);
        tokio::pin!(window);
        loop {
            tokio::select! {
                () = &mut window => break,
                more = rx.recv() => match more {
                    Some(op) => batch.push(op),
                    None => break,
                },
            }
        }

        commit_with_retry(&store, &batch).await;
    }
    tracing::debug!("store writer queue closed");
}

/// Apply one batch, retrying a busy database with bounded backoff.
async fn commit_with_retry(store: &Store, batch: &[WriteOp]) {
    let mut delay = Duration::from_millis(25);
    for attempt in 0..=BUSY_RETRIES {
        match apply_batch(store, batch).await {
            Ok(()) => {
                tracing::trace!(ops = batch.len(), "write batch committed");
                return;
            }
            Err(e) if is_busy(&e) && attempt < BUSY_RETRIES => {
                tracing::debug!(attempt, error = %e, "database busy, retrying batch");
                tokio::time::sleep(delay).await;
                delay *= 2;
            }
            Err(e) => {
                tracing::error!(ops = batch.len(), error = %e, "write batch failed, dropping");
                return;
            }
        }
    }
}

async fn apply_batch(store: &Store, batch: &[WriteOp]) -> Result<(), StoreError> {
    let mut tx = store.pool().begin().await?;
    for op in batch {
        match op {
            WriteOp::Event(event) => {
                events::exec_record_event(&mut tx, event).await?;
            }
            WriteOp::UpsertMatch { record, games } => {
                matches::exec_upsert_match(&mut tx, record, games).await?;
            }
            WriteOp::UpsertDraftSession(session) => {
                drafts::exec_upsert_session(&mut tx, session).await?;
            }
            WriteOp::UpsertPack(pack) => {
                drafts::exec_upsert_pack(&mut tx, pack).await?;
            }
            WriteOp::UpsertPick(pick) => {
                drafts::exec_upsert_pick(&mut tx, pick).await?;
            }
            WriteOp::SaveOffset(row) => {
                exec_set_offset(&mut tx, row).await?;
            }
        }
    }
    tx.commit().await?;
    Ok(())
}

fn is_busy(error: &StoreError) -> bool {
    match error {
        StoreError::Sqlx(sqlx::Error::Database(db)) => {
            let code = db.code();
            matches!(code.as_deref(), Some("5") | Some("6") | Some("517"))
        }
        StoreError::Busy => true,
        _ => false,
    }
}

#[cfg(test)]
#[path = "writer_tests.rs"]
mod tests;
