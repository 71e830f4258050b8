// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Incremental log follower with rotation detection.
//!
//! Two interchangeable wake sources: filesystem notifications (preferred)
//! and an interval poll. Both feed the same read loop, so a missed notify
//! event is recovered on the next poll tick. Reads are framed on line
//! boundaries; a trailing partial line is buffered and prepended to the
//! next read.

use crate::identity::FileIdentity;
use crate::offset::{LogOffset, OffsetSink};
use chrono::Utc;
use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

/// Cap for the reopen-retry backoff after the file disappears.
const REOPEN_BACKOFF_CAP: Duration = Duration::from_secs(30);

/// Errors surfaced by path resolution and the tail loop.
#[derive(Debug, Error)]
pub enum TailError {
    #[error("log file not found: {path}")]
    PathMissing { path: PathBuf },

    #[error("log file exists but cannot be opened for reading: {path}")]
    PathUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("no platform default log path; pass --log-file-path")]
    NoPlatformDefault,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Output of the tail loop, delivered in file order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TailEvent {
    /// Complete lines (newline stripped), in order.
    Lines(Vec<String>),
    /// Bytes were lost across a rotation; downstream should reset
    /// per-session parse state.
    RotationGap,
    /// The buffered unterminated line exceeded the cap and was discarded.
    OversizedLine { discarded: usize },
    /// Reads have been failing for longer than the stall window.
    Stalled { since_secs: u64 },
}

/// Tailer settings, taken from the daemon [`Config`](mtgc_core::Config).
#[derive(Debug, Clone)]
pub struct TailerConfig {
    pub path: PathBuf,
    pub poll_interval: Duration,
    pub use_fsnotify: bool,
    /// Maximum buffered unterminated-line size before discarding.
    pub max_line_buffer: usize,
    /// Consecutive-failure window before a stall is reported.
    pub stall_after: Duration,
}

impl TailerConfig {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            poll_interval: Duration::from_secs(1),
            use_fsnotify: true,
            max_line_buffer: 1024 * 1024,
            stall_after: Duration::from_secs(300),
        }
    }
}

/// Start tailing. Returns a shutdown sender; dropping it also stops the
/// loop at its next suspension point.
pub fn start_tailer(
    config: TailerConfig,
    sink: Arc<dyn OffsetSink>,
    event_tx: mpsc::Sender<TailEvent>,
) -> oneshot::Sender<()> {
    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    tokio::spawn(tail_loop(config, sink, event_tx, shutdown_rx));
    shutdown_tx
}

/// Per-run tail state.
struct TailState {
    file: Option<File>,
    identity: Option<FileIdentity>,
    /// Where the next read starts.
    read_pos: u64,
    /// Trailing bytes after the last newline, prepended to the next read.
    partial: Vec<u8>,
    /// Last successful read (or loop start), for stall detection.
    last_success: Instant,
    /// Whether a stall has already been reported for the current outage.
    stall_reported: bool,
    /// Consecutive open/read failures, drives reopen backoff.
    failures: u32,
    next_retry_at: Instant,
}

impl TailState {
    fn new() -> Self {
        Self {
            file: None,
            identity: None,
            read_pos: 0,
            partial: Vec::new(),
            last_success: Instant::now(),
            stall_reported: false,
            failures: 0,
            next_retry_at: Instant::now(),
        }
    }

    /// Durable resume point: everything before the buffered partial line
    /// has been consumed.
    fn checkpoint_offset(&self) -> u64 {
        self.read_pos.saturating_sub(self.partial.len() as u64)
    }
}

async fn tail_loop(
    config: TailerConfig,
    sink: Arc<dyn OffsetSink>,
    event_tx: mpsc::Sender<TailEvent>,
    mut shutdown_rx: oneshot::Receiver<()>,
) {
    let mut state = TailState::new();

    // Resume from the recorded offset when the file identity still matches.
    if let Some(saved) = sink.load(&config.path).await {
        if let Ok(meta) = std::fs::metadata(&config.path) {
            let current = FileIdentity::of(&meta);
            if saved.identity == current && saved.offset <= meta.len() {
                state.read_pos = saved.offset;
                state.identity = Some(current);
                tracing::info!(
                    path = %config.path.display(),
                    offset = saved.offset,
                    "resuming from checkpoint"
                );
            } else {
                tracing::info!(path = %config.path.display(), "log rotated since last run");
                let _ = event_tx.send(TailEvent::RotationGap).await;
            }
        }
    }

    // Notify wake source; polling remains as the liveness fallback either
    // way, so a failed watcher init just means we poll.
    let (file_tx, mut file_rx) = mpsc::channel::<()>(32);
    let _watcher_guard = if config.use_fsnotify {
        match create_file_watcher(&config.path, file_tx) {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::debug!(error = %e, "file watcher failed, using polling only");
                None
            }
        }
    } else {
        None
    };

    loop {
        tokio::select! {
            Some(()) = file_rx.recv() => {
                poll_file(&config, &sink, &event_tx, &mut state).await;
            }

            () = tokio::time::sleep(config.poll_interval) => {
                poll_file(&config, &sink, &event_tx, &mut state).await;
            }

            _ = &mut shutdown_rx => {
                tracing::debug!(path = %config.path.display(), "tailer shutdown requested");
                break;
            }
        }
    }

    // Final checkpoint so restart resumes exactly here.
    checkpoint(&config, &sink, &state).await;
}

/// One wake: detect rotation, read the delta, emit lines.
async fn poll_file(
    config: &TailerConfig,
    sink: &Arc<dyn OffsetSink>,
    event_tx: &mpsc::Sender<TailEvent>,
    state: &mut TailState,
) {
    if Instant::now() < state.next_retry_at {
        return;
    }

    let meta = match std::fs::metadata(&config.path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            if state.file.take().is_some() {
                // Removed mid-run: treat as rotation, wait for recreation.
                tracing::warn!(path = %config.path.display(), "log file removed");
                state.identity = None;
                state.read_pos = 0;
                state.partial.clear();
                let _ = event_tx.send(TailEvent::RotationGap).await;
            }
            register_failure(config, event_tx, state).await;
            return;
        }
        Err(e) => {
            tracing::warn!(path = %config.path.display(), error = %e, "stat failed");
            register_failure(config, event_tx, state).await;
            return;
        }
    };

    let current_identity = FileIdentity::of(&meta);
    let current_size = meta.len();

    let rotated = match state.identity {
        Some(id) if id != current_identity => true,
        _ => current_size < state.read_pos,
    };
    if rotated {
        tracing::info!(
            path = %config.path.display(),
            old_offset = state.read_pos,
            new_size = current_size,
            "rotation detected"
        );
        state.file = None;
        state.read_pos = 0;
        state.partial.clear();
        let _ = event_tx.send(TailEvent::RotationGap).await;
    }
    state.identity = Some(current_identity);

    if current_size == state.read_pos {
        state.last_success = Instant::now();
        state.stall_reported = false;
        state.failures = 0;
        return;
    }

    match read_delta(config, state, current_size) {
        Ok(lines) => {
            state.last_success = Instant::now();
            state.stall_reported = false;
            state.failures = 0;

            if state.partial.len() > config.max_line_buffer {
                let discarded = state.partial.len();
                tracing::warn!(
                    discarded,
                    cap = config.max_line_buffer,
                    "unterminated line exceeded buffer cap, discarding"
                );
                state.partial.clear();
                let _ = event_tx.send(TailEvent::OversizedLine { discarded }).await;
            }

            if !lines.is_empty() {
                let _ = event_tx.send(TailEvent::Lines(lines)).await;
            }
            checkpoint(config, sink, state).await;
        }
        Err(e) => {
            tracing::warn!(path = %config.path.display(), error = %e, "read failed");
            state.file = None;
            register_failure(config, event_tx, state).await;
        }
    }
}

/// Read `[read_pos, size)` and split complete lines off the buffer.
fn read_delta(
    config: &TailerConfig,
    state: &mut TailState,
    size: u64,
) -> Result<Vec<String>, TailError> {
    if state.file.is_none() {
        let mut file = File::open(&config.path)?;
        file.seek(SeekFrom::Start(state.read_pos))?;
        state.file = Some(file);
    }
    let Some(file) = state.file.as_mut() else {
        return Ok(Vec::new());
    };

    let want = (size - state.read_pos) as usize;
    let mut buf = vec![0u8; want];
    let mut filled = 0;
    while filled < want {
        match file.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) => return Err(e.into()),
        }
    }
    buf.truncate(filled);
    state.read_pos += filled as u64;

    state.partial.extend_from_slice(&buf);

    let mut lines = Vec::new();
    while let Some(nl) = state.partial.iter().position(|&b| b == b'\n') {
        let mut line: Vec<u8> = state.partial.drain(..=nl).collect();
        line.pop(); // newline
        if line.last() == Some(&b'\r') {
            line.pop();
        }
        lines.push(String::from_utf8_lossy(&line).into_owned());
    }

    Ok(lines)
}

/// Record a failed wake: backoff and, past the window, report a stall.
async fn register_failure(
    config: &TailerConfig,
    event_tx: &mpsc::Sender<TailEvent>,
    state: &mut TailState,
) {
    state.failures += 1;
    let backoff = Duration::from_millis(
        100u64
            .saturating_mul(1u64 << state.failures.min(10))
            .min(REOPEN_BACKOFF_CAP.as_millis() as u64),
    );
    state.next_retry_at = Instant::now() + backoff;

    let outage = state.last_success.elapsed();
    if outage >= config.stall_after && !state.stall_reported {
        state.stall_reported = true;
        let _ = event_tx
            .send(TailEvent::Stalled {
                since_secs: outage.as_secs(),
            })
            .await;
    }
}

/// Persist the resume point; failures are logged, not fatal.
async fn checkpoint(config: &TailerConfig, sink: &Arc<dyn OffsetSink>, state: &TailState) {
    let Some(identity) = state.identity else {
        return;
    };
    let offset = LogOffset {
        path: config.path.clone(),
        identity,
        offset: state.checkpoint_offset(),
        last_read_at: Utc::now(),
    };
    if let Err(e) = sink.save(offset).await {
        tracing::warn!(error = %e, "offset checkpoint failed");
    }
}

fn create_file_watcher(
    path: &Path,
    tx: mpsc::Sender<()>,
) -> Result<RecommendedWatcher, notify::Error> {
    let mut watcher = notify::recommended_watcher(move |res: Result<notify::Event, _>| {
        if res.is_ok() {
            let _ = tx.blocking_send(());
        }
    })?;

    // Watch the parent directory so remove-and-recreate rotations still
    // produce wake events for the new file.
    let target = path.parent().unwrap_or(path);
    watcher.watch(target, RecursiveMode::NonRecursive)?;
    Ok(watcher)
}

#[cfg(test)]
#[path = "tailer_tests.rs"]
mod tests;
