// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::offset::MemoryOffsetSink;
use std::io::Write;
use tempfile::TempDir;

/// Short-interval polling config against a temp log.
fn test_config(path: PathBuf) -> TailerConfig {
    TailerConfig {
        path,
        poll_interval: Duration::from_millis(20),
        use_fsnotify: false,
        max_line_buffer: 256,
        stall_after: Duration::from_secs(300),
    }
}

fn append(path: &Path, content: &str) {
    let mut f = std::fs::OpenOptions::new().append(true).open(path).unwrap();
    write!(f, "{content}").unwrap();
    f.flush().unwrap();
}

async fn recv_event(rx: &mut mpsc::Receiver<TailEvent>) -> TailEvent {
    tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .expect("timed out waiting for tail event")
        .expect("tailer channel closed")
}

/// Drain events until a `Lines` batch arrives, collecting its lines.
async fn recv_lines(rx: &mut mpsc::Receiver<TailEvent>) -> Vec<String> {
    loop {
        if let TailEvent::Lines(lines) = recv_event(rx).await {
            return lines;
        }
    }
}

/// Collect `Lines` batches until `n` lines have arrived (a single append
/// may be observed across more than one poll).
async fn recv_n_lines(rx: &mut mpsc::Receiver<TailEvent>, n: usize) -> Vec<String> {
    let mut got = Vec::new();
    while got.len() < n {
        got.extend(recv_lines(rx).await);
    }
    got
}

#[tokio::test]
async fn emits_appended_lines_in_order() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);

    append(&log, "first\nsecond\n");
    let lines = recv_n_lines(&mut rx, 2).await;
    assert_eq!(lines, vec!["first", "second"]);

    append(&log, "third\n");
    let lines = recv_lines(&mut rx).await;
    assert_eq!(lines, vec!["third"]);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn partial_line_waits_for_newline() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);

    append(&log, "head");
    // No newline yet; nothing should be emitted.
    tokio::time::sleep(Duration::from_millis(80)).await;
    assert!(rx.try_recv().is_err());

    append(&log, "-tail\n");
    let lines = recv_lines(&mut rx).await;
    assert_eq!(lines, vec!["head-tail"]);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn truncation_emits_rotation_gap_and_rereads() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "old event line\n").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);

    let lines = recv_lines(&mut rx).await;
    assert_eq!(lines, vec!["old event line"]);

    // Truncate-and-rewrite, as the client does on restart.
    std::fs::write(&log, "new line\n").unwrap();

    let mut saw_gap = false;
    loop {
        match recv_event(&mut rx).await {
            TailEvent::RotationGap => saw_gap = true,
            TailEvent::Lines(lines) => {
                assert!(saw_gap, "RotationGap must precede post-rotation lines");
                assert_eq!(lines, vec!["new line"]);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    let _ = shutdown.send(());
}

#[cfg(unix)]
#[tokio::test]
async fn recreated_file_detected_by_identity() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "before\n").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);

    assert_eq!(recv_lines(&mut rx).await, vec!["before"]);

    // Replace with a *larger* file so size comparison alone can't catch it.
    std::fs::remove_file(&log).unwrap();
    std::fs::write(&log, "a much longer replacement line\n").unwrap();

    let mut saw_gap = false;
    loop {
        match recv_event(&mut rx).await {
            TailEvent::RotationGap => saw_gap = true,
            TailEvent::Lines(lines) => {
                assert!(saw_gap);
                assert_eq!(lines, vec!["a much longer replacement line"]);
                break;
            }
            other => panic!("unexpected event: {other:?}"),
        }
    }

    let _ = shutdown.send(());
}

#[tokio::test]
async fn oversized_partial_line_is_discarded() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    // max_line_buffer is 256 in test_config
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);

    append(&log, &"x".repeat(500));
    match recv_event(&mut rx).await {
        TailEvent::OversizedLine { discarded } => assert!(discarded >= 500),
        other => panic!("expected OversizedLine, got {other:?}"),
    }

    // Stream recovers on the next complete line.
    append(&log, "next\n");
    assert_eq!(recv_lines(&mut rx).await, vec!["next"]);

    let _ = shutdown.send(());
}

#[tokio::test]
async fn checkpoint_resumes_across_restart() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "one\ntwo\n").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), Arc::clone(&sink) as _, tx);

    assert_eq!(recv_n_lines(&mut rx, 2).await, vec!["one", "two"]);
    let _ = shutdown.send(());
    // Give the loop a moment to exit and write its final checkpoint.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let saved = sink.load(&log).await.expect("checkpoint saved");
    assert_eq!(saved.offset, 8);

    // Restart: only new content is emitted.
    append(&log, "three\n");
    let (tx, mut rx) = mpsc::channel(32);
    let shutdown = start_tailer(test_config(log.clone()), sink, tx);
    assert_eq!(recv_lines(&mut rx).await, vec!["three"]);

    let _ = shutdown.send(());
}
