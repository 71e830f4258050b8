//! Rotation resume: events survive truncate-and-rewrite with an explicit
//! gap signal and a correct post-rotation checkpoint.

use crate::prelude::*;
use mtgc_core::FakeClock;
use mtgc_parser::{Parser, ParserConfig};
use mtgc_tailer::{start_tailer, MemoryOffsetSink, OffsetSink, TailEvent, TailerConfig};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::sync::mpsc;

fn tail_config(path: std::path::PathBuf) -> TailerConfig {
    TailerConfig {
        path,
        poll_interval: Duration::from_millis(20),
        use_fsnotify: false,
        max_line_buffer: 1024 * 1024,
        stall_after: Duration::from_secs(300),
    }
}

#[tokio::test]
async fn rotation_resume_emits_gap_between_events() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");

    // One complete event, padded to exactly 1,000 bytes.
    let first = r#"==> MatchBegin {"MatchId": "m-before-rotation"}"#;
    let padding = "x".repeat(1000 - first.len() - 2);
    std::fs::write(&log, format!("{first}\n{padding}\n")).unwrap();
    assert_eq!(std::fs::metadata(&log).unwrap().len(), 1000);

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tail_tx, mut tail_rx) = mpsc::channel(64);
    let shutdown = start_tailer(tail_config(log.clone()), Arc::clone(&sink) as _, tail_tx);

    let mut parser = Parser::new(ParserConfig::default(), FakeClock::default());
    let mut emitted = Vec::new();
    let mut gaps = 0;

    // Drive until the first event arrives.
    while emitted.is_empty() {
        match within(tail_rx.recv()).await.unwrap() {
            TailEvent::Lines(lines) => emitted.extend(parser.push_lines(&lines)),
            TailEvent::RotationGap => {
                parser.note_rotation();
                gaps += 1;
            }
            _ => {}
        }
    }
    assert_eq!(emitted.len(), 1);
    assert_eq!(gaps, 0);

    // Writer truncates to zero and writes a new 500-byte event.
    let second = r#"==> MatchBegin {"MatchId": "m-after-rotation"}"#;
    let padding = "y".repeat(500 - second.len() - 2);
    std::fs::write(&log, format!("{second}\n{padding}\n")).unwrap();
    assert_eq!(std::fs::metadata(&log).unwrap().len(), 500);

    // Expect: RotationGap, then the second event.
    while emitted.len() < 2 {
        match within(tail_rx.recv()).await.unwrap() {
            TailEvent::Lines(lines) => {
                assert_eq!(gaps, 1, "gap must precede post-rotation lines");
                emitted.extend(parser.push_lines(&lines));
            }
            TailEvent::RotationGap => {
                parser.note_rotation();
                gaps += 1;
            }
            _ => {}
        }
    }

    assert_eq!(emitted[0].payload["MatchId"], "m-before-rotation");
    assert_eq!(emitted[1].payload["MatchId"], "m-after-rotation");

    // Offset checkpoint after the rotation read: 500.
    let _ = shutdown.send(());
    tokio::time::sleep(Duration::from_millis(50)).await;
    let saved = sink.load(&log).await.expect("checkpoint recorded");
    assert_eq!(saved.offset, 500);
}

#[tokio::test]
async fn empty_delta_produces_no_events() {
    let dir = TempDir::new().unwrap();
    let log = dir.path().join("Player.log");
    std::fs::write(&log, "").unwrap();

    let sink = Arc::new(MemoryOffsetSink::default());
    let (tail_tx, mut tail_rx) = mpsc::channel(64);
    let shutdown = start_tailer(tail_config(log.clone()), sink, tail_tx);

    // Touch the file without appending anything.
    append_raw(&log, "");
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(tail_rx.try_recv().is_err());

    let _ = shutdown.send(());
}
