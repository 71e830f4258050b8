//! Replay determinism: the same log file, replayed twice with
//! `clear_data`, yields the same store state and frame sequence
//! (timestamps aside).

use crate::prelude::*;
use mtgc_core::test_support::SeqIdGen;
use mtgc_core::{FakeClock, FrameKind, LogEvent};
use mtgc_daemon::adapters::CachedRatings;
use mtgc_daemon::bus::Hub;
use mtgc_daemon::ingest;
use mtgc_daemon::replay::ReplayController;
use mtgc_daemon::Command;
use mtgc_engine::{MachineSnapshot, RatingCache, SessionMachine};
use mtgc_parser::ParserConfig;
use mtgc_store::{spawn_writer, Store};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, watch};

const FIXTURE: &str = concat!(
    r#"==> DraftPack {"SetCode": "BLB", "DraftType": "PremierDraft", "EventName": "PremierDraft_BLB", "PackNumber": 1, "PickNumber": 1, "PackCards": [101, 102, 103, 104]}"#,
    "\n",
    "free text the parser must ignore\n",
    r#"==> DraftMakePick {"SetCode": "BLB", "EventName": "PremierDraft_BLB", "PackNumber": 1, "PickNumber": 1, "CardId": 103}"#,
    "\n",
    r#"==> DraftPack {"SetCode": "BLB", "DraftType": "PremierDraft", "EventName": "PremierDraft_BLB", "PackNumber": 1, "PickNumber": 2, "PackCards": [102, 104]}"#,
    "\n",
    r#"==> DraftMakePick {"SetCode": "BLB", "EventName": "PremierDraft_BLB", "PackNumber": 1, "PickNumber": 2, "CardId": 102}"#,
    "\n",
    r#"==> DraftComplete {"Wins": 5, "Losses": 2}"#,
    "\n",
    r#"==> MatchBegin {"MatchId": "m-replay", "EventId": "evt-9", "EventName": "PremierDraft_BLB", "Format": "PremierDraft"}"#,
    "\n",
    r#"==> GameResult {"MatchId": "m-replay", "GameNumber": 1, "Result": "win", "DurationSeconds": 300, "Reason": "Game.Concede"}"#,
    "\n",
    r#"==> MatchComplete {"MatchId": "m-replay", "Reason": "Match.Complete", "DurationSeconds": 420}"#,
    "\n",
);

/// Everything observable about persisted session state, timestamps
/// excluded.
#[derive(Debug, PartialEq)]
struct StoreDigest {
    sessions: Vec<(String, String, String, Option<u32>, Option<u32>, Option<String>)>,
    picks: Vec<(u32, u32, i64, Option<String>)>,
    packs: Vec<(u32, u32, Vec<i64>)>,
    matches: Vec<(String, String, u32, u32)>,
    event_rows: i64,
}

async fn digest(store: &Store) -> StoreDigest {
    let now = chrono::Utc::now() + chrono::Duration::days(1);
    let sessions = store
        .draft_sessions_in_range(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH, now)
        .await
        .unwrap();

    let mut picks = Vec::new();
    let mut packs = Vec::new();
    for session in &sessions {
        for pick in store.picks_for_session(&session.session_id).await.unwrap() {
            picks.push((
                pick.pack_number,
                pick.pick_number,
                pick.card_id,
                pick.grade.map(|g| g.as_str().to_string()),
            ));
        }
        for pack in store.packs_for_session(&session.session_id).await.unwrap() {
            packs.push((pack.pack_number, pack.pick_number, pack.card_ids));
        }
    }

    let matches = store
        .matches_in_range(chrono::DateTime::<chrono::Utc>::UNIX_EPOCH, now)
        .await
        .unwrap()
        .into_iter()
        .map(|m| {
            (
                m.match_id.as_str().to_string(),
                m.result.as_str().to_string(),
                m.player_wins,
                m.opponent_wins,
            )
        })
        .collect();

    StoreDigest {
        sessions: sessions
            .into_iter()
            .map(|s| {
                (
                    s.session_id.as_str().to_string(),
                    s.set_code,
                    s.status.as_str().to_string(),
                    s.wins,
                    s.losses,
                    s.overall_grade.map(|g| g.as_str().to_string()),
                )
            })
            .collect(),
        picks,
        packs,
        matches,
        event_rows: store.event_count().await.unwrap(),
    }
}

/// One replay run against `store`; returns the observed frame sequence.
async fn run_replay(store: Store, log: &Path) -> Vec<(String, serde_json::Value)> {
    let clock = FakeClock::default();
    let cache = Arc::new(RatingCache::new(256, Duration::ZERO, clock.clone()));
    let machine = SessionMachine::new(
        clock.clone(),
        SeqIdGen::new(),
        CachedRatings::new(cache, store.clone()),
        Duration::from_secs(3600),
    );

    let writer = spawn_writer(store.clone(), Duration::from_millis(10), 1024);
    let hub = Hub::new(4096);
    let (_sub_id, queue) = hub.subscribe_with_capacity(4096);

    let (event_tx, event_rx) = mpsc::channel::<LogEvent>(256);
    let (snapshot_tx, _snapshot_rx) = watch::channel(MachineSnapshot::default());
    let machine_task = ingest::spawn_machine_task(
        machine,
        event_rx,
        writer.sender(),
        hub.clone(),
        snapshot_tx,
    );

    let (command_tx, command_rx) = mpsc::channel::<Command>(16);
    let controller = ReplayController::new(
        store.clone(),
        event_tx,
        ParserConfig::default(),
        clock,
    );
    let controller_task = tokio::spawn(controller.run(command_rx));

    command_tx
        .send(Command::ReplayLogs {
            file_paths: vec![log.to_path_buf()],
            speed: None,
            filter: Vec::new(),
            pause_on_draft: false,
            clear_data: true,
        })
        .await
        .unwrap();
    command_tx.send(Command::StartReplay).await.unwrap();

    // Collect frames until the terminal stats:updated after the match.
    let mut frames = Vec::new();
    loop {
        let frame = within(queue.next()).await.unwrap();
        let done = frame.kind == FrameKind::StatsUpdated;
        frames.push(frame_key(&frame));
        if done {
            break;
        }
    }

    // Orderly teardown so every queued write lands before digesting.
    drop(command_tx);
    let _ = controller_task.await;
    let _ = machine_task.await;
    writer.shutdown(Duration::from_secs(2)).await;

    frames
}

#[tokio::test]
async fn two_replays_of_one_file_are_identical() {
    let dir = tempfile::TempDir::new().unwrap();
    let log = dir.path().join("historical.log");
    std::fs::write(&log, FIXTURE).unwrap();

    let store = Store::in_memory().await.unwrap();
    store
        .replace_ratings(
            "BLB",
            "PremierDraft",
            &[
                rating("BLB", "PremierDraft", 101, "Alpha", 58.5),
                rating("BLB", "PremierDraft", 102, "Beta", 54.0),
                rating("BLB", "PremierDraft", 103, "Gamma", 51.0),
                rating("BLB", "PremierDraft", 104, "Delta", 49.0),
            ],
        )
        .await
        .unwrap();

    let frames_one = run_replay(store.clone(), &log).await;
    let digest_one = digest(&store).await;

    let frames_two = run_replay(store.clone(), &log).await;
    let digest_two = digest(&store).await;

    assert_eq!(frames_one, frames_two);
    assert_eq!(digest_one, digest_two);

    // Sanity on the content itself.
    assert_eq!(digest_one.sessions.len(), 1);
    assert_eq!(digest_one.picks.len(), 2);
    assert_eq!(digest_one.matches.len(), 1);
    let kinds: Vec<&str> = frames_one.iter().map(|(k, _)| k.as_str()).collect();
    assert_eq!(
        kinds,
        vec![
            "draft:started",
            "draft:pick",
            "draft:updated",
            "draft:pick",
            "draft:completed",
            "match:begin",
            "match:complete",
            "stats:updated",
        ]
    );
}
