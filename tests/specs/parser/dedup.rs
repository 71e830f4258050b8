//! Duplicate suppression within the parser window, and idempotence at
//! the store layer behind it.

use mtgc_core::{FakeClock, LogEventKind};
use mtgc_parser::{Parser, ParserConfig};
use mtgc_store::Store;

#[test]
fn identical_event_twice_emits_once_and_counts() {
    let mut parser = Parser::new(ParserConfig::default(), FakeClock::default());
    let line = r#"==> InventoryInfo {"Gems": 1200, "Gold": 5400}"#;

    let first = parser.push_line(line);
    let second = parser.push_line(line);

    assert_eq!(first.len(), 1);
    assert!(second.is_empty());
    assert_eq!(parser.metrics().duplicates_suppressed, 1);
}

#[test]
fn interleaved_distinct_events_all_pass() {
    let mut parser = Parser::new(ParserConfig::default(), FakeClock::default());

    let a = parser.push_line(r#"==> RankUpdate {"RankAfter": "Gold 1"}"#);
    let b = parser.push_line(r#"==> RankUpdate {"RankAfter": "Gold 2"}"#);
    let c = parser.push_line(r#"==> RankUpdate {"RankAfter": "Gold 1"}"#);

    assert_eq!(a.len() + b.len(), 2);
    // Exact repeat of the first payload within the window is suppressed.
    assert!(c.is_empty());
}

#[tokio::test]
async fn store_insert_is_idempotent_past_the_window() {
    let store = Store::in_memory().await.unwrap();
    let event = mtgc_core::test_support::log_event(
        LogEventKind::RankUpdate,
        42,
        serde_json::json!({"RankAfter": "Platinum 4"}),
    );

    assert!(store.record_event(&event).await.unwrap());
    assert!(!store.record_event(&event).await.unwrap());
    assert_eq!(store.event_count().await.unwrap(), 1);
}
