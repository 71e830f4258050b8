//! Shared fixtures for the end-to-end specs.

use mtgc_core::{CardRating, Frame};
use std::path::Path;
use std::time::Duration;

/// Append raw text to a log file (no newline added).
pub fn append_raw(path: &Path, content: &str) {
    use std::io::Write;
    let mut f = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .unwrap();
    write!(f, "{content}").unwrap();
    f.flush().unwrap();
}

/// A rating row with the given GIHWR.
pub fn rating(set: &str, format: &str, arena_id: i64, name: &str, gihwr: f64) -> CardRating {
    CardRating {
        set_code: set.to_string(),
        format: format.to_string(),
        arena_id,
        card_name: name.to_string(),
        gihwr,
        ohwr: 0.0,
        alsa: 0.0,
        ata: 0.0,
        games_in_hand: 10_000,
        games_played: 25_000,
        num_decks: 800,
        cached_at: chrono::Utc::now(),
    }
}

/// Frame identity for comparisons that ignore timestamps.
pub fn frame_key(frame: &Frame) -> (String, serde_json::Value) {
    (frame.kind.as_str().to_string(), frame.data.clone())
}

/// Await with the standard scenario deadline.
pub async fn within<T>(fut: impl std::future::Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), fut)
        .await
        .expect("scenario deadline exceeded")
}
