//! Fan-out under a slow consumer.

use crate::prelude::*;
use mtgc_core::{Frame, FrameKind};
use mtgc_daemon::bus::Hub;
use std::time::Duration;

fn frame(n: u64) -> Frame {
    Frame::new(
        FrameKind::StatsUpdated,
        serde_json::json!({ "n": n }),
        chrono::Utc::now(),
    )
}

#[tokio::test]
async fn slow_subscriber_cannot_hold_back_a_fast_one() {
    let hub = Hub::new(256);
    let (_fast_id, fast) = hub.subscribe_with_capacity(2048);
    // The slow subscriber is paused (never drained) with capacity 16.
    let (_slow_id, slow) = hub.subscribe_with_capacity(16);

    let publish_start = std::time::Instant::now();
    for n in 0..1000 {
        hub.publish(frame(n));
    }
    let publish_elapsed = publish_start.elapsed();
    // Publishing is non-blocking regardless of the paused subscriber.
    assert!(publish_elapsed < Duration::from_secs(1));

    // Fast subscriber: all 1,000 in publish order.
    let mut fast_got = Vec::with_capacity(1000);
    for _ in 0..1000 {
        fast_got.push(within(fast.next()).await.unwrap().data["n"].as_u64().unwrap());
    }
    assert_eq!(fast_got, (0..1000).collect::<Vec<_>>());

    // Let the dispatcher finish before inspecting the slow queue.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Slow subscriber: at most 16 frames, all from the newest tail.
    let mut slow_got = Vec::new();
    for _ in 0..16 {
        slow_got.push(within(slow.next()).await.unwrap().data["n"].as_u64().unwrap());
    }
    assert!(slow_got.iter().all(|&n| n >= 984));

    let stats = hub.stats();
    assert!(stats.slow_client_drops >= 984);
}

#[tokio::test]
async fn each_subscriber_sees_a_subsequence_of_publish_order() {
    let hub = Hub::new(256);
    let (_a_id, a) = hub.subscribe_with_capacity(8);
    let (_b_id, b) = hub.subscribe_with_capacity(64);

    for n in 0..200 {
        hub.publish(frame(n));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    for queue in [&a, &b] {
        let mut got = Vec::new();
        while let Ok(Some(frame)) =
            tokio::time::timeout(Duration::from_millis(50), queue.next()).await
        {
            got.push(frame.data["n"].as_u64().unwrap());
            if got.len() >= 200 {
                break;
            }
        }
        let mut sorted = got.clone();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(got, sorted, "delivery must preserve publish order");
    }
}
