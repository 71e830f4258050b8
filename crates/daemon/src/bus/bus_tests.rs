// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use chrono::Utc;
use mtgc_core::FrameKind;
use serde_json::json;
use std::time::Duration;

fn frame(n: u64) -> Frame {
    Frame::new(FrameKind::StatsUpdated, json!({ "n": n }), Utc::now())
}

async fn drain_n(queue: &SubscriberQueue, n: usize) -> Vec<u64> {
    let mut got = Vec::with_capacity(n);
    for _ in 0..n {
        let frame = tokio::time::timeout(Duration::from_secs(2), queue.next())
            .await
            .expect("timed out")
            .expect("queue closed");
        got.push(frame.data["n"].as_u64().unwrap());
    }
    got
}

#[tokio::test]
async fn subscriber_receives_frames_in_publish_order() {
    let hub = Hub::new(64);
    let (_id, queue) = hub.subscribe();

    for n in 0..10 {
        hub.publish(frame(n));
    }

    assert_eq!(drain_n(&queue, 10).await, (0..10).collect::<Vec<_>>());
}

#[tokio::test]
async fn slow_subscriber_never_delays_a_fast_one() {
    let hub = Hub::new(64);
    // Fast: queue deep enough that a prompt reader never overflows.
    let (_fast_id, fast) = hub.subscribe_with_capacity(2048);
    // Slow: paused reader with a 16-frame queue.
    let (_slow_id, slow) = hub.subscribe_with_capacity(16);

    for n in 0..1000 {
        hub.publish(frame(n));
    }

    // Fast subscriber receives all 1,000 in order.
    let fast_got = drain_n(&fast, 1000).await;
    assert_eq!(fast_got, (0..1000).collect::<Vec<_>>());

    // Give the dispatcher time to finish fanning out.
    tokio::time::sleep(Duration::from_millis(100)).await;

    // Slow subscriber holds at most 16 frames, and they are the newest.
    let slow_got = drain_n(&slow, 16).await;
    assert_eq!(slow_got.len(), 16);
    assert!(slow_got.iter().all(|&n| n >= 984));
    assert!(hub.stats().slow_client_drops >= 984);
}

#[tokio::test]
async fn fast_subscriber_capacity_is_not_a_global_limit() {
    let hub = Hub::new(2048);
    let (_id, queue) = hub.subscribe();

    for n in 0..1000 {
        hub.publish(frame(n));
    }

    let got = drain_n(&queue, 1000).await;
    assert_eq!(got.len(), 1000);
    assert_eq!(got, (0..1000).collect::<Vec<_>>());
    assert_eq!(hub.stats().slow_client_drops, 0);
}

#[tokio::test]
async fn unsubscribe_closes_the_queue() {
    let hub = Hub::new(8);
    let (id, queue) = hub.subscribe();

    hub.publish(frame(1));
    tokio::time::sleep(Duration::from_millis(50)).await;
    hub.unsubscribe(id);

    // Remaining frame drains, then the queue reports closed.
    assert!(queue.next().await.is_some());
    assert!(queue.next().await.is_none());
    assert_eq!(hub.stats().subscribers, 0);
}

#[tokio::test]
async fn delivery_is_a_subsequence_of_publish_order() {
    let hub = Hub::new(64);
    let (_id, queue) = hub.subscribe_with_capacity(4);

    for n in 0..100 {
        hub.publish(frame(n));
    }
    tokio::time::sleep(Duration::from_millis(100)).await;

    let got = drain_n(&queue, 4).await;
    let mut sorted = got.clone();
    sorted.sort_unstable();
    assert_eq!(got, sorted, "frames must stay in publish order");
}

#[tokio::test]
async fn stats_count_published_frames() {
    let hub = Hub::new(8);
    hub.publish(frame(1));
    hub.publish(frame(2));
    assert_eq!(hub.stats().published, 2);
}
