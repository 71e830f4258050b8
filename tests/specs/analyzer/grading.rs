//! Pick grading against the real store behind the cache.

use crate::prelude::*;
use mtgc_core::{FakeClock, Grade};
use mtgc_daemon::adapters::CachedRatings;
use mtgc_engine::{PickGrader, RatingCache};
use mtgc_store::Store;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn third_best_pick_grades_a_with_ranked_alternatives() {
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

    let cache = Arc::new(RatingCache::new(
        64,
        Duration::from_secs(3600),
        FakeClock::default(),
    ));
    let grader = PickGrader::new(CachedRatings::new(Arc::clone(&cache), store));

    let quality = grader
        .grade_pick("BLB", "PremierDraft", &[101, 102, 103, 104], 103)
        .await
        .unwrap()
        .expect("ratings available");

    assert_eq!(quality.rank, 3);
    assert_eq!(quality.grade, Grade::A);
    assert!((quality.pack_best_gihwr - 58.5).abs() < f64::EPSILON);
    assert!((quality.picked_card_gihwr - 51.0).abs() < f64::EPSILON);

    let alts: Vec<(i64, f64, usize)> = quality
        .alternatives
        .iter()
        .map(|a| (a.card_id, a.gihwr, a.rank))
        .collect();
    assert_eq!(alts, vec![(101, 58.5, 1), (102, 54.0, 2), (104, 49.0, 4)]);

    // Second grading of the same pack is served from the cache.
    let _ = grader
        .grade_pick("BLB", "PremierDraft", &[101, 102, 103, 104], 101)
        .await
        .unwrap();
    assert_eq!(cache.stats().hits, 4);
}

#[tokio::test]
async fn grading_is_deterministic_across_runs() {
    let store = Store::in_memory().await.unwrap();
    store
        .replace_ratings(
            "BLB",
            "PremierDraft",
            &[
                rating("BLB", "PremierDraft", 1, "Twin A", 52.0),
                rating("BLB", "PremierDraft", 2, "Twin B", 52.0),
                rating("BLB", "PremierDraft", 3, "Filler", 45.0),
            ],
        )
        .await
        .unwrap();

    let cache = Arc::new(RatingCache::new(
        64,
        Duration::from_secs(3600),
        FakeClock::default(),
    ));
    let grader = PickGrader::new(CachedRatings::new(cache, store));

    let first = grader
        .grade_pick("BLB", "PremierDraft", &[1, 2, 3], 3)
        .await
        .unwrap()
        .unwrap();
    let second = grader
        .grade_pick("BLB", "PremierDraft", &[1, 2, 3], 3)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(first, second);
    // Equal GIHWR breaks by name: "Twin A" outranks "Twin B".
    assert_eq!(first.alternatives[0].card_name, "Twin A");
}
