// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::Store;

#[tokio::test]
async fn fresh_store_is_at_latest_version() {
    let store = Store::in_memory().await.unwrap();
    assert_eq!(store.current_version().await.unwrap(), latest_version());
}

#[tokio::test]
async fn apply_to_current_version_is_a_noop() {
    let store = Store::in_memory().await.unwrap();
    let before = store.current_version().await.unwrap();

    store.apply_migrations(before).await.unwrap();

    assert_eq!(store.current_version().await.unwrap(), before);
    // Data tables still usable after the no-op.
    assert_eq!(store.event_count().await.unwrap(), 0);
}

#[tokio::test]
async fn down_migrations_step_back() {
    let store = Store::in_memory().await.unwrap();

    store.apply_migrations(1).await.unwrap();
    assert_eq!(store.current_version().await.unwrap(), 1);

    // matches table is gone below version 2.
    let result = store.match_count().await;
    assert!(result.is_err());

    // And events (version 1) still exists.
    assert_eq!(store.event_count().await.unwrap(), 0);

    store.apply_migrations(latest_version()).await.unwrap();
    assert_eq!(store.match_count().await.unwrap(), 0);
}

#[tokio::test]
async fn unknown_target_version_is_rejected() {
    let store = Store::in_memory().await.unwrap();
    let result = store.apply_migrations(99).await;
    assert!(matches!(result, Err(StoreError::UnknownVersion(99))));
}

#[tokio::test]
async fn dirty_flag_blocks_migration_and_force_clears_it() {
    let store = Store::in_memory().await.unwrap();

    sqlx::query("UPDATE schema_version SET dirty = 1")
        .execute(store.pool())
        .await
        .unwrap();

    let result = store.apply_migrations(latest_version()).await;
    assert!(matches!(result, Err(StoreError::MigrationDirty { .. })));

    store.force_version(latest_version()).await.unwrap();
    let (version, dirty) = store.schema_state().await.unwrap();
    assert_eq!(version, latest_version());
    assert!(!dirty);

    store.apply_migrations(latest_version()).await.unwrap();
}

#[test]
fn registry_versions_are_contiguous_from_one() {
    for (i, migration) in registry().iter().enumerate() {
        assert_eq!(migration.version, i as i64 + 1);
        assert!(!migration.up.trim().is_empty());
        assert!(!migration.down.trim().is_empty());
    }
}
