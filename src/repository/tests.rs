//! Store Contract Tests
//!
//! The same suite runs against the in-memory and the SQLite store, so
//! both implementations honor the contract the engine relies on.

use chrono::Duration;

use crate::domain::{utc_now_secs, Item, ItemType};

use super::{ItemStore, MemoryItemStore, SqliteItemStore};

fn sample(id: &str, owner: &str) -> Item {
    Item::new(id, owner, ItemType::Task, "Test item", utc_now_secs())
}

async fn check_create_and_get(store: &dyn ItemStore) {
    let item = sample("t_create", "owner-1");
    store.create(&item).await.expect("create failed");

    let found = store.get("t_create", "owner-1").await.expect("get failed");
    let stored = found.expect("item missing");
    assert_eq!(stored.item, item);
    assert_eq!(stored.version, 1);

    // Other partitions can't see it
    let other = store.get("t_create", "owner-2").await.expect("get failed");
    assert!(other.is_none());
}

async fn check_duplicate_create(store: &dyn ItemStore) {
    let item = sample("t_dup", "owner-1");
    store.create(&item).await.expect("create failed");
    let err = store.create(&item).await.expect_err("duplicate accepted");
    assert_eq!(err.code(), "already_exists");
}

async fn check_replace_bumps_version(store: &dyn ItemStore) {
    let mut item = sample("t_rep", "owner-1");
    store.create(&item).await.expect("create failed");

    item.title = "Renamed".to_string();
    store.replace(&item, 1).await.expect("replace failed");

    let stored = store
        .get("t_rep", "owner-1")
        .await
        .expect("get failed")
        .expect("item missing");
    assert_eq!(stored.item.title, "Renamed");
    assert_eq!(stored.version, 2);
}

async fn check_replace_conflicts_on_stale_version(store: &dyn ItemStore) {
    let item = sample("t_conflict", "owner-1");
    store.create(&item).await.expect("create failed");
    store.replace(&item, 1).await.expect("replace failed");

    let err = store.replace(&item, 1).await.expect_err("stale accepted");
    assert_eq!(err.code(), "conflict");

    let err = store
        .replace(&sample("t_ghost", "owner-1"), 1)
        .await
        .expect_err("replace of absent item accepted");
    assert_eq!(err.code(), "not_found");
}

async fn check_delete_is_idempotent(store: &dyn ItemStore) {
    let item = sample("t_del", "owner-1");
    store.create(&item).await.expect("create failed");

    assert!(store.delete("t_del", "owner-1").await.expect("delete failed"));
    assert!(!store.delete("t_del", "owner-1").await.expect("delete failed"));
    assert!(store
        .get("t_del", "owner-1")
        .await
        .expect("get failed")
        .is_none());
}

async fn check_changed_since_watermark(store: &dyn ItemStore) {
    let t0 = utc_now_secs();
    let mut old = sample("t_old", "owner-1");
    old.updated_at = t0 - Duration::seconds(10);
    let mut fresh = sample("t_fresh", "owner-1");
    fresh.updated_at = t0 + Duration::seconds(1);
    let mut foreign = sample("t_foreign", "owner-2");
    foreign.updated_at = t0 + Duration::seconds(1);

    store.create(&old).await.expect("create failed");
    store.create(&fresh).await.expect("create failed");
    store.create(&foreign).await.expect("create failed");

    let changed = store
        .changed_since("owner-1", t0)
        .await
        .expect("changed_since failed");
    assert_eq!(changed.len(), 1);
    assert_eq!(changed[0].id, "t_fresh");

    // Exactly-at-watermark items are not new
    let at_mark = store
        .changed_since("owner-1", t0 + Duration::seconds(1))
        .await
        .expect("changed_since failed");
    assert!(at_mark.is_empty());
}

async fn check_list_by_owner_is_scoped(store: &dyn ItemStore) {
    store
        .create(&sample("t_a", "owner-1"))
        .await
        .expect("create failed");
    store
        .create(&sample("t_b", "owner-1"))
        .await
        .expect("create failed");
    store
        .create(&sample("t_c", "owner-2"))
        .await
        .expect("create failed");

    let mine = store.list_by_owner("owner-1").await.expect("list failed");
    assert_eq!(mine.len(), 2);
    assert!(mine.iter().all(|item| item.owner_id == "owner-1"));
}

async fn run_contract_suite<S: ItemStore, F: Fn() -> S>(make_store: F) {
    check_create_and_get(&make_store()).await;
    check_duplicate_create(&make_store()).await;
    check_replace_bumps_version(&make_store()).await;
    check_replace_conflicts_on_stale_version(&make_store()).await;
    check_delete_is_idempotent(&make_store()).await;
    check_changed_since_watermark(&make_store()).await;
    check_list_by_owner_is_scoped(&make_store()).await;
}

#[tokio::test]
async fn test_memory_store_contract() {
    run_contract_suite(MemoryItemStore::new).await;
}

#[tokio::test]
async fn test_sqlite_store_contract() {
    run_contract_suite(|| SqliteItemStore::open_in_memory().expect("Failed to init test DB")).await;
}

#[tokio::test]
async fn test_sqlite_preserves_unmodeled_fields() {
    let store = SqliteItemStore::open_in_memory().expect("Failed to init test DB");
    let mut item = sample("t_extra", "owner-1");
    item.extra
        .insert("goal_ids".to_string(), serde_json::json!(["g_x"]));
    store.create(&item).await.expect("create failed");

    let stored = store
        .get("t_extra", "owner-1")
        .await
        .expect("get failed")
        .expect("item missing");
    assert_eq!(stored.item.extra["goal_ids"], serde_json::json!(["g_x"]));
}
