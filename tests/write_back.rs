mod common;

use std::time::Duration;

use common::{harness, harness_with, test_config};
use saloonkeep::app::App;
use saloonkeep::cache::CacheConfig;
use saloonkeep::config::{BackendKind, INVENTORY_CACHE};
use saloonkeep::economy::SILVER;
use saloonkeep::errors::EconomyError;
use tokio_test::{assert_err, assert_ok};

#[tokio::test]
async fn mutations_reach_backend_only_after_shutdown_drain() {
    let h = harness();
    h.economy.add_user_silver("alice", 40).await.unwrap();
    h.economy.add_user_gold("alice", 3).await.unwrap();

    assert_eq!(h.backend.save_count(), 0);
    assert!(h.store.inventories().is_dirty("alice"));

    let report = h.caches.shutdown().await;
    assert_eq!(report.failed, 0);

    let stored = h.backend.record(INVENTORY_CACHE, "alice").expect("persisted");
    assert_eq!(stored["items"]["silver"], 40);
    assert_eq!(stored["items"]["saloon_token"], 3);
    assert!(!h.store.inventories().is_dirty("alice"));
}

#[tokio::test]
async fn dirty_evictee_is_flushed() {
    let h = harness_with(
        CacheConfig {
            max_size: 2,
            ..CacheConfig::default()
        },
        50.0,
    );
    h.store.add_item("first", SILVER, 1).await.unwrap();
    h.store.add_item("second", SILVER, 2).await.unwrap();
    h.store.add_item("third", SILVER, 3).await.unwrap();

    assert!(!h.store.inventories().contains("first"));
    assert_eq!(h.caches.queue_stats().pending, 1);

    h.caches.flush(None).await;
    let stored = h.backend.record(INVENTORY_CACHE, "first").expect("evictee written");
    assert_eq!(stored["items"]["silver"], 1);

    // Re-reading the evicted user goes back to the backend and sees the same value.
    assert_eq!(h.store.get_item_quantity("first", SILVER).await, 1);
}

#[tokio::test]
async fn evicted_value_is_visible_before_it_is_flushed() {
    let h = harness_with(
        CacheConfig {
            max_size: 1,
            ..CacheConfig::default()
        },
        50.0,
    );
    h.store.add_item("a", SILVER, 7).await.unwrap();
    h.store.add_item("b", SILVER, 1).await.unwrap();
    assert!(h.backend.record(INVENTORY_CACHE, "a").is_none());

    // "a" is only in the write queue now; the read must not fall back to empty.
    assert_eq!(h.store.get_item_quantity("a", SILVER).await, 7);
    h.store.add_item("a", SILVER, 1).await.unwrap();

    h.caches.shutdown().await;
    assert_eq!(h.backend.record(INVENTORY_CACHE, "a").unwrap()["items"]["silver"], 8);
    assert_eq!(h.backend.record(INVENTORY_CACHE, "b").unwrap()["items"]["silver"], 1);
}

#[tokio::test]
async fn shutdown_returns_while_backend_refuses_writes() {
    let h = harness_with(
        CacheConfig {
            max_size: 1,
            ..CacheConfig::default()
        },
        50.0,
    );
    h.store.add_item("a", SILVER, 5).await.unwrap();
    h.store.add_item("b", SILVER, 6).await.unwrap();
    h.backend.set_fail_writes(true);

    let report = tokio::time::timeout(Duration::from_secs(5), h.caches.shutdown())
        .await
        .expect("shutdown hung on a failing backend");
    assert!(report.failed > 0);
    assert!(h.backend.record(INVENTORY_CACHE, "a").is_none());

    // Nothing was dropped: a later drain persists the evicted record.
    h.backend.set_fail_writes(false);
    h.caches.drain().await;
    assert_eq!(h.backend.record(INVENTORY_CACHE, "a").unwrap()["items"]["silver"], 5);
    assert_eq!(h.backend.record(INVENTORY_CACHE, "b").unwrap()["items"]["silver"], 6);
}

#[tokio::test]
async fn mutation_refuses_to_build_on_failed_read() {
    let h = harness_with(
        CacheConfig {
            ttl: Duration::from_millis(30),
            ..CacheConfig::default()
        },
        50.0,
    );
    h.store.add_item("rich", SILVER, 1000).await.unwrap();
    h.caches.drain().await;
    tokio::time::sleep(Duration::from_millis(60)).await;

    h.backend.set_fail_reads(true);
    assert!(matches!(
        h.store.add_item("rich", SILVER, 1).await,
        Err(EconomyError::Storage(_))
    ));
    assert!(matches!(
        h.store.transfer_item("rich", "poor", SILVER, 10).await,
        Err(EconomyError::Storage(_))
    ));
    assert!(!h.store.inventories().contains("rich"));

    h.backend.set_fail_reads(false);
    h.caches.drain().await;
    assert_eq!(h.backend.record(INVENTORY_CACHE, "rich").unwrap()["items"]["silver"], 1000);
    assert_eq!(h.store.add_item("rich", SILVER, 1).await.unwrap().quantity, 1001);
}

#[tokio::test]
async fn expired_entry_reloads_from_backend() {
    let h = harness_with(
        CacheConfig {
            ttl: Duration::from_millis(30),
            ..CacheConfig::default()
        },
        50.0,
    );
    h.store.add_item("carol", SILVER, 9).await.unwrap();
    h.caches.drain().await;
    let loads_before = h.store.inventories().stats().loads;

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(h.store.inventories().get("carol").is_none());
    assert_eq!(h.store.get_item_quantity("carol", SILVER).await, 9);
    assert_eq!(h.store.inventories().stats().loads, loads_before + 1);
}

#[tokio::test]
async fn failed_write_back_is_retried() {
    let h = harness();
    h.store.add_item("dave", SILVER, 2).await.unwrap();

    h.backend.set_fail_writes(true);
    let report = h.caches.drain().await;
    assert_eq!(report.failed, 1);
    assert!(h.backend.record(INVENTORY_CACHE, "dave").is_none());

    h.backend.set_fail_writes(false);
    h.caches.shutdown().await;
    assert_eq!(h.backend.record(INVENTORY_CACHE, "dave").unwrap()["items"]["silver"], 2);
}

#[tokio::test]
async fn json_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(dir.path().to_str().unwrap());
    assert_eq!(config.storage.backend, BackendKind::Json);

    {
        let app = App::open(config.clone()).await.unwrap();
        app.start();
        assert_ok!(app.economy.add_user_silver("erin", 120).await);
        assert_ok!(app.store.add_item("erin", "whiskey", 2).await);
        assert_err!(app.economy.remove_user_silver("erin", 500).await);
        app.shutdown().await;
    }
    assert!(dir.path().join("inventory.json").exists());

    let app = App::open(config).await.unwrap();
    assert_eq!(app.economy.get_user_silver("erin").await, 120);
    assert_eq!(app.store.get_item_quantity("erin", "whiskey").await, 2);
    app.shutdown().await;
}

#[tokio::test]
async fn sled_backend_survives_restart() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(dir.path().to_str().unwrap());
    config.storage.backend = BackendKind::Sled;

    {
        let app = App::open(config.clone()).await.unwrap();
        assert_ok!(app.economy.add_user_gold("frank", 4).await);
        app.shutdown().await;
    }

    let app = App::open(config).await.unwrap();
    assert_eq!(app.economy.get_user_gold("frank").await, 4);
}
