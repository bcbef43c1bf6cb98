mod common;

use std::sync::Arc;

use common::harness;
use saloonkeep::economy::{total_weight, SALOON_TOKEN, SILVER};
use saloonkeep::errors::EconomyError;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_adds_are_not_lost() {
    let h = harness();
    let mut tasks = Vec::new();
    for _ in 0..100 {
        let store = Arc::clone(&h.store);
        tasks.push(tokio::spawn(async move {
            store.add_item("alice", SILVER, 1).await
        }));
    }
    for task in tasks {
        task.await.unwrap().unwrap();
    }
    assert_eq!(h.store.get_item_quantity("alice", SILVER).await, 100);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn opposing_transfers_conserve_and_never_deadlock() {
    let h = harness();
    h.store.add_item("a", SILVER, 500).await.unwrap();
    h.store.add_item("b", SILVER, 500).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..1000 {
        let store = Arc::clone(&h.store);
        tasks.push(tokio::spawn(async move {
            if i % 2 == 0 {
                store.transfer_item("a", "b", SILVER, 1).await
            } else {
                store.transfer_item("b", "a", SILVER, 1).await
            }
        }));
    }

    let all = async {
        for task in tasks {
            let _ = task.await.unwrap();
        }
    };
    tokio::time::timeout(std::time::Duration::from_secs(20), all)
        .await
        .expect("transfers deadlocked");

    let a = h.store.get_item_quantity("a", SILVER).await;
    let b = h.store.get_item_quantity("b", SILVER).await;
    assert_eq!(a + b, 1000);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_transfers_never_overdraw() {
    let h = harness();
    h.store.add_item("a", SILVER, 10).await.unwrap();

    let mut tasks = Vec::new();
    for i in 0..20 {
        let store = Arc::clone(&h.store);
        let to = format!("u{}", i);
        tasks.push(tokio::spawn(async move {
            store.transfer_item("a", &to, SILVER, 1).await
        }));
    }
    let mut ok = 0;
    let mut insufficient = 0;
    for task in tasks {
        match task.await.unwrap() {
            Ok(_) => ok += 1,
            Err(EconomyError::InsufficientQuantity { .. }) => insufficient += 1,
            Err(other) => panic!("unexpected rejection: {other}"),
        }
    }
    assert_eq!(ok, 10);
    assert_eq!(insufficient, 10);
    assert_eq!(h.store.get_item_quantity("a", SILVER).await, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn capacity_invariant_holds_under_contention() {
    let h = harness();
    let mut tasks = Vec::new();
    for _ in 0..50 {
        let store = Arc::clone(&h.store);
        tasks.push(tokio::spawn(async move {
            store.add_item("mule", "whiskey", 1).await
        }));
    }
    let accepted = {
        let mut n = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                n += 1;
            }
        }
        n
    };

    let record = h.store.get_inventory("mule").await;
    let weight = total_weight(&record, h.store.catalog());
    assert!(weight <= record.max_weight);
    // 50.0 / 1.5 rounds down to 33 bottles
    assert_eq!(accepted, 33);
    assert_eq!(record.quantity("whiskey"), 33);
}

#[tokio::test]
async fn add_then_remove_gold_scenario() {
    let h = harness();
    let added = h.store.add_item("alice", SALOON_TOKEN, 5).await.unwrap();
    assert_eq!(added.quantity, 5);
    let removed = h.store.remove_item("alice", SALOON_TOKEN, 3).await.unwrap();
    assert_eq!(removed.remaining, 2);
    assert_eq!(removed.total_weight, 2.0 * common::TOKEN_WEIGHT);
}

#[tokio::test]
async fn rejected_mutations_change_nothing() {
    let h = harness();
    h.store.add_item("bob", "saddle", 4).await.unwrap();

    let err = h.store.add_item("bob", "saddle", 1).await.unwrap_err();
    assert_eq!(
        err,
        EconomyError::CapacityExceeded {
            current: 48.0,
            required: 60.0,
            max: 50.0
        }
    );
    assert!(matches!(
        h.store.remove_item("bob", "whiskey", 1).await,
        Err(EconomyError::InsufficientQuantity { held: 0, requested: 1, .. })
    ));
    assert_eq!(
        h.store.add_item("bob", "moonshine", 1).await.unwrap_err(),
        EconomyError::ItemNotFound("moonshine".into())
    );
    assert_eq!(h.store.get_item_quantity("bob", "saddle").await, 4);
    assert_eq!(h.store.free_capacity("bob").await, 2.0);
}
