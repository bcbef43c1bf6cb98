use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use saloonkeep::lock::KeyLock;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn read_modify_write_under_lock_is_serialized() {
    let locks = KeyLock::default();
    let counter = Arc::new(AtomicUsize::new(0));

    let mut tasks = Vec::new();
    for _ in 0..64 {
        let locks = locks.clone();
        let counter = Arc::clone(&counter);
        tasks.push(tokio::spawn(async move {
            locks
                .with_lock("shared", || async move {
                    let seen = counter.load(Ordering::SeqCst);
                    tokio::task::yield_now().await;
                    counter.store(seen + 1, Ordering::SeqCst);
                })
                .await
        }));
    }
    for task in tasks {
        task.await.unwrap();
    }
    assert_eq!(counter.load(Ordering::SeqCst), 64);
    assert_eq!(locks.tracked_keys(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn crossed_multi_key_acquisition_completes() {
    let locks = KeyLock::default();
    let mut tasks = Vec::new();
    for i in 0..200 {
        let locks = locks.clone();
        tasks.push(tokio::spawn(async move {
            let keys = if i % 2 == 0 { ["x", "y"] } else { ["y", "x"] };
            locks
                .with_multiple_locks(keys, || async {
                    tokio::task::yield_now().await;
                })
                .await
        }));
    }
    let all = async {
        for task in tasks {
            task.await.unwrap();
        }
    };
    tokio::time::timeout(Duration::from_secs(10), all)
        .await
        .expect("multi-key acquisition deadlocked");
    assert!(!locks.is_locked("x"));
    assert!(!locks.is_locked("y"));
}
