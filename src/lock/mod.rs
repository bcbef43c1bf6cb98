//! # Per-key transaction locks
//!
//! [`KeyLock`] serializes mutations that touch the same key (a user id) while
//! letting unrelated keys proceed concurrently.
//!
//! - Waiters on one key are served in arrival order (tokio's mutex is FIFO fair).
//! - Multi-key acquisition sorts and dedupes keys first, so two transfers
//!   `A -> B` and `B -> A` always lock in the same order and cannot deadlock.
//! - A watchdog force-releases a lock held past the safety timeout and logs a
//!   warning. That is a diagnostic escape hatch: a forced release can let a second
//!   holder in while the first is still running.
//! - Map entries are reference counted and removed once nobody holds or waits
//!   on the key, so the map does not grow with every user ever seen.
//!
//! ```rust,no_run
//! use saloonkeep::lock::KeyLock;
//!
//! # async fn demo() {
//! let locks = KeyLock::default();
//! let total = locks.with_lock("alice", || async { 40 + 2 }).await;
//! assert_eq!(total, 42);
//! # }
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tokio::task::JoinHandle;
use tokio::time::Instant;

/// Default hold time after which a lock is force-released.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(30);

/// Waits longer than this are worth a debug line.
const SLOW_WAIT: Duration = Duration::from_millis(250);

struct Slot {
    mutex: Arc<AsyncMutex<()>>,
    refs: usize,
}

struct Inner {
    slots: Mutex<HashMap<String, Slot>>,
    timeout: Duration,
    next_ticket: AtomicU64,
    forced_releases: AtomicU64,
}

/// Process-local manager of per-key mutual exclusion. Cloning shares the same lock table.
#[derive(Clone)]
pub struct KeyLock {
    inner: Arc<Inner>,
}

impl Default for KeyLock {
    fn default() -> Self {
        Self::new(DEFAULT_LOCK_TIMEOUT)
    }
}

impl KeyLock {
    /// Create a lock table. A zero `timeout` disables the watchdog.
    pub fn new(timeout: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                slots: Mutex::new(HashMap::new()),
                timeout,
                next_ticket: AtomicU64::new(1),
                forced_releases: AtomicU64::new(0),
            }),
        }
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    /// Acquire exclusive ownership of `key`, suspending until the current holder
    /// (and every earlier waiter) has released it.
    pub async fn acquire(&self, key: &str) -> KeyGuard {
        let (mutex, slot) = self.claim(key);
        let ticket = self.inner.next_ticket.fetch_add(1, Ordering::Relaxed);
        let started = Instant::now();
        let guard = mutex.lock_owned().await;
        let waited = started.elapsed();
        if waited >= SLOW_WAIT {
            debug!("lock {} (ticket {}) waited {:?}", key, ticket, waited);
        }

        let held = Arc::new(Mutex::new(Some(guard)));
        let watchdog = self.spawn_watchdog(key, ticket, Arc::clone(&held));
        KeyGuard {
            key: key.to_string(),
            ticket,
            held,
            watchdog,
            _slot: slot,
        }
    }

    /// Acquire every key in a fixed global order (sorted, deduplicated).
    /// The returned guard releases them in reverse order.
    pub async fn acquire_many<I, S>(&self, keys: I) -> MultiKeyGuard
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut ordered: Vec<String> = keys.into_iter().map(|k| k.as_ref().to_string()).collect();
        ordered.sort();
        ordered.dedup();

        let mut guards = Vec::with_capacity(ordered.len());
        for key in &ordered {
            guards.push(self.acquire(key).await);
        }
        MultiKeyGuard { guards }
    }

    /// Run `f` while holding the lock for `key`. The lock is released on every exit
    /// path, including errors returned by `f` and panics unwinding through it.
    pub async fn with_lock<F, Fut, T>(&self, key: &str, f: F) -> T
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guard = self.acquire(key).await;
        f().await
    }

    /// Run `f` while holding the locks for all `keys`, acquired in sorted order.
    pub async fn with_multiple_locks<I, S, F, Fut, T>(&self, keys: I, f: F) -> T
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        let _guards = self.acquire_many(keys).await;
        f().await
    }

    /// True while some task holds `key`.
    pub fn is_locked(&self, key: &str) -> bool {
        let slots = self.inner.slots.lock();
        slots
            .get(key)
            .map(|slot| slot.mutex.try_lock().is_err())
            .unwrap_or(false)
    }

    /// Number of keys currently held or waited on.
    pub fn tracked_keys(&self) -> usize {
        self.inner.slots.lock().len()
    }

    /// How many times the watchdog has force-released a lock.
    pub fn forced_releases(&self) -> u64 {
        self.inner.forced_releases.load(Ordering::Relaxed)
    }

    fn claim(&self, key: &str) -> (Arc<AsyncMutex<()>>, SlotRef) {
        let mut slots = self.inner.slots.lock();
        let slot = slots.entry(key.to_string()).or_insert_with(|| Slot {
            mutex: Arc::new(AsyncMutex::new(())),
            refs: 0,
        });
        slot.refs += 1;
        let mutex = Arc::clone(&slot.mutex);
        (
            mutex,
            SlotRef {
                inner: Arc::clone(&self.inner),
                key: key.to_string(),
            },
        )
    }

    fn spawn_watchdog(
        &self,
        key: &str,
        ticket: u64,
        held: Arc<Mutex<Option<OwnedMutexGuard<()>>>>,
    ) -> Option<JoinHandle<()>> {
        let timeout = self.inner.timeout;
        if timeout.is_zero() {
            return None;
        }
        let inner = Arc::clone(&self.inner);
        let key = key.to_string();
        Some(tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            if held.lock().take().is_some() {
                inner.forced_releases.fetch_add(1, Ordering::Relaxed);
                warn!(
                    "lock timeout: force-released {} (ticket {}) after {:?}",
                    key, ticket, timeout
                );
            }
        }))
    }
}

/// Counts one holder or waiter of a key; dropping it may retire the map entry.
struct SlotRef {
    inner: Arc<Inner>,
    key: String,
}

impl Drop for SlotRef {
    fn drop(&mut self) {
        let mut slots = self.inner.slots.lock();
        if let Some(slot) = slots.get_mut(&self.key) {
            slot.refs = slot.refs.saturating_sub(1);
            if slot.refs == 0 {
                slots.remove(&self.key);
            }
        }
    }
}

/// Ownership of one key. Released when dropped.
pub struct KeyGuard {
    key: String,
    ticket: u64,
    held: Arc<Mutex<Option<OwnedMutexGuard<()>>>>,
    watchdog: Option<JoinHandle<()>>,
    _slot: SlotRef,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn ticket(&self) -> u64 {
        self.ticket
    }

    /// True if the watchdog already took the lock away from this guard.
    pub fn was_force_released(&self) -> bool {
        self.held.lock().is_none()
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        if let Some(watchdog) = self.watchdog.take() {
            watchdog.abort();
        }
        self.held.lock().take();
    }
}

/// Ownership of several keys, released in reverse acquisition order.
pub struct MultiKeyGuard {
    guards: Vec<KeyGuard>,
}

impl MultiKeyGuard {
    /// Keys in the order they were acquired.
    pub fn keys(&self) -> Vec<&str> {
        self.guards.iter().map(|g| g.key()).collect()
    }
}

impl Drop for MultiKeyGuard {
    fn drop(&mut self) {
        while let Some(guard) = self.guards.pop() {
            drop(guard);
        }
    }
}
