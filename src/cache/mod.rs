//! # Write-back record cache
//!
//! [`CacheManager`] owns a registry of named caches, the shared [`WriteQueue`] and
//! the background flusher. Each registered cache is a typed [`RecordCache<T>`]
//! handle whose records are encoded to JSON only at the backend boundary.
//!
//! ## Lifecycle of an entry
//!
//! ```text
//! get_or_load ──► clean entry ──set──► dirty entry ──force_sync / evict──► queued
//!                     ▲                                                      │
//!                     └──────────── backend confirms write ◄─────────────────┘
//! ```
//!
//! - `set` never performs I/O; it stamps the entry and marks it dirty.
//! - A full cache evicts its *oldest inserted* entry (not least recently used).
//!   Dirty evictees are queued at high priority first.
//! - Reads past the TTL drop the entry and report a miss; a dirty expired entry is
//!   queued before it is dropped.
//! - The flusher ticks on a fixed interval, syncs caches whose interval elapsed and
//!   writes a bounded batch of queued operations, each as load-merge-save on the
//!   cache's blob.
//! - [`CacheManager::shutdown`] stops the ticker, force-syncs every cache and drains
//!   the entire queue before returning. Each pass tries a queued value at most once,
//!   so a backend that keeps failing is reported instead of retried forever.
//! - A read-through that raced an entry leaving memory is retried, so a value loaded
//!   before a concurrent write-back never replaces the newer one.
//!
//! Lock order is always entry map before queue; the flusher never holds both.

use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, error, info, warn};
use parking_lot::{Mutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::errors::StorageError;
use crate::storage::PersistenceBackend;

pub mod queue;
pub mod stats;

pub use queue::{PendingWrite, Priority, WriteOperation, WriteQueue};
pub use stats::{CacheStats, CacheStatsSnapshot, QueueStats};

/// Read-through attempts before a raced load is returned without being cached.
const READ_THROUGH_ATTEMPTS: usize = 3;

/// Registry misuse.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CacheError {
    #[error("cache already registered: {0}")]
    AlreadyRegistered(String),

    #[error("cache not registered: {0}")]
    NotRegistered(String),
}

/// Tuning for one named cache.
#[derive(Debug, Clone)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent on read.
    pub ttl: Duration,
    /// Maximum resident entries before insertion-order eviction.
    pub max_size: usize,
    /// How often dirty entries are queued for persistence.
    pub sync_interval: Duration,
    /// Backend blob this cache persists into; defaults to the cache name.
    pub blob: Option<String>,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(300),
            max_size: 1000,
            sync_interval: Duration::from_secs(30),
            blob: None,
        }
    }
}

/// Settings for the background flusher.
#[derive(Debug, Clone, Copy)]
pub struct FlushSettings {
    pub tick: Duration,
    pub batch_size: usize,
}

impl Default for FlushSettings {
    fn default() -> Self {
        Self {
            tick: Duration::from_millis(1000),
            batch_size: 10,
        }
    }
}

/// Outcome of one pass over the write queue.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FlushReport {
    pub written: usize,
    pub failed: usize,
}

/// Type-erased view the manager keeps of every registered cache.
trait ManagedCache: Send + Sync {
    fn sync_interval(&self) -> Duration;
    fn enqueue_dirty(&self, priority: Priority) -> usize;
    fn write_succeeded(&self, key: &str, version: u64);
    fn write_failed(&self, write: PendingWrite);
    fn stats(&self) -> CacheStatsSnapshot;
}

struct Shared {
    backend: Arc<dyn PersistenceBackend>,
    queue: Arc<Mutex<WriteQueue>>,
    caches: RwLock<HashMap<String, Arc<dyn ManagedCache>>>,
    flush_lock: tokio::sync::Mutex<()>,
    settings: FlushSettings,
    ticker: Mutex<Option<(oneshot::Sender<()>, JoinHandle<()>)>>,
}

/// Registry of named write-back caches plus the background flusher.
/// Cloning shares the same registry.
#[derive(Clone)]
pub struct CacheManager {
    shared: Arc<Shared>,
}

impl CacheManager {
    pub fn new(backend: Arc<dyn PersistenceBackend>, settings: FlushSettings) -> Self {
        Self {
            shared: Arc::new(Shared {
                backend,
                queue: Arc::new(Mutex::new(WriteQueue::new())),
                caches: RwLock::new(HashMap::new()),
                flush_lock: tokio::sync::Mutex::new(()),
                settings,
                ticker: Mutex::new(None),
            }),
        }
    }

    pub fn backend(&self) -> Arc<dyn PersistenceBackend> {
        Arc::clone(&self.shared.backend)
    }

    /// Declare a named cache. Each name may be registered once.
    pub fn register<T>(
        &self,
        name: &str,
        config: CacheConfig,
    ) -> Result<RecordCache<T>, CacheError>
    where
        T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
    {
        let mut caches = self.shared.caches.write();
        if caches.contains_key(name) {
            return Err(CacheError::AlreadyRegistered(name.to_string()));
        }
        let blob = config.blob.clone().unwrap_or_else(|| name.to_string());
        let inner = Arc::new(TypedCache {
            name: name.to_string(),
            blob,
            config,
            state: Mutex::new(CacheState::default()),
            stats: CacheStats::new(),
            versions: AtomicU64::new(0),
            queue: Arc::clone(&self.shared.queue),
            backend: Arc::clone(&self.shared.backend),
        });
        caches.insert(name.to_string(), inner.clone() as Arc<dyn ManagedCache>);
        debug!(
            "registered cache {} (ttl={:?}, max_size={}, sync={:?})",
            name, inner.config.ttl, inner.config.max_size, inner.config.sync_interval
        );
        Ok(RecordCache { inner })
    }

    pub fn cache_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.shared.caches.read().keys().cloned().collect();
        names.sort();
        names
    }

    /// Queue every dirty entry of one cache (or all caches) for persistence.
    pub fn force_sync(&self, name: Option<&str>) -> Result<usize, CacheError> {
        let caches = self.shared.caches.read();
        match name {
            Some(name) => {
                let cache = caches
                    .get(name)
                    .ok_or_else(|| CacheError::NotRegistered(name.to_string()))?;
                Ok(cache.enqueue_dirty(Priority::Normal))
            }
            None => Ok(caches
                .values()
                .map(|cache| cache.enqueue_dirty(Priority::Normal))
                .sum()),
        }
    }

    /// Write up to `limit` queued operations (all of them when `None`). Only
    /// operations queued when the pass starts are attempted; values requeued after
    /// a failure wait for the next pass.
    pub async fn flush(&self, limit: Option<usize>) -> FlushReport {
        let _io = self.shared.flush_lock.lock().await;
        let queued = self.shared.queue.lock().len();
        let budget = limit.map_or(queued, |limit| limit.min(queued));
        let mut report = FlushReport::default();
        for _ in 0..budget {
            let Some(op) = self.shared.queue.lock().begin_next() else {
                break;
            };
            let cache = self.shared.caches.read().get(&op.cache).cloned();
            match self.write_operation(&op).await {
                Ok(()) => {
                    if let Some(cache) = &cache {
                        for write in &op.writes {
                            cache.write_succeeded(&write.key, write.version);
                        }
                    }
                    report.written += 1;
                    self.shared.queue.lock().finish(op.id, true);
                }
                Err(e) => {
                    warn!(
                        "write-back of {} record(s) to {} failed: {}",
                        op.writes.len(),
                        op.blob,
                        e
                    );
                    if let Some(cache) = &cache {
                        for write in op.writes.iter().cloned() {
                            cache.write_failed(write);
                        }
                    }
                    report.failed += 1;
                    self.shared.queue.lock().finish(op.id, false);
                }
            }
            tokio::task::yield_now().await;
        }
        report
    }

    /// Repeat unbounded passes while they make progress. Stops at the first pass that
    /// writes nothing, leaving persistently failing values queued.
    async fn flush_all(&self) -> FlushReport {
        let mut total = FlushReport::default();
        loop {
            let pass = self.flush(None).await;
            total.written += pass.written;
            total.failed += pass.failed;
            if pass.written == 0 || self.shared.queue.lock().is_empty() {
                return total;
            }
        }
    }

    /// Force-sync every cache and write the whole queue without stopping the ticker.
    pub async fn drain(&self) -> FlushReport {
        let queued = self.force_sync(None).unwrap_or(0);
        let report = self.flush_all().await;
        debug!(
            "drain: {} record(s) synced, {} op(s) written, {} failed",
            queued, report.written, report.failed
        );
        report
    }

    /// Start the periodic flusher. Calling it twice is a no-op.
    pub fn start(&self) {
        let mut ticker = self.shared.ticker.lock();
        if ticker.is_some() {
            return;
        }
        let (stop_tx, mut stop_rx) = oneshot::channel::<()>();
        let manager = self.clone();
        let handle = tokio::spawn(async move {
            let settings = manager.shared.settings;
            let mut interval = tokio::time::interval(settings.tick);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last_sync: HashMap<String, Instant> = HashMap::new();
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        manager.sync_due_caches(&mut last_sync);
                        let report = manager.flush(Some(settings.batch_size)).await;
                        if report.failed > 0 {
                            debug!(
                                "flush tick: {} written, {} failed",
                                report.written, report.failed
                            );
                        }
                    }
                    _ = &mut stop_rx => break,
                }
            }
            debug!("cache flusher loop terminated");
        });
        *ticker = Some((stop_tx, handle));
        info!(
            "cache flusher started (tick={:?}, batch={})",
            self.shared.settings.tick, self.shared.settings.batch_size
        );
    }

    /// Stop the flusher, force-sync all caches and write every queued operation.
    /// Returns once the backend holds all dirty data (or the writes failed).
    pub async fn shutdown(&self) -> FlushReport {
        let ticker = self.shared.ticker.lock().take();
        if let Some((stop, handle)) = ticker {
            let _ = stop.send(());
            if let Err(e) = handle.await {
                error!("cache flusher task ended abnormally: {}", e);
            }
        }

        let queued = self.force_sync(None).unwrap_or(0);
        let report = self.flush_all().await;
        info!(
            "cache shutdown: {} dirty record(s) synced, {} op(s) written, {} failed",
            queued, report.written, report.failed
        );
        let left = self.shared.queue.lock().len();
        if left > 0 {
            error!("cache shutdown: {} write-back op(s) could not be persisted", left);
        }
        for name in self.cache_names() {
            if let Ok(stats) = self.stats(&name) {
                debug!(
                    "cache {}: hits={} misses={} loads={} evictions={} expirations={} ratio={:.2}",
                    name,
                    stats.hits,
                    stats.misses,
                    stats.loads,
                    stats.evictions,
                    stats.expirations,
                    stats.hit_ratio()
                );
            }
        }
        report
    }

    pub fn stats(&self, name: &str) -> Result<CacheStatsSnapshot, CacheError> {
        self.shared
            .caches
            .read()
            .get(name)
            .map(|cache| cache.stats())
            .ok_or_else(|| CacheError::NotRegistered(name.to_string()))
    }

    pub fn queue_stats(&self) -> QueueStats {
        self.shared.queue.lock().stats()
    }

    fn sync_due_caches(&self, last_sync: &mut HashMap<String, Instant>) {
        let now = Instant::now();
        let caches = self.shared.caches.read();
        for (name, cache) in caches.iter() {
            let last = *last_sync.entry(name.clone()).or_insert(now);
            if now.duration_since(last) >= cache.sync_interval() {
                let queued = cache.enqueue_dirty(Priority::Normal);
                if queued > 0 {
                    debug!("periodic sync of {}: {} dirty record(s) queued", name, queued);
                }
                last_sync.insert(name.clone(), now);
            }
        }
    }

    async fn write_operation(&self, op: &WriteOperation) -> Result<(), StorageError> {
        let backend = &self.shared.backend;
        let mut blob = backend.load_blob(&op.blob).await?.unwrap_or_default();
        for write in &op.writes {
            blob.insert(write.key.clone(), write.value.clone());
        }
        backend.save_blob(&op.blob, &blob).await
    }
}

struct CacheEntry<T> {
    data: T,
    timestamp: Instant,
    dirty: bool,
    version: u64,
    queued_version: Option<u64>,
    seq: u64,
}

struct CacheState<T> {
    entries: HashMap<String, CacheEntry<T>>,
    order: BTreeMap<u64, String>,
    next_seq: u64,
    /// Bumped whenever an entry leaves memory (eviction, expiry, invalidation).
    departures: u64,
}

impl<T> Default for CacheState<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            order: BTreeMap::new(),
            next_seq: 0,
            departures: 0,
        }
    }
}

impl<T> CacheState<T> {
    fn remove(&mut self, key: &str) -> Option<CacheEntry<T>> {
        let entry = self.entries.remove(key)?;
        self.order.remove(&entry.seq);
        self.departures += 1;
        Some(entry)
    }
}

struct TypedCache<T> {
    name: String,
    blob: String,
    config: CacheConfig,
    state: Mutex<CacheState<T>>,
    stats: CacheStats,
    versions: AtomicU64,
    queue: Arc<Mutex<WriteQueue>>,
    backend: Arc<dyn PersistenceBackend>,
}

impl<T> TypedCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn next_version(&self) -> u64 {
        self.versions.fetch_add(1, Ordering::Relaxed) + 1
    }

    fn is_expired(&self, entry: &CacheEntry<T>, now: Instant) -> bool {
        now.duration_since(entry.timestamp) > self.config.ttl
    }

    fn encode(&self, key: &str, data: &T, version: u64) -> Option<PendingWrite> {
        match serde_json::to_value(data) {
            Ok(value) => Some(PendingWrite {
                key: key.to_string(),
                value,
                version,
            }),
            Err(e) => {
                error!("cannot encode {}/{} for persistence: {}", self.name, key, e);
                None
            }
        }
    }

    /// Queue one entry that is about to leave memory. Caller holds the state lock.
    fn queue_departing(&self, key: &str, entry: &CacheEntry<T>) {
        if !entry.dirty || entry.queued_version == Some(entry.version) {
            return;
        }
        if let Some(write) = self.encode(key, &entry.data, entry.version) {
            self.queue
                .lock()
                .push(&self.name, &self.blob, vec![write], Priority::High);
        }
    }

    fn insert_locked(
        &self,
        state: &mut CacheState<T>,
        key: &str,
        data: T,
        dirty: bool,
        version: u64,
        queued: Option<u64>,
    ) {
        let now = Instant::now();
        if let Some(entry) = state.entries.get_mut(key) {
            entry.data = data;
            entry.timestamp = now;
            entry.dirty = dirty;
            entry.version = version;
            if queued.is_some() {
                entry.queued_version = queued;
            }
            return;
        }

        while state.entries.len() >= self.config.max_size.max(1) {
            let Some((_, oldest)) = state.order.pop_first() else {
                break;
            };
            if let Some(evicted) = state.entries.remove(&oldest) {
                state.departures += 1;
                self.queue_departing(&oldest, &evicted);
                self.stats.record_eviction();
                debug!("evicted {}/{} (dirty={})", self.name, oldest, evicted.dirty);
            }
        }

        state.next_seq += 1;
        let seq = state.next_seq;
        state.order.insert(seq, key.to_string());
        state.entries.insert(
            key.to_string(),
            CacheEntry {
                data,
                timestamp: now,
                dirty,
                version,
                queued_version: queued,
                seq,
            },
        );
    }
}

impl<T> ManagedCache for TypedCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    fn sync_interval(&self) -> Duration {
        self.config.sync_interval
    }

    fn enqueue_dirty(&self, priority: Priority) -> usize {
        let mut state = self.state.lock();
        let mut writes = Vec::new();
        for (key, entry) in state.entries.iter_mut() {
            if !entry.dirty || entry.queued_version == Some(entry.version) {
                continue;
            }
            if let Some(write) = self.encode(key, &entry.data, entry.version) {
                entry.queued_version = Some(entry.version);
                writes.push(write);
            }
        }
        if writes.is_empty() {
            return 0;
        }
        self.queue.lock().push(&self.name, &self.blob, writes, priority)
    }

    fn write_succeeded(&self, key: &str, version: u64) {
        let mut state = self.state.lock();
        if let Some(entry) = state.entries.get_mut(key) {
            if entry.version == version {
                entry.dirty = false;
            }
            if entry.queued_version == Some(version) {
                entry.queued_version = None;
            }
        }
    }

    fn write_failed(&self, write: PendingWrite) {
        let mut state = self.state.lock();
        match state.entries.get_mut(&write.key) {
            Some(entry) => {
                // Still resident and dirty: the next periodic sync retries it.
                if entry.queued_version == Some(write.version) {
                    entry.queued_version = None;
                }
            }
            None => {
                // The value left memory; keep it queued for the next pass.
                self.queue
                    .lock()
                    .push(&self.name, &self.blob, vec![write], Priority::Normal);
            }
        }
    }

    fn stats(&self) -> CacheStatsSnapshot {
        self.stats.snapshot()
    }
}

/// Typed handle to one named cache.
pub struct RecordCache<T> {
    inner: Arc<TypedCache<T>>,
}

impl<T> Clone for RecordCache<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> RecordCache<T>
where
    T: Clone + Serialize + DeserializeOwned + Send + Sync + 'static,
{
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Backend blob this cache reads from and writes to.
    pub fn blob(&self) -> &str {
        &self.inner.blob
    }

    /// Cached value if present and within its TTL. Expired entries are dropped.
    pub fn get(&self, key: &str) -> Option<T> {
        self.lookup(key).ok()
    }

    /// Hit, or the departure epoch observed at the miss.
    fn lookup(&self, key: &str) -> Result<T, u64> {
        let cache = &self.inner;
        let mut state = cache.state.lock();
        let now = Instant::now();
        let expired = match state.entries.get(key) {
            None => {
                cache.stats.record_miss();
                return Err(state.departures);
            }
            Some(entry) => cache.is_expired(entry, now),
        };
        if expired {
            if let Some(entry) = state.remove(key) {
                cache.queue_departing(key, &entry);
            }
            cache.stats.record_expiration();
            cache.stats.record_miss();
            return Err(state.departures);
        }
        cache.stats.record_hit();
        match state.entries.get(key) {
            Some(entry) => Ok(entry.data.clone()),
            None => Err(state.departures),
        }
    }

    /// Read-through from this cache's own blob.
    pub async fn load(&self, key: &str, default: T) -> T {
        let blob = self.inner.blob.clone();
        self.get_or_load(key, &blob, default).await
    }

    /// Like [`load`](Self::load) but surfaces backend failures. Use this before
    /// modifying and writing a record back.
    pub async fn try_load(&self, key: &str, default: T) -> Result<T, StorageError> {
        let blob = self.inner.blob.clone();
        self.try_get_or_load(key, &blob, default).await
    }

    /// Cached value, or a read-through from backend blob `backend_ref`. When the
    /// backend has nothing for `key`, `default` is cached and returned. Backend
    /// errors return `default` without caching it, so the next read retries.
    pub async fn get_or_load(&self, key: &str, backend_ref: &str, default: T) -> T {
        match self.fetch(key, backend_ref, &default).await {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "read-through of {}/{} from {} failed, using default: {}",
                    self.inner.name, key, backend_ref, e
                );
                default
            }
        }
    }

    /// Cached value, or a read-through from `backend_ref`. Backend and decode
    /// errors are returned and nothing is cached.
    pub async fn try_get_or_load(
        &self,
        key: &str,
        backend_ref: &str,
        default: T,
    ) -> Result<T, StorageError> {
        self.fetch(key, backend_ref, &default).await
    }

    async fn fetch(&self, key: &str, backend_ref: &str, default: &T) -> Result<T, StorageError> {
        let cache = &self.inner;
        let mut attempt = 1;
        loop {
            let epoch = match self.lookup(key) {
                Ok(value) => return Ok(value),
                Err(epoch) => epoch,
            };
            let last = attempt >= READ_THROUGH_ATTEMPTS;

            let pending = cache.queue.lock().pending(&cache.name, key);
            if let Some(write) = pending {
                match serde_json::from_value::<T>(write.value) {
                    Ok(value) => {
                        let version = write.version;
                        if let Some(value) =
                            self.adopt(key, value, true, version, Some(version), epoch, last)
                        {
                            return Ok(value);
                        }
                        attempt += 1;
                        continue;
                    }
                    Err(e) => {
                        warn!("queued value for {}/{} is unreadable: {}", cache.name, key, e)
                    }
                }
            }

            let loaded = match cache.backend.load_blob(backend_ref).await {
                Ok(Some(mut blob)) => blob.remove(key),
                Ok(None) => None,
                Err(e) => {
                    cache.stats.record_load_failure();
                    return Err(e);
                }
            };
            cache.stats.record_load();

            let value = match loaded {
                Some(raw) => serde_json::from_value::<T>(raw).map_err(|e| {
                    cache.stats.record_load_failure();
                    StorageError::from(e)
                })?,
                None => default.clone(),
            };
            let version = cache.next_version();
            if let Some(value) = self.adopt(key, value, false, version, None, epoch, last) {
                return Ok(value);
            }
            debug!("read-through of {}/{} raced a departure, retrying", cache.name, key);
            attempt += 1;
        }
    }

    /// Insert a value produced by a load unless a writer got there first. Returns
    /// `None` when an entry left memory since `epoch`, because the load may predate
    /// its write-back; on the `last` attempt the value is returned uncached instead.
    #[allow(clippy::too_many_arguments)]
    fn adopt(
        &self,
        key: &str,
        value: T,
        dirty: bool,
        version: u64,
        queued: Option<u64>,
        epoch: u64,
        last: bool,
    ) -> Option<T> {
        let cache = &self.inner;
        let mut state = cache.state.lock();
        let now = Instant::now();
        if let Some(existing) = state.entries.get(key) {
            if !cache.is_expired(existing, now) {
                return Some(existing.data.clone());
            }
        }
        if state.departures != epoch {
            return if last { Some(value) } else { None };
        }
        cache.insert_locked(&mut state, key, value.clone(), dirty, version, queued);
        Some(value)
    }

    /// Store `value` and mark it dirty. Never performs I/O.
    pub fn set(&self, key: &str, value: T) {
        self.set_with_dirty(key, value, true);
    }

    /// Store `value`; `dirty = false` asserts it already matches the backend.
    pub fn set_with_dirty(&self, key: &str, value: T, dirty: bool) {
        let cache = &self.inner;
        let version = cache.next_version();
        let mut state = cache.state.lock();
        cache.insert_locked(&mut state, key, value, dirty, version, None);
        cache.stats.record_write();
    }

    /// Queue `key` if dirty, then drop it; with no key, do that for the whole cache.
    pub fn invalidate(&self, key: Option<&str>) {
        let cache = &self.inner;
        let mut state = cache.state.lock();
        match key {
            Some(key) => {
                if let Some(entry) = state.remove(key) {
                    cache.queue_departing(key, &entry);
                }
            }
            None => {
                let entries = std::mem::take(&mut state.entries);
                state.order.clear();
                state.departures += 1;
                for (key, entry) in &entries {
                    cache.queue_departing(key, entry);
                }
            }
        }
    }

    /// Queue every dirty entry of this cache.
    pub fn force_sync(&self) -> usize {
        self.inner.enqueue_dirty(Priority::Normal)
    }

    /// Resident entries, expired or not.
    pub fn len(&self) -> usize {
        self.inner.state.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `key` is resident, regardless of TTL.
    pub fn contains(&self, key: &str) -> bool {
        self.inner.state.lock().entries.contains_key(key)
    }

    pub fn is_dirty(&self, key: &str) -> bool {
        self.inner
            .state
            .lock()
            .entries
            .get(key)
            .map(|entry| entry.dirty)
            .unwrap_or(false)
    }

    pub fn stats(&self) -> CacheStatsSnapshot {
        self.inner.stats.snapshot()
    }
}
