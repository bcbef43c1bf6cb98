//! Deferred write queue shared by every named cache.
//!
//! Operations wait here between the moment an entry is marked for persistence and
//! the moment the background flusher has written it. High-priority operations
//! (evictions, invalidations) are served before normal ones; each priority is FIFO.
//!
//! At most one pending value exists per `(cache, key)`: a newer write replaces the
//! queued one, and an older write arriving late is discarded. Operations taken by
//! the flusher stay visible as *in flight* until the backend confirms them, so
//! read-through loads never miss a value that has left memory but not yet reached
//! the backend.

use std::collections::VecDeque;

use serde_json::Value;
use tokio::time::Instant;

use super::stats::QueueStats;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Priority {
    High,
    Normal,
}

/// One record value waiting to be persisted.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingWrite {
    pub key: String,
    pub value: Value,
    pub version: u64,
}

/// A batch of record values for one cache blob.
#[derive(Debug, Clone)]
pub struct WriteOperation {
    pub id: u64,
    pub cache: String,
    pub blob: String,
    pub writes: Vec<PendingWrite>,
    pub priority: Priority,
    pub enqueued_at: Instant,
}

#[derive(Debug, Default)]
pub struct WriteQueue {
    high: VecDeque<WriteOperation>,
    normal: VecDeque<WriteOperation>,
    in_flight: Vec<WriteOperation>,
    next_id: u64,
    stats: QueueStats,
}

impl WriteQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `writes` for `blob`. Returns how many values were actually queued.
    pub fn push(
        &mut self,
        cache: &str,
        blob: &str,
        mut writes: Vec<PendingWrite>,
        priority: Priority,
    ) -> usize {
        writes.retain(|w| !self.has_newer(cache, &w.key, w.version));
        if writes.is_empty() {
            return 0;
        }

        for queue in [&mut self.high, &mut self.normal] {
            queue.retain_mut(|queued| {
                if queued.cache == cache {
                    queued
                        .writes
                        .retain(|old| !writes.iter().any(|new| new.key == old.key));
                }
                !queued.writes.is_empty()
            });
        }

        self.next_id += 1;
        let count = writes.len();
        let op = WriteOperation {
            id: self.next_id,
            cache: cache.to_string(),
            blob: blob.to_string(),
            writes,
            priority,
            enqueued_at: Instant::now(),
        };
        match priority {
            Priority::High => self.high.push_back(op),
            Priority::Normal => self.normal.push_back(op),
        }
        count
    }

    /// Take the next operation for writing. It stays visible to [`pending`](Self::pending)
    /// until [`finish`](Self::finish) is called with its id.
    pub fn begin_next(&mut self) -> Option<WriteOperation> {
        let op = self.high.pop_front().or_else(|| self.normal.pop_front())?;
        self.in_flight.push(op.clone());
        Some(op)
    }

    /// Retire an in-flight operation.
    pub fn finish(&mut self, id: u64, succeeded: bool) {
        if let Some(pos) = self.in_flight.iter().position(|op| op.id == id) {
            let op = self.in_flight.remove(pos);
            if succeeded {
                self.stats.flushed_ops += 1;
                self.stats.flushed_records += op.writes.len() as u64;
            } else {
                self.stats.failed_ops += 1;
            }
        }
    }

    /// Latest value for `key` that has not been confirmed by the backend yet.
    pub fn pending(&self, cache: &str, key: &str) -> Option<PendingWrite> {
        self.iter_all()
            .filter(|op| op.cache == cache)
            .flat_map(|op| op.writes.iter())
            .filter(|w| w.key == key)
            .max_by_key(|w| w.version)
            .cloned()
    }

    /// Number of operations waiting (not counting in-flight ones).
    pub fn len(&self) -> usize {
        self.high.len() + self.normal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            pending: self.len(),
            ..self.stats
        }
    }

    fn has_newer(&self, cache: &str, key: &str, version: u64) -> bool {
        self.iter_all()
            .filter(|op| op.cache == cache)
            .flat_map(|op| op.writes.iter())
            .any(|w| w.key == key && w.version > version)
    }

    fn iter_all(&self) -> impl Iterator<Item = &WriteOperation> {
        self.high
            .iter()
            .chain(self.normal.iter())
            .chain(self.in_flight.iter())
    }
}
