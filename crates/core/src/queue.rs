//! Work queue contract and the in-memory backend.
//!
//! The queue carries only record identifiers. `pop` removes the entry
//! immediately; there is no visibility timeout or ack.

use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

use crate::error::{Error, Result};
use crate::feedback::FeedbackId;

/// How long a pop may wait for an entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PopTimeout {
    /// Block until an entry is available (worker steady state).
    Infinite,
    /// Give up after the duration and return `None`.
    Bounded(Duration),
}

/// Durable FIFO of record identifiers.
#[async_trait]
pub trait WorkQueue: Send + Sync {
    /// Appends an id. Does not wait for a consumer.
    async fn push(&self, id: FeedbackId) -> Result<()>;

    /// Removes and returns the oldest id, waiting up to `timeout`.
    async fn pop(&self, timeout: PopTimeout) -> Result<Option<FeedbackId>>;

    /// Best-effort number of waiting entries.
    async fn depth(&self) -> Result<u64>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// Durable read position of a queue consumer.
///
/// A log-backed queue saves the offset after each handed-out entry before
/// returning it, so a restarted consumer resumes where the last one
/// stopped instead of replaying the log.
#[async_trait]
pub trait OffsetStore: Send + Sync {
    /// Next offset to read for the partition, if one was ever saved.
    async fn load(&self, topic: &str, partition: i32) -> Result<Option<i64>>;

    /// Records the next offset to read.
    async fn save(&self, topic: &str, partition: i32, next_offset: i64) -> Result<()>;
}

/// Offsets kept in process memory.
#[derive(Clone, Default)]
pub struct InMemoryOffsetStore {
    offsets: Arc<Mutex<HashMap<(String, i32), i64>>>,
    fail_save: Arc<AtomicBool>,
}

impl InMemoryOffsetStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `save` calls fail.
    pub fn set_fail_save(&self, fail: bool) {
        self.fail_save.store(fail, Ordering::SeqCst);
    }

    pub fn get(&self, topic: &str, partition: i32) -> Option<i64> {
        self.offsets
            .lock()
            .get(&(topic.to_string(), partition))
            .copied()
    }
}

#[async_trait]
impl OffsetStore for InMemoryOffsetStore {
    async fn load(&self, topic: &str, partition: i32) -> Result<Option<i64>> {
        Ok(self.get(topic, partition))
    }

    async fn save(&self, topic: &str, partition: i32, next_offset: i64) -> Result<()> {
        if self.fail_save.load(Ordering::SeqCst) {
            return Err(Error::store("in-memory offset save failure"));
        }
        self.offsets
            .lock()
            .insert((topic.to_string(), partition), next_offset);
        Ok(())
    }
}

/// In-memory FIFO queue.
///
/// Used for local development and tests. Push failures can be injected
/// to exercise the orphan path.
#[derive(Clone, Default)]
pub struct InMemoryQueue {
    entries: Arc<Mutex<VecDeque<FeedbackId>>>,
    notify: Arc<Notify>,
    fail_push: Arc<AtomicBool>,
    fail_pop: Arc<AtomicBool>,
}

impl InMemoryQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `push` calls fail.
    pub fn set_fail_push(&self, fail: bool) {
        self.fail_push.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `pop` calls fail.
    pub fn set_fail_pop(&self, fail: bool) {
        self.fail_pop.store(fail, Ordering::SeqCst);
    }

    /// Entries currently waiting, front first.
    pub fn pending(&self) -> Vec<FeedbackId> {
        self.entries.lock().iter().copied().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().is_empty()
    }

    async fn wait_for_entry(&self) -> FeedbackId {
        loop {
            let next = self.entries.lock().pop_front();
            if let Some(id) = next {
                return id;
            }
            // notify_one stores a permit when nobody waits, so a push
            // between the check above and this await is not lost.
            self.notify.notified().await;
        }
    }
}

#[async_trait]
impl WorkQueue for InMemoryQueue {
    async fn push(&self, id: FeedbackId) -> Result<()> {
        if self.fail_push.load(Ordering::SeqCst) {
            return Err(Error::queue("in-memory queue push failure"));
        }

        self.entries.lock().push_back(id);
        self.notify.notify_one();
        Ok(())
    }

    async fn pop(&self, timeout: PopTimeout) -> Result<Option<FeedbackId>> {
        if self.fail_pop.load(Ordering::SeqCst) {
            return Err(Error::queue("in-memory queue pop failure"));
        }

        match timeout {
            PopTimeout::Infinite => Ok(Some(self.wait_for_entry().await)),
            PopTimeout::Bounded(limit) => {
                Ok(tokio::time::timeout(limit, self.wait_for_entry()).await.ok())
            }
        }
    }

    async fn depth(&self) -> Result<u64> {
        Ok(self.entries.lock().len() as u64)
    }
}
