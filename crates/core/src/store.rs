//! Record store contract and the in-memory backend.
//!
//! The store is a keyed CRUD collaborator: records are created by the
//! ingestion endpoints, updated once by the worker, never deleted.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::feedback::{FeedbackId, FeedbackRecord, NewFeedback};

/// Durable keyed storage for feedback records.
///
/// Implementations must be safe for concurrent use from many request
/// handlers and the worker at once.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Persists a new unprocessed record and returns it with its id.
    ///
    /// When this returns, the record must be visible to `get`.
    async fn create(&self, input: NewFeedback) -> Result<FeedbackRecord>;

    /// Loads a record by id.
    async fn get(&self, id: FeedbackId) -> Result<Option<FeedbackRecord>>;

    /// Replaces the stored record with the same id.
    async fn update(&self, record: &FeedbackRecord) -> Result<()>;

    /// All records, newest first.
    async fn list(&self) -> Result<Vec<FeedbackRecord>>;

    /// Ids of unprocessed records created before `cutoff`, oldest first.
    async fn list_unprocessed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackId>>;

    /// Checks that the backend is reachable.
    async fn health_check(&self) -> bool {
        true
    }
}

/// In-memory record store.
///
/// Used for local development and tests. Failure injection lets tests
/// exercise store errors on create and update separately.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    records: Arc<RwLock<BTreeMap<FeedbackId, FeedbackRecord>>>,
    fail_create: Arc<AtomicBool>,
    fail_update: Arc<AtomicBool>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make subsequent `create` calls fail.
    pub fn set_fail_create(&self, fail: bool) {
        self.fail_create.store(fail, Ordering::SeqCst);
    }

    /// Make subsequent `update` calls fail.
    pub fn set_fail_update(&self, fail: bool) {
        self.fail_update.store(fail, Ordering::SeqCst);
    }

    /// Number of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Snapshot of a record, bypassing the async trait.
    pub fn snapshot(&self, id: FeedbackId) -> Option<FeedbackRecord> {
        self.records.read().get(&id).cloned()
    }

    /// Inserts a record as-is (test setup).
    pub fn insert(&self, record: FeedbackRecord) {
        self.records.write().insert(record.id, record);
    }
}

#[async_trait]
impl RecordStore for InMemoryStore {
    async fn create(&self, input: NewFeedback) -> Result<FeedbackRecord> {
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(Error::store("in-memory store create failure"));
        }

        let record = FeedbackRecord::new(input);
        self.records.write().insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: FeedbackId) -> Result<Option<FeedbackRecord>> {
        Ok(self.records.read().get(&id).cloned())
    }

    async fn update(&self, record: &FeedbackRecord) -> Result<()> {
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::store("in-memory store update failure"));
        }

        let mut records = self.records.write();
        match records.get_mut(&record.id) {
            Some(existing) => {
                *existing = record.clone();
                Ok(())
            }
            None => Err(Error::not_found(record.id)),
        }
    }

    async fn list(&self) -> Result<Vec<FeedbackRecord>> {
        let mut records: Vec<_> = self.records.read().values().cloned().collect();
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(records)
    }

    async fn list_unprocessed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackId>> {
        // BTreeMap over UUIDv7 keys iterates oldest first.
        Ok(self
            .records
            .read()
            .values()
            .filter(|r| !r.is_processed && r.created_at < cutoff)
            .map(|r| r.id)
            .collect())
    }
}
