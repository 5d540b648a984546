//! Producer side of the pipeline: validate, create, then enqueue.
//!
//! Ordering: the record is created (and visible) strictly before its id
//! is pushed. There is no transaction spanning store and queue, so a
//! failed push leaves an orphan record that only a reconciliation sweep
//! can recover.

use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error, info};
use validator::{Validate, ValidationError};

use crate::error::{Error, Result};
use crate::feedback::{FeedbackRecord, NewFeedback};
use crate::limits::MAX_CONTENT_BYTES;
use crate::queue::WorkQueue;
use crate::store::RecordStore;

/// Direct submission body.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct IngestRequest {
    #[serde(default)]
    #[validate(custom(function = "validate_content"))]
    pub content: String,
    #[serde(default)]
    #[validate(
        length(min = 1, max = 128, message = "source is required"),
        custom(function = "validate_not_blank", message = "source is required")
    )]
    pub source: String,
}

fn validate_not_blank(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank"));
    }
    Ok(())
}

/// Non-blank and at most `MAX_CONTENT_BYTES` of UTF-8.
fn validate_content(value: &str) -> std::result::Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("blank").with_message(Cow::from("content is required")));
    }
    if value.len() > MAX_CONTENT_BYTES {
        return Err(ValidationError::new("too_large").with_message(Cow::from(format!(
            "content exceeds {} bytes",
            MAX_CONTENT_BYTES
        ))));
    }
    Ok(())
}

impl IngestRequest {
    /// Parses and validates a raw request body.
    pub fn parse(body: &[u8]) -> Result<Self> {
        let request: IngestRequest = serde_json::from_slice(body)
            .map_err(|e| Error::validation(format!("invalid JSON body: {}", e)))?;
        request.validate_fields()?;
        Ok(request)
    }

    /// Runs field validation.
    pub fn validate_fields(&self) -> Result<()> {
        self.validate()
            .map_err(|e| Error::validation(format!("{}", e)))
    }

    pub fn into_new_feedback(self) -> NewFeedback {
        NewFeedback::new(self.content, self.source)
    }
}

/// Creates records and enqueues their ids.
#[derive(Clone)]
pub struct Ingestor {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn WorkQueue>,
}

impl Ingestor {
    pub fn new(store: Arc<dyn RecordStore>, queue: Arc<dyn WorkQueue>) -> Self {
        Self { store, queue }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    pub fn queue(&self) -> &Arc<dyn WorkQueue> {
        &self.queue
    }

    /// Creates an unprocessed record, then pushes its id.
    ///
    /// - create fails: returns the store error, nothing is pushed.
    /// - push fails: the record stays (orphaned) and the queue error is
    ///   returned so the caller does not report acceptance.
    pub async fn submit(&self, input: NewFeedback) -> Result<FeedbackRecord> {
        let start = Instant::now();
        let source = input.source.clone();

        let record = self.store.create(input).await.map_err(|e| {
            error!(source = %source, error = %e, "Failed to create feedback record");
            metrics().store_errors.inc();
            e
        })?;

        debug!(feedback_id = %record.id, source = %source, "Feedback record created");

        if let Err(e) = self.queue.push(record.id).await {
            error!(
                feedback_id = %record.id,
                source = %source,
                error = %e,
                "Failed to enqueue feedback, record is orphaned"
            );
            metrics().feedback_orphaned.inc();
            return Err(e);
        }

        metrics().feedback_queued.inc();
        let latency_ms = start.elapsed().as_millis() as u64;
        metrics().ingest_latency_ms.observe(latency_ms);

        info!(
            feedback_id = %record.id,
            source = %source,
            latency_ms = latency_ms,
            "Feedback queued for analysis"
        );

        Ok(record)
    }
}
