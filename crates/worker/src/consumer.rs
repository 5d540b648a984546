//! Feedback worker: pops ids from the work queue and enriches records.
//!
//! One item is in flight at a time:
//! 1. Pop the next id (blocks while idle)
//! 2. Load the record
//! 3. Enrich its content
//! 4. Store the enriched record, marked processed
//!
//! Per-item failures are logged and the item is dropped. Nothing is
//! re-queued here; see [`crate::reconcile`] for the opt-in sweep.

use funnel_core::{FeedbackId, PopTimeout, RecordStore, Result, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::enrichment::Analyzer;

/// Feedback worker configuration.
#[derive(Debug, Clone)]
pub struct FeedbackWorkerConfig {
    /// Pause after a failed pop before trying again
    pub pop_error_pause: Duration,
}

impl Default for FeedbackWorkerConfig {
    fn default() -> Self {
        Self {
            pop_error_pause: Duration::from_secs(1),
        }
    }
}

/// What happened to one popped item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// Enriched and stored as processed.
    Processed,
    /// No record with the popped id.
    NotFound,
    /// The record could not be loaded.
    LoadFailed,
    /// Record was already processed (redelivered id).
    AlreadyProcessed,
    /// Enrichment failed; the record stays unprocessed.
    EnrichmentFailed,
    /// Enrichment succeeded but the update was not stored.
    UpdateFailed,
    /// Nothing arrived before the pop timeout.
    Empty,
}

/// Single sequential consumer of the work queue.
pub struct FeedbackWorker {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn WorkQueue>,
    analyzer: Arc<dyn Analyzer>,
    config: FeedbackWorkerConfig,
}

impl FeedbackWorker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self::with_config(store, queue, analyzer, FeedbackWorkerConfig::default())
    }

    pub fn with_config(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        analyzer: Arc<dyn Analyzer>,
        config: FeedbackWorkerConfig,
    ) -> Self {
        Self {
            store,
            queue,
            analyzer,
            config,
        }
    }

    /// Main loop: pop, handle, repeat until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed while idle; an item already popped is
    /// always handled to completion.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!("Feedback worker starting");

        loop {
            let popped = tokio::select! {
                _ = shutdown.cancelled() => break,
                popped = self.queue.pop(PopTimeout::Infinite) => popped,
            };

            match popped {
                Ok(Some(id)) => {
                    let outcome = self.handle(id).await;
                    debug!(feedback_id = %id, outcome = ?outcome, "Item handled");
                }
                Ok(None) => {}
                Err(e) => {
                    error!(error = %e, "Queue pop failed");
                    metrics().queue_pop_errors.inc();
                    tokio::select! {
                        _ = shutdown.cancelled() => break,
                        _ = tokio::time::sleep(self.config.pop_error_pause) => {}
                    }
                }
            }
        }

        info!("Feedback worker stopped");
    }

    /// Pops and handles at most one item.
    pub async fn process_next(&self, timeout: PopTimeout) -> Result<ItemOutcome> {
        match self.queue.pop(timeout).await? {
            Some(id) => Ok(self.handle(id).await),
            None => Ok(ItemOutcome::Empty),
        }
    }

    /// Handles one popped id. Never fails; every failure is an outcome.
    pub async fn handle(&self, id: FeedbackId) -> ItemOutcome {
        metrics().items_popped.inc();

        let mut record = match self.store.get(id).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                warn!(feedback_id = %id, "Feedback not found, dropping item");
                metrics().items_not_found.inc();
                return ItemOutcome::NotFound;
            }
            Err(e) => {
                error!(feedback_id = %id, error = %e, "Failed to load feedback, dropping item");
                metrics().store_errors.inc();
                return ItemOutcome::LoadFailed;
            }
        };

        if record.is_processed {
            debug!(feedback_id = %id, "Feedback already processed, skipping");
            metrics().items_already_processed.inc();
            return ItemOutcome::AlreadyProcessed;
        }

        let enrichment = match self.analyzer.analyze(&record.content).await {
            Ok(enrichment) => enrichment,
            Err(e) => {
                error!(feedback_id = %id, error = %e, "Enrichment failed, record left unprocessed");
                metrics().enrichment_failures.inc();
                return ItemOutcome::EnrichmentFailed;
            }
        };

        record.apply_enrichment(enrichment);

        if let Err(e) = self.store.update(&record).await {
            error!(feedback_id = %id, error = %e, "Failed to store enriched feedback");
            metrics().update_failures.inc();
            return ItemOutcome::UpdateFailed;
        }

        metrics().items_processed.inc();
        info!(
            feedback_id = %id,
            sentiment = %record.sentiment.as_ref().map(|s| s.as_str()).unwrap_or_default(),
            category = %record.category.as_ref().map(|c| c.as_str()).unwrap_or_default(),
            "Processed feedback"
        );
        ItemOutcome::Processed
    }
}
