//! Re-queues records that have stayed unprocessed for too long.
//!
//! Covers ids whose push failed after the record was created and items
//! whose enrichment failed. Disabled unless configured.

use chrono::{TimeDelta, Utc};
use funnel_core::{Error, RecordStore, Result, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Reconcile sweep configuration.
#[derive(Debug, Clone)]
pub struct ReconcileConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Only records older than this are re-queued
    pub min_age: Duration,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            min_age: Duration::from_secs(600),
        }
    }
}

pub struct ReconcileWorker {
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn WorkQueue>,
    config: ReconcileConfig,
}

impl ReconcileWorker {
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        config: ReconcileConfig,
    ) -> Self {
        Self {
            store,
            queue,
            config,
        }
    }

    /// Sweeps every `interval` until `shutdown` is cancelled.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            interval_secs = self.config.interval.as_secs(),
            min_age_secs = self.config.min_age.as_secs(),
            "Reconcile worker starting"
        );

        let mut ticker = interval(self.config.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {}
            }

            if let Err(e) = self.run_once().await {
                error!(error = %e, "Reconcile sweep failed");
            }
        }

        info!("Reconcile worker stopped");
    }

    /// One sweep. Returns how many ids were pushed again.
    pub async fn run_once(&self) -> Result<usize> {
        let min_age = TimeDelta::from_std(self.config.min_age)
            .map_err(|e| Error::internal(format!("Invalid reconcile min age: {}", e)))?;
        let cutoff = Utc::now() - min_age;

        let ids = self.store.list_unprocessed_before(cutoff).await?;
        if ids.is_empty() {
            debug!("No stale unprocessed feedback");
            return Ok(0);
        }

        let mut requeued = 0;
        for id in ids {
            match self.queue.push(id).await {
                Ok(()) => requeued += 1,
                Err(e) => {
                    warn!(feedback_id = %id, error = %e, "Failed to re-queue feedback");
                    break;
                }
            }
        }

        metrics().records_requeued.inc_by(requeued as u64);
        info!(requeued = requeued, "Re-queued stale unprocessed feedback");
        Ok(requeued)
    }
}
