//! Worker scheduler for background tasks.

use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::info;

use funnel_core::{RecordStore, WorkQueue};

use crate::consumer::{FeedbackWorker, FeedbackWorkerConfig};
use crate::enrichment::Analyzer;
use crate::reconcile::{ReconcileConfig, ReconcileWorker};

/// Worker scheduler configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause after a failed queue pop
    pub pop_error_pause: Duration,
    /// Whether the reconcile sweep runs at all
    pub reconcile_enabled: bool,
    /// Reconcile sweep interval
    pub reconcile_interval: Duration,
    /// Minimum age of an unprocessed record before it is re-queued
    pub reconcile_min_age: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            pop_error_pause: Duration::from_secs(1),
            reconcile_enabled: false,
            reconcile_interval: Duration::from_secs(300), // 5 minutes
            reconcile_min_age: Duration::from_secs(600),  // 10 minutes
        }
    }
}

/// Background worker scheduler.
pub struct WorkerScheduler {
    config: WorkerConfig,
    store: Arc<dyn RecordStore>,
    queue: Arc<dyn WorkQueue>,
    analyzer: Arc<dyn Analyzer>,
}

impl WorkerScheduler {
    pub fn new(
        config: WorkerConfig,
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        analyzer: Arc<dyn Analyzer>,
    ) -> Self {
        Self {
            config,
            store,
            queue,
            analyzer,
        }
    }

    /// Starts all background workers. Each stops when `shutdown` is cancelled.
    pub fn start(&self, shutdown: CancellationToken) -> Vec<tokio::task::JoinHandle<()>> {
        let mut handles = Vec::new();

        let worker = FeedbackWorker::with_config(
            self.store.clone(),
            self.queue.clone(),
            self.analyzer.clone(),
            FeedbackWorkerConfig {
                pop_error_pause: self.config.pop_error_pause,
            },
        );
        let token = shutdown.clone();
        handles.push(tokio::spawn(async move {
            worker.run(token).await;
        }));
        info!("Feedback worker started");

        if self.config.reconcile_enabled {
            let reconcile = ReconcileWorker::new(
                self.store.clone(),
                self.queue.clone(),
                ReconcileConfig {
                    interval: self.config.reconcile_interval,
                    min_age: self.config.reconcile_min_age,
                },
            );
            let token = shutdown.clone();
            handles.push(tokio::spawn(async move {
                reconcile.run(token).await;
            }));
            info!("Reconcile worker started");
        }

        info!(workers = handles.len(), "Background workers started");
        handles
    }
}
