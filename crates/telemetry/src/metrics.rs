//! In-process metrics.
//!
//! Counters are cumulative since process start. The worker logs a
//! snapshot periodically and `/health` reports the queue depth gauge.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// A counter metric.
#[derive(Debug, Default)]
pub struct Counter(AtomicU64);

impl Counter {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn inc(&self) {
        self.0.fetch_add(1, Ordering::Relaxed);
    }

    pub fn inc_by(&self, n: u64) {
        self.0.fetch_add(n, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// A gauge metric (can go up or down).
#[derive(Debug, Default)]
pub struct Gauge(AtomicU64);

impl Gauge {
    pub fn new() -> Self {
        Self(AtomicU64::new(0))
    }

    pub fn set(&self, val: u64) {
        self.0.store(val, Ordering::Relaxed);
    }

    pub fn get(&self) -> u64 {
        self.0.load(Ordering::Relaxed)
    }
}

/// Histogram for latency tracking.
#[derive(Debug)]
pub struct Histogram {
    /// Buckets: 1ms, 5ms, 10ms, 25ms, 50ms, 100ms, 250ms, 500ms, 1s, 5s, 10s, 30s
    buckets: [AtomicU64; 12],
    sum: AtomicU64,
    count: AtomicU64,
}

impl Default for Histogram {
    fn default() -> Self {
        Self::new()
    }
}

impl Histogram {
    // Enrichment calls to a hosted model routinely take seconds.
    const BUCKET_BOUNDS: [u64; 12] = [1, 5, 10, 25, 50, 100, 250, 500, 1000, 5000, 10000, 30000];

    pub fn new() -> Self {
        Self {
            buckets: Default::default(),
            sum: AtomicU64::new(0),
            count: AtomicU64::new(0),
        }
    }

    /// Records a value in milliseconds.
    pub fn observe(&self, ms: u64) {
        self.sum.fetch_add(ms, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);

        let idx = Self::BUCKET_BOUNDS
            .iter()
            .position(|&bound| ms <= bound)
            .unwrap_or(Self::BUCKET_BOUNDS.len() - 1);
        self.buckets[idx].fetch_add(1, Ordering::Relaxed);
    }

    pub fn count(&self) -> u64 {
        self.count.load(Ordering::Relaxed)
    }

    pub fn sum(&self) -> u64 {
        self.sum.load(Ordering::Relaxed)
    }

    pub fn mean(&self) -> f64 {
        let count = self.count();
        if count == 0 {
            0.0
        } else {
            self.sum() as f64 / count as f64
        }
    }

    /// Returns bucket counts.
    pub fn buckets(&self) -> Vec<(u64, u64)> {
        Self::BUCKET_BOUNDS
            .iter()
            .zip(self.buckets.iter())
            .map(|(&bound, count)| (bound, count.load(Ordering::Relaxed)))
            .collect()
    }
}

/// Collected metrics for the feedback funnel.
#[derive(Debug, Default)]
pub struct Metrics {
    // Ingestion
    pub feedback_received: Counter,
    pub feedback_rejected: Counter,
    pub feedback_queued: Counter,
    pub feedback_orphaned: Counter,
    pub webhooks_received: Counter,
    pub webhooks_unauthorized: Counter,
    pub webhooks_ignored: Counter,
    pub store_errors: Counter,

    // Worker
    pub items_popped: Counter,
    pub items_processed: Counter,
    pub items_not_found: Counter,
    pub items_already_processed: Counter,
    pub enrichment_failures: Counter,
    pub update_failures: Counter,
    pub queue_pop_errors: Counter,
    pub records_requeued: Counter,

    // Latency histograms
    pub ingest_latency_ms: Histogram,
    pub enrichment_latency_ms: Histogram,

    // Gauges
    pub queue_depth: Gauge,
}

impl Metrics {
    pub fn new() -> Self {
        Self::default()
    }
}

/// A snapshot of metrics at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub timestamp: DateTime<Utc>,
    pub feedback_received: u64,
    pub feedback_rejected: u64,
    pub feedback_queued: u64,
    pub feedback_orphaned: u64,
    pub webhooks_received: u64,
    pub webhooks_unauthorized: u64,
    pub webhooks_ignored: u64,
    pub store_errors: u64,
    pub items_popped: u64,
    pub items_processed: u64,
    pub items_not_found: u64,
    pub items_already_processed: u64,
    pub enrichment_failures: u64,
    pub update_failures: u64,
    pub queue_pop_errors: u64,
    pub records_requeued: u64,
    pub ingest_latency_mean_ms: f64,
    pub enrichment_latency_mean_ms: f64,
    pub queue_depth: u64,
}

impl Metrics {
    /// Takes a snapshot of current metrics.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            timestamp: Utc::now(),
            feedback_received: self.feedback_received.get(),
            feedback_rejected: self.feedback_rejected.get(),
            feedback_queued: self.feedback_queued.get(),
            feedback_orphaned: self.feedback_orphaned.get(),
            webhooks_received: self.webhooks_received.get(),
            webhooks_unauthorized: self.webhooks_unauthorized.get(),
            webhooks_ignored: self.webhooks_ignored.get(),
            store_errors: self.store_errors.get(),
            items_popped: self.items_popped.get(),
            items_processed: self.items_processed.get(),
            items_not_found: self.items_not_found.get(),
            items_already_processed: self.items_already_processed.get(),
            enrichment_failures: self.enrichment_failures.get(),
            update_failures: self.update_failures.get(),
            queue_pop_errors: self.queue_pop_errors.get(),
            records_requeued: self.records_requeued.get(),
            ingest_latency_mean_ms: self.ingest_latency_ms.mean(),
            enrichment_latency_mean_ms: self.enrichment_latency_ms.mean(),
            queue_depth: self.queue_depth.get(),
        }
    }
}

/// Global metrics registry.
pub static METRICS: std::sync::LazyLock<Metrics> = std::sync::LazyLock::new(Metrics::new);

/// Get the global metrics instance.
pub fn metrics() -> &'static Metrics {
    &METRICS
}
