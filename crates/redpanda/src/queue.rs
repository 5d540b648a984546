//! `WorkQueue` implementation on a single-partition Redpanda topic.
//!
//! Each record value is the UTF-8 form of a feedback id. Pushes append
//! one record; pops read forward from the consumer position. With an
//! offset store attached, the position after an id is saved before the id
//! is handed out, so neither this process nor a restarted one returns it
//! again.

use async_trait::async_trait;
use funnel_core::{Error, FeedbackId, OffsetStore, PopTimeout, Result, WorkQueue};
use parking_lot::Mutex;
use std::sync::Arc;
use std::time::Duration;
use telemetry::metrics;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::config::{RedpandaConfig, StartOffset};
use crate::cursor::ReadCursor;
use crate::log::{FetchOutcome, KafkaPartition, PartitionLog, PARTITION};

/// Work queue backed by a Redpanda topic.
pub struct RedpandaQueue {
    config: RedpandaConfig,
    log: Arc<dyn PartitionLog>,
    offsets: Option<Arc<dyn OffsetStore>>,
    cursor: Mutex<ReadCursor>,
    /// Serializes pops; never taken by `depth`.
    reader: tokio::sync::Mutex<()>,
}

impl RedpandaQueue {
    /// Creates a queue. The broker connection is opened lazily.
    pub fn new(config: RedpandaConfig) -> Self {
        let log = Arc::new(KafkaPartition::new(config.clone()));
        Self::from_log(config, log)
    }

    /// Creates a queue over any partition log.
    pub fn from_log(config: RedpandaConfig, log: Arc<dyn PartitionLog>) -> Self {
        info!(
            brokers = %config.broker_string(),
            topic = %config.topic,
            start_offset = ?config.start_offset,
            "Creating Redpanda work queue"
        );

        Self {
            config,
            log,
            offsets: None,
            cursor: Mutex::new(ReadCursor::new()),
            reader: tokio::sync::Mutex::new(()),
        }
    }

    /// Persists the read position in `offsets`.
    pub fn with_offset_store(mut self, offsets: Arc<dyn OffsetStore>) -> Self {
        self.offsets = Some(offsets);
        self
    }

    pub fn config(&self) -> &RedpandaConfig {
        &self.config
    }

    /// Saved position if there is one, otherwise the configured start.
    async fn start_position(&self) -> Result<i64> {
        if let Some(offsets) = &self.offsets {
            if let Some(saved) = offsets.load(&self.config.topic, PARTITION).await? {
                info!(topic = %self.config.topic, offset = saved, "Resuming queue at saved offset");
                return Ok(saved);
            }
        }

        let offset = match self.config.start_offset {
            StartOffset::Earliest => self.log.earliest().await?,
            StartOffset::Latest => self.log.latest().await?,
        };
        info!(
            topic = %self.config.topic,
            partition = PARTITION,
            offset = offset,
            "Queue reader initialized at offset"
        );
        Ok(offset)
    }

    async fn ensure_position(&self) -> Result<()> {
        if self.cursor.lock().is_initialized() {
            return Ok(());
        }
        let start = self.start_position().await?;
        self.cursor.lock().init(start);
        Ok(())
    }

    async fn save_position(&self, next_offset: i64) -> Result<()> {
        let Some(offsets) = &self.offsets else {
            return Ok(());
        };
        offsets
            .save(&self.config.topic, PARTITION, next_offset)
            .await
            .map_err(|e| Error::queue(format!("Failed to save queue offset: {}", e)))
    }

    /// One fetch of at most `wait` into the cursor.
    async fn fill(&self, wait: Duration) -> Result<()> {
        let from = self.cursor.lock().fetch_from();
        match self.log.fetch(from, wait).await? {
            FetchOutcome::Records(records) => self.cursor.lock().absorb(from, records),
            FetchOutcome::OutOfRange => {
                let earliest = self.log.earliest().await?;
                warn!(offset = from, earliest = earliest, "Queue offset out of range, resetting");
                self.cursor.lock().reset(earliest);
            }
        }
        Ok(())
    }
}

#[async_trait]
impl WorkQueue for RedpandaQueue {
    async fn push(&self, id: FeedbackId) -> Result<()> {
        let offset = self.log.append(id.to_string().into_bytes()).await?;
        debug!(feedback_id = %id, offset = offset, "Pushed feedback id");
        Ok(())
    }

    async fn pop(&self, timeout: PopTimeout) -> Result<Option<FeedbackId>> {
        let _reader = self.reader.lock().await;
        self.ensure_position().await?;

        let poll = Duration::from_millis(self.config.fetch_wait_ms);
        let deadline = match timeout {
            PopTimeout::Infinite => None,
            PopTimeout::Bounded(limit) => Some(Instant::now() + limit),
        };

        loop {
            let next = self.cursor.lock().peek();
            if let Some((id, next_offset)) = next {
                self.save_position(next_offset).await?;
                self.cursor.lock().advance();
                return Ok(Some(id));
            }

            let wait = match deadline {
                None => poll,
                Some(deadline) => {
                    let remaining = deadline.saturating_duration_since(Instant::now());
                    if remaining.is_zero() {
                        return Ok(None);
                    }
                    remaining.min(poll)
                }
            };

            self.fill(wait).await?;
        }
    }

    async fn depth(&self) -> Result<u64> {
        self.ensure_position().await?;
        let latest = self.log.latest().await?;
        let depth = self.cursor.lock().depth(latest);
        metrics().queue_depth.set(depth);
        Ok(depth)
    }

    async fn health_check(&self) -> bool {
        self.log.ping().await
    }
}
