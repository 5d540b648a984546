//! The partition the queue reads and appends to.

use async_trait::async_trait;
use chrono::Utc;
use funnel_core::{Error, Result};
use rskafka::client::error::{Error as ClientError, ProtocolError};
use rskafka::client::partition::{Compression, OffsetAt, PartitionClient, UnknownTopicHandling};
use rskafka::record::Record;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::config::RedpandaConfig;
use crate::connection::connect;

/// Only partition 0 is used; a single partition is what keeps FIFO order.
pub const PARTITION: i32 = 0;

/// One entry read from the log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogRecord {
    pub offset: i64,
    pub value: Option<Vec<u8>>,
}

/// Result of a single fetch.
#[derive(Debug)]
pub enum FetchOutcome {
    /// Records at or after the requested offset. Compressed batches may
    /// also carry records before it.
    Records(Vec<LogRecord>),
    /// The requested offset is no longer (or not yet) in the log.
    OutOfRange,
}

/// An append-only partition.
#[async_trait]
pub trait PartitionLog: Send + Sync {
    /// Appends a value and returns its offset.
    async fn append(&self, value: Vec<u8>) -> Result<i64>;

    /// Reads from `offset`, waiting at most `wait` for new records.
    async fn fetch(&self, offset: i64, wait: Duration) -> Result<FetchOutcome>;

    /// Offset of the oldest retained record.
    async fn earliest(&self) -> Result<i64>;

    /// Offset the next append will get.
    async fn latest(&self) -> Result<i64>;

    /// Whether the partition is reachable.
    async fn ping(&self) -> bool;
}

/// Partition 0 of a Redpanda topic, connected lazily.
pub struct KafkaPartition {
    config: RedpandaConfig,
    client: RwLock<Option<Arc<PartitionClient>>>,
}

impl KafkaPartition {
    pub fn new(config: RedpandaConfig) -> Self {
        Self {
            config,
            client: RwLock::new(None),
        }
    }

    async fn ensure_connected(&self) -> Result<Arc<PartitionClient>> {
        {
            let client = self.client.read().await;
            if let Some(ref c) = *client {
                return Ok(c.clone());
            }
        }

        let client = connect(&self.config).await?;
        let partition_client = client
            .partition_client(
                self.config.topic.clone(),
                PARTITION,
                UnknownTopicHandling::Retry,
            )
            .await
            .map_err(|e| Error::queue(format!("Failed to get partition client: {}", e)))?;
        let partition_client = Arc::new(partition_client);

        *self.client.write().await = Some(partition_client.clone());
        debug!(topic = %self.config.topic, "Connected partition client");
        Ok(partition_client)
    }

    /// Drops the cached connection so the next call reconnects.
    async fn reset_connection(&self) {
        *self.client.write().await = None;
        info!("Redpanda queue connection reset");
    }

    async fn offset_at(&self, at: OffsetAt) -> Result<i64> {
        let client = self.ensure_connected().await?;
        match client.get_offset(at).await {
            Ok(offset) => Ok(offset),
            Err(e) => {
                self.reset_connection().await;
                Err(Error::queue(format!("Failed to get offset: {}", e)))
            }
        }
    }
}

#[async_trait]
impl PartitionLog for KafkaPartition {
    async fn append(&self, value: Vec<u8>) -> Result<i64> {
        let client = self.ensure_connected().await?;

        let record = Record {
            key: None,
            value: Some(value),
            headers: BTreeMap::new(),
            timestamp: Utc::now(),
        };

        let compression = parse_compression(&self.config.compression);
        match client.produce(vec![record], compression).await {
            Ok(offsets) => offsets
                .first()
                .copied()
                .ok_or_else(|| Error::queue("Produce returned no offset")),
            Err(e) => {
                error!(error = %e, "Failed to produce to Redpanda");
                self.reset_connection().await;
                Err(Error::queue(format!("Failed to produce: {}", e)))
            }
        }
    }

    async fn fetch(&self, offset: i64, wait: Duration) -> Result<FetchOutcome> {
        let client = self.ensure_connected().await?;
        let wait_ms = i32::try_from(wait.as_millis()).unwrap_or(i32::MAX);

        match client
            .fetch_records(offset, 1..self.config.fetch_max_bytes, wait_ms)
            .await
        {
            Ok((records, _high_watermark)) => Ok(FetchOutcome::Records(
                records
                    .into_iter()
                    .map(|r| LogRecord {
                        offset: r.offset,
                        value: r.record.value,
                    })
                    .collect(),
            )),
            Err(ClientError::ServerError {
                protocol_error: ProtocolError::OffsetOutOfRange,
                ..
            }) => Ok(FetchOutcome::OutOfRange),
            Err(e) => {
                self.reset_connection().await;
                Err(Error::queue(format!("Failed to fetch records: {}", e)))
            }
        }
    }

    async fn earliest(&self) -> Result<i64> {
        self.offset_at(OffsetAt::Earliest).await
    }

    async fn latest(&self) -> Result<i64> {
        self.offset_at(OffsetAt::Latest).await
    }

    async fn ping(&self) -> bool {
        match self.ensure_connected().await {
            Ok(_) => true,
            Err(e) => {
                error!(error = %e, "Queue health check failed");
                false
            }
        }
    }
}

pub(crate) fn parse_compression(name: &str) -> Compression {
    match name {
        "gzip" => Compression::Gzip,
        "snappy" => Compression::Snappy,
        "lz4" => Compression::Lz4,
        "zstd" => Compression::Zstd,
        _ => Compression::NoCompression,
    }
}
