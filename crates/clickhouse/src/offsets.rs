//! `OffsetStore` implementation on ClickHouse.
//!
//! One row version per save; the highest `version` for a topic and
//! partition is the current position.

use async_trait::async_trait;
use chrono::Utc;
use clickhouse::Row;
use funnel_core::{Error, OffsetStore, Result};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::debug;

use crate::client::ClickHouseClient;
use crate::schema::QUEUE_OFFSETS_TABLE;

#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct OffsetRow {
    pub topic: String,
    pub partition: i32,
    pub next_offset: i64,
    pub version: u64,
}

/// Queue consumer positions in ClickHouse.
pub struct ClickHouseOffsetStore {
    client: Arc<ClickHouseClient>,
    last_version: AtomicU64,
}

impl ClickHouseOffsetStore {
    pub fn new(client: Arc<ClickHouseClient>) -> Self {
        Self {
            client,
            last_version: AtomicU64::new(0),
        }
    }

    /// Wall-clock microseconds, bumped so saves from this process never
    /// share a version.
    fn next_version(&self) -> u64 {
        let now = Utc::now().timestamp_micros().max(0) as u64;
        let mut last = self.last_version.load(Ordering::SeqCst);
        loop {
            let version = now.max(last + 1);
            match self.last_version.compare_exchange(
                last,
                version,
                Ordering::SeqCst,
                Ordering::SeqCst,
            ) {
                Ok(_) => return version,
                Err(current) => last = current,
            }
        }
    }
}

#[async_trait]
impl OffsetStore for ClickHouseOffsetStore {
    async fn load(&self, topic: &str, partition: i32) -> Result<Option<i64>> {
        let query = format!(
            "SELECT next_offset FROM {} FINAL WHERE topic = ? AND partition = ? LIMIT 1",
            QUEUE_OFFSETS_TABLE
        );
        self.client
            .inner()
            .query(&query)
            .bind(topic)
            .bind(partition)
            .fetch_optional::<i64>()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))
    }

    async fn save(&self, topic: &str, partition: i32, next_offset: i64) -> Result<()> {
        let row = OffsetRow {
            topic: topic.to_string(),
            partition,
            next_offset,
            version: self.next_version(),
        };

        let mut insert = self
            .client
            .inner()
            .insert(QUEUE_OFFSETS_TABLE)
            .map_err(|e| Error::store(format!("Insert error: {}", e)))?;
        insert
            .write(&row)
            .await
            .map_err(|e| Error::store(format!("Write error: {}", e)))?;
        insert
            .end()
            .await
            .map_err(|e| Error::store(format!("End error: {}", e)))?;

        debug!(topic = %topic, partition = partition, next_offset = next_offset, "Saved queue offset");
        Ok(())
    }
}
