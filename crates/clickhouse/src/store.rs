//! `RecordStore` implementation on ClickHouse.

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use clickhouse::Row;
use funnel_core::{
    Category, Error, FeedbackId, FeedbackRecord, NewFeedback, RecordStore, Result, Sentiment,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use telemetry::metrics;
use tracing::{debug, error};

use crate::client::ClickHouseClient;
use crate::schema::FEEDBACK_TABLE;

const SELECT_COLUMNS: &str =
    "id, content, source, sentiment, category, summary, is_processed, created_at, updated_at, version";

/// Row layout of the feedback table.
#[derive(Debug, Clone, Row, Serialize, Deserialize)]
pub struct FeedbackRow {
    pub id: String,
    pub content: String,
    pub source: String,
    pub sentiment: Option<String>,
    pub category: Option<String>,
    pub summary: Option<String>,
    pub is_processed: u8,
    pub created_at: i64, // milliseconds since epoch
    pub updated_at: i64,
    pub version: u64,
}

impl From<&FeedbackRecord> for FeedbackRow {
    fn from(record: &FeedbackRecord) -> Self {
        Self {
            id: record.id.to_string(),
            content: record.content.clone(),
            source: record.source.clone(),
            sentiment: record.sentiment.as_ref().map(|s| s.as_str().to_string()),
            category: record.category.as_ref().map(|c| c.as_str().to_string()),
            summary: record.summary.clone(),
            is_processed: u8::from(record.is_processed),
            created_at: record.created_at.timestamp_millis(),
            updated_at: record.updated_at.timestamp_millis(),
            // Microseconds keep the update row ahead of the create row.
            version: record.updated_at.timestamp_micros().max(0) as u64,
        }
    }
}

impl TryFrom<FeedbackRow> for FeedbackRecord {
    type Error = Error;

    fn try_from(row: FeedbackRow) -> Result<Self> {
        Ok(Self {
            id: row.id.parse()?,
            content: row.content,
            source: row.source,
            sentiment: row.sentiment.as_deref().map(Sentiment::parse),
            category: row.category.as_deref().map(Category::parse),
            summary: row.summary,
            is_processed: row.is_processed != 0,
            created_at: millis_to_utc(row.created_at)?,
            updated_at: millis_to_utc(row.updated_at)?,
        })
    }
}

fn millis_to_utc(ms: i64) -> Result<DateTime<Utc>> {
    Utc.timestamp_millis_opt(ms)
        .single()
        .ok_or_else(|| Error::store(format!("invalid timestamp {}", ms)))
}

/// Feedback records in ClickHouse.
#[derive(Clone)]
pub struct ClickHouseStore {
    client: Arc<ClickHouseClient>,
}

impl ClickHouseStore {
    pub fn new(client: Arc<ClickHouseClient>) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ClickHouseClient {
        &self.client
    }

    async fn write_row(&self, row: &FeedbackRow) -> Result<()> {
        let start = Instant::now();

        let mut insert = self
            .client
            .inner()
            .insert(FEEDBACK_TABLE)
            .map_err(|e| Error::store(format!("Insert error: {}", e)))?;

        insert
            .write(row)
            .await
            .map_err(|e| Error::store(format!("Write error: {}", e)))?;

        insert
            .end()
            .await
            .map_err(|e| Error::store(format!("End error: {}", e)))?;

        debug!(
            feedback_id = %row.id,
            version = row.version,
            latency_ms = %start.elapsed().as_millis(),
            "Wrote feedback row"
        );
        Ok(())
    }

    fn rows_to_records(rows: Vec<FeedbackRow>) -> Result<Vec<FeedbackRecord>> {
        rows.into_iter().map(FeedbackRecord::try_from).collect()
    }
}

#[async_trait]
impl RecordStore for ClickHouseStore {
    async fn create(&self, input: NewFeedback) -> Result<FeedbackRecord> {
        let record = FeedbackRecord::new(input);
        self.write_row(&FeedbackRow::from(&record)).await?;
        Ok(record)
    }

    async fn get(&self, id: FeedbackId) -> Result<Option<FeedbackRecord>> {
        let query = format!(
            "SELECT {} FROM {} FINAL WHERE id = ? LIMIT 1",
            SELECT_COLUMNS, FEEDBACK_TABLE
        );
        let row = self
            .client
            .inner()
            .query(&query)
            .bind(id.to_string())
            .fetch_optional::<FeedbackRow>()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        row.map(FeedbackRecord::try_from).transpose()
    }

    async fn update(&self, record: &FeedbackRecord) -> Result<()> {
        self.write_row(&FeedbackRow::from(record))
            .await
            .map_err(|e| {
                error!(feedback_id = %record.id, error = %e, "Failed to update feedback row");
                metrics().store_errors.inc();
                e
            })
    }

    async fn list(&self) -> Result<Vec<FeedbackRecord>> {
        let query = format!(
            "SELECT {} FROM {} FINAL ORDER BY created_at DESC, id DESC",
            SELECT_COLUMNS, FEEDBACK_TABLE
        );
        let rows = self
            .client
            .inner()
            .query(&query)
            .fetch_all::<FeedbackRow>()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        Self::rows_to_records(rows)
    }

    async fn list_unprocessed_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<FeedbackId>> {
        let query = format!(
            "SELECT id FROM {} FINAL WHERE is_processed = 0 AND created_at < fromUnixTimestamp64Milli(toInt64(?)) ORDER BY created_at ASC",
            FEEDBACK_TABLE
        );
        let ids = self
            .client
            .inner()
            .query(&query)
            .bind(cutoff.timestamp_millis())
            .fetch_all::<String>()
            .await
            .map_err(|e| Error::store(format!("Query error: {}", e)))?;

        ids.iter().map(|id| id.parse()).collect()
    }

    async fn health_check(&self) -> bool {
        crate::health::check_connection(&self.client).await
    }
}
