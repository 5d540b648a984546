//! Query functions for reading data back (used in tests).

use crate::client::ClickHouseClient;
use crate::schema::FEEDBACK_TABLE;
use funnel_core::{Error, Result};

/// Count distinct feedback records.
pub async fn count_feedback(client: &ClickHouseClient) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!("SELECT count() FROM {} FINAL", FEEDBACK_TABLE))
        .fetch_one()
        .await
        .map_err(|e| Error::store(format!("Query error: {}", e)))?;
    Ok(count)
}

/// Count records still waiting for enrichment.
pub async fn count_unprocessed(client: &ClickHouseClient) -> Result<u64> {
    let count: u64 = client
        .inner()
        .query(&format!(
            "SELECT count() FROM {} FINAL WHERE is_processed = 0",
            FEEDBACK_TABLE
        ))
        .fetch_one()
        .await
        .map_err(|e| Error::store(format!("Query error: {}", e)))?;
    Ok(count)
}
