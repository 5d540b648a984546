//! ClickHouse health checks.

use crate::client::ClickHouseClient;
use crate::schema::all_statements;
use funnel_core::{Error, Result};
use tracing::{debug, error};

/// Check ClickHouse connection health.
pub async fn check_connection(client: &ClickHouseClient) -> bool {
    match client.server().query("SELECT 1").fetch_one::<u8>().await {
        Ok(_) => {
            debug!("ClickHouse connection healthy");
            true
        }
        Err(e) => {
            error!("ClickHouse health check failed: {}", e);
            false
        }
    }
}

/// Initialize database schema.
pub async fn init_schema(client: &ClickHouseClient) -> Result<()> {
    for ddl in all_statements(&client.config().database) {
        client
            .server()
            .query(&ddl)
            .execute()
            .await
            .map_err(|e| Error::store(format!("Failed to execute DDL: {}", e)))?;
    }

    debug!(database = %client.config().database, "ClickHouse schema initialized");
    Ok(())
}
