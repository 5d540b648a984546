//! Redpanda health checks and topic bootstrap.

use crate::config::RedpandaConfig;
use crate::connection::connect;
use tracing::{debug, error, info, warn};

const CREATE_TOPIC_TIMEOUT_MS: i32 = 5_000;

/// Check Redpanda connection health.
pub async fn check_connection(config: &RedpandaConfig) -> bool {
    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            error!(error = %e, "Redpanda connection failed");
            return false;
        }
    };

    match client.list_topics().await {
        Ok(topics) => {
            debug!(topics = topics.len(), "Redpanda connection healthy");
            true
        }
        Err(e) => {
            error!("Failed to list Redpanda topics: {}", e);
            false
        }
    }
}

/// Creates the queue topic with a single partition if it does not exist.
///
/// Failures are logged; the queue reports them again on first use.
pub async fn ensure_topic(config: &RedpandaConfig) {
    let client = match connect(config).await {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "Skipping topic bootstrap");
            return;
        }
    };

    match client.list_topics().await {
        Ok(topics) if topics.iter().any(|t| t.name == config.topic) => {
            debug!(topic = %config.topic, "Queue topic exists");
            return;
        }
        Ok(_) => {}
        Err(e) => {
            warn!(error = %e, "Failed to list topics");
            return;
        }
    }

    let controller = match client.controller_client() {
        Ok(controller) => controller,
        Err(e) => {
            warn!(error = %e, "No controller available for topic creation");
            return;
        }
    };

    match controller
        .create_topic(
            config.topic.clone(),
            1,
            config.replication_factor,
            CREATE_TOPIC_TIMEOUT_MS,
        )
        .await
    {
        Ok(()) => info!(topic = %config.topic, "Created queue topic"),
        Err(e) => warn!(topic = %config.topic, error = %e, "Failed to create queue topic"),
    }
}
