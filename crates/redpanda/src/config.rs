//! Redpanda configuration.

use serde::{Deserialize, Serialize};

/// Where a consumer with no saved position starts reading.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StartOffset {
    /// Everything still retained.
    Earliest,
    /// Only ids pushed after the consumer connects.
    Latest,
}

/// Redpanda work queue configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RedpandaConfig {
    /// Broker addresses
    pub brokers: Vec<String>,
    /// Topic carrying feedback ids
    #[serde(default = "default_topic")]
    pub topic: String,
    /// SASL username (Redpanda Cloud)
    #[serde(default)]
    pub sasl_username: Option<String>,
    /// SASL password (Redpanda Cloud)
    #[serde(default)]
    pub sasl_password: Option<String>,
    /// Longest single broker long-poll, in milliseconds
    #[serde(default = "default_fetch_wait_ms")]
    pub fetch_wait_ms: u64,
    /// Maximum bytes per fetch
    #[serde(default = "default_fetch_max_bytes")]
    pub fetch_max_bytes: i32,
    #[serde(default = "default_start_offset")]
    pub start_offset: StartOffset,
    /// Compression type (none, gzip, snappy, lz4, zstd)
    #[serde(default = "default_compression")]
    pub compression: String,
    /// Replication factor used when the topic has to be created
    #[serde(default = "default_replication_factor")]
    pub replication_factor: i16,
}

fn default_topic() -> String {
    "feedback_queue".to_string()
}

fn default_fetch_wait_ms() -> u64 {
    1000
}

fn default_fetch_max_bytes() -> i32 {
    1024 * 1024
}

fn default_start_offset() -> StartOffset {
    StartOffset::Earliest
}

fn default_compression() -> String {
    "none".to_string()
}

fn default_replication_factor() -> i16 {
    1
}

impl Default for RedpandaConfig {
    fn default() -> Self {
        Self {
            brokers: vec!["localhost:9092".to_string()],
            topic: default_topic(),
            sasl_username: None,
            sasl_password: None,
            fetch_wait_ms: default_fetch_wait_ms(),
            fetch_max_bytes: default_fetch_max_bytes(),
            start_offset: default_start_offset(),
            compression: default_compression(),
            replication_factor: default_replication_factor(),
        }
    }
}

impl RedpandaConfig {
    /// Returns the broker list as a comma-separated string.
    pub fn broker_string(&self) -> String {
        self.brokers.join(",")
    }

    /// Parses a comma-separated broker list, e.g. from `QUEUE_URL`.
    pub fn parse_brokers(list: &str) -> Vec<String> {
        list.split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(|s| s.trim_start_matches("kafka://").to_string())
            .collect()
    }
}
