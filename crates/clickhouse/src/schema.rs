//! ClickHouse table schemas.
//!
//! Records are versioned rows in a ReplacingMergeTree: an update inserts a
//! new row with a higher `version`, and reads use `FINAL` so only the
//! latest row per `id` is visible.

/// Name of the feedback table.
pub const FEEDBACK_TABLE: &str = "feedback";

/// Name of the queue consumer position table.
pub const QUEUE_OFFSETS_TABLE: &str = "queue_offsets";

/// SQL for creating the database.
pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE IF NOT EXISTS {}", database)
}

/// SQL for creating the feedback table.
pub fn create_feedback_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{FEEDBACK_TABLE} (
    id String,
    content String,
    source LowCardinality(String),

    -- Enrichment, NULL until processed
    sentiment LowCardinality(Nullable(String)),
    category LowCardinality(Nullable(String)),
    summary Nullable(String),
    is_processed UInt8,

    created_at DateTime64(3),
    updated_at DateTime64(3),
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY id
SETTINGS index_granularity = 8192
"#
    )
}

/// SQL for creating the queue position table.
pub fn create_queue_offsets_table(database: &str) -> String {
    format!(
        r#"
CREATE TABLE IF NOT EXISTS {database}.{QUEUE_OFFSETS_TABLE} (
    topic String,
    partition Int32,
    next_offset Int64,
    version UInt64
)
ENGINE = ReplacingMergeTree(version)
ORDER BY (topic, partition)
"#
    )
}

/// All schema statements, in execution order.
pub fn all_statements(database: &str) -> Vec<String> {
    vec![
        create_database(database),
        create_feedback_table(database),
        create_queue_offsets_table(database),
    ]
}
