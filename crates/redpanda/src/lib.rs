//! Redpanda-backed work queue for the feedback funnel.
//!
//! The queue is a single-partition topic whose record values are feedback
//! ids. One partition keeps pushes and pops in FIFO order, and the consumer
//! position is saved through an `OffsetStore` so restarts do not replay it.

pub mod config;
pub mod connection;
pub mod cursor;
pub mod health;
pub mod log;
pub mod queue;

pub use config::*;
pub use log::{FetchOutcome, KafkaPartition, LogRecord, PartitionLog};
pub use queue::RedpandaQueue;
