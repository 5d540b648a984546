//! ClickHouse-backed record store and queue position store for the
//! feedback funnel.

pub mod client;
pub mod config;
pub mod health;
pub mod offsets;
pub mod query;
pub mod schema;
pub mod store;

pub use client::*;
pub use config::*;
pub use offsets::ClickHouseOffsetStore;
pub use query::*;
pub use store::{ClickHouseStore, FeedbackRow};
