//! Core types, store/queue contracts, and the ingestion pipeline for the
//! feedback funnel.

pub mod error;
pub mod feedback;
pub mod ingest;
pub mod limits;
pub mod queue;
pub mod store;
pub mod webhook;

pub use error::{Error, Result, ValidationErrorCode};
pub use feedback::*;
pub use ingest::{IngestRequest, Ingestor};
pub use queue::{InMemoryOffsetStore, InMemoryQueue, OffsetStore, PopTimeout, WorkQueue};
pub use store::{InMemoryStore, RecordStore};
pub use webhook::{GitHubIssueEvent, IssueAction, WebhookVerifier};
