//! Background workers for the feedback funnel.
//!
//! - Feedback worker (queue → enrichment → store)
//! - Reconcile worker (re-queues records stuck unprocessed, opt-in)
//! - Enrichment (AI sentiment, category and summary)

pub mod consumer;
pub mod enrichment;
pub mod reconcile;
pub mod scheduler;

pub use consumer::*;
pub use enrichment::{parse_analysis, Analyzer, FallbackAnalyzer, OpenAiAnalyzer, OpenAiConfig};
pub use reconcile::{ReconcileConfig, ReconcileWorker};
pub use scheduler::*;
