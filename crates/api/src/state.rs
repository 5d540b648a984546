//! Application state shared across handlers.

use funnel_core::{Ingestor, RecordStore, WebhookVerifier, WorkQueue};
use std::sync::Arc;
use tracing::warn;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Create-then-push pipeline used by both intake routes
    pub ingestor: Ingestor,
    /// Record store (ClickHouse in production, in-memory in tests)
    pub store: Arc<dyn RecordStore>,
    /// Work queue (Redpanda in production, in-memory in tests)
    pub queue: Arc<dyn WorkQueue>,
    /// GitHub webhook signature check
    pub verifier: Arc<WebhookVerifier>,
}

impl AppState {
    /// `webhook_secret` empty or absent disables signature verification.
    pub fn new(
        store: Arc<dyn RecordStore>,
        queue: Arc<dyn WorkQueue>,
        webhook_secret: Option<&str>,
    ) -> Self {
        let verifier = WebhookVerifier::new(webhook_secret);
        if !verifier.is_enabled() {
            warn!("GITHUB_WEBHOOK_SECRET not set, webhook signatures will not be verified");
        }

        Self {
            ingestor: Ingestor::new(store.clone(), queue.clone()),
            store,
            queue,
            verifier: Arc::new(verifier),
        }
    }
}
