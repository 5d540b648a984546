//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use clickhouse_client::{health::init_schema, ClickHouseClient, ClickHouseConfig, ClickHouseStore};
use funnel_core::{InMemoryQueue, InMemoryStore, PopTimeout, RecordStore, WorkQueue};
use std::sync::Arc;
use std::time::Duration;
use worker::{Analyzer, FeedbackWorker, ItemOutcome};

use crate::containers::TestContainers;
use crate::mocks::MockAnalyzer;

/// How long `drain` waits on an empty queue before deciding it is done.
const DRAIN_POLL: PopTimeout = PopTimeout::Bounded(Duration::from_millis(50));

/// Test context with in-memory backends.
///
/// Uses the real Axum router and the real `FeedbackWorker`; only the
/// store, queue and analyzer are in-process doubles.
pub struct TestContext {
    pub store: InMemoryStore,
    pub queue: InMemoryQueue,
    pub analyzer: MockAnalyzer,
    pub router: Router,
}

impl TestContext {
    /// Webhook signatures are not verified.
    pub fn new() -> Self {
        Self::build(None)
    }

    /// Webhook signatures are verified against `secret`.
    pub fn with_webhook_secret(secret: &str) -> Self {
        Self::build(Some(secret))
    }

    fn build(secret: Option<&str>) -> Self {
        let store = InMemoryStore::new();
        let queue = InMemoryQueue::new();
        let state = AppState::new(Arc::new(store.clone()), Arc::new(queue.clone()), secret);

        Self {
            store,
            queue,
            analyzer: MockAnalyzer::new(),
            router: router(state),
        }
    }

    /// A worker over this context's store and queue with the mock analyzer.
    pub fn worker(&self) -> FeedbackWorker {
        self.worker_with(Arc::new(self.analyzer.clone()))
    }

    /// A worker with a custom analyzer.
    pub fn worker_with(&self, analyzer: Arc<dyn Analyzer>) -> FeedbackWorker {
        FeedbackWorker::new(
            Arc::new(self.store.clone()),
            Arc::new(self.queue.clone()),
            analyzer,
        )
    }

    /// Processes queued items until the queue stays empty.
    pub async fn drain(&self) -> Vec<ItemOutcome> {
        drain(&self.worker()).await
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs `process_next` until it reports an empty queue.
pub async fn drain(worker: &FeedbackWorker) -> Vec<ItemOutcome> {
    let mut outcomes = Vec::new();
    loop {
        match worker.process_next(DRAIN_POLL).await {
            Ok(ItemOutcome::Empty) => return outcomes,
            Ok(outcome) => outcomes.push(outcome),
            Err(e) => panic!("queue pop failed while draining: {}", e),
        }
    }
}

/// Test context with a real ClickHouse store and an in-memory queue.
pub struct ClickHouseContext {
    pub containers: TestContainers,
    pub clickhouse: Arc<ClickHouseClient>,
    pub store: Arc<ClickHouseStore>,
    pub queue: InMemoryQueue,
    pub router: Router,
}

impl ClickHouseContext {
    pub async fn new() -> Self {
        let containers = TestContainers::start().await;

        let config = ClickHouseConfig {
            url: containers.clickhouse_url.clone(),
            database: containers.clickhouse_database.clone(),
            username: containers.clickhouse_username.clone(),
            password: containers.clickhouse_password.clone(),
            ..ClickHouseConfig::default()
        };
        let clickhouse =
            Arc::new(ClickHouseClient::new(config).expect("Failed to create ClickHouse client"));

        init_schema(&clickhouse)
            .await
            .expect("Failed to initialize schema");

        let store = Arc::new(ClickHouseStore::new(clickhouse.clone()));
        let queue = InMemoryQueue::new();
        let state = AppState::new(
            store.clone() as Arc<dyn RecordStore>,
            Arc::new(queue.clone()) as Arc<dyn WorkQueue>,
            None,
        );

        Self {
            containers,
            clickhouse,
            store,
            queue,
            router: router(state),
        }
    }

    /// A worker over the ClickHouse store.
    pub fn worker(&self, analyzer: Arc<dyn Analyzer>) -> FeedbackWorker {
        FeedbackWorker::new(self.store.clone(), Arc::new(self.queue.clone()), analyzer)
    }

    /// Get the ClickHouse URL.
    pub fn clickhouse_url(&self) -> &str {
        &self.containers.clickhouse_url
    }
}
