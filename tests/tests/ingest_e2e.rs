//! End-to-end tests for the feedback pipeline.
//!
//! POST /api/ingest or /api/webhooks/github → store + queue → FeedbackWorker
//! → enriched record visible on GET /api/feedback.
//!
//! Store and queue are in-memory; the router and worker are the
//! production ones.

use axum::http::StatusCode;
use axum_test::TestServer;
use funnel_core::{Category, FeedbackId, RecordStore, Sentiment};
use integration_tests::{fixtures, setup::TestContext};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use worker::{FallbackAnalyzer, ItemOutcome, OpenAiAnalyzer, OpenAiConfig};

fn server(ctx: &TestContext) -> TestServer {
    TestServer::new(ctx.router.clone()).expect("Failed to create test server")
}

fn id_from(body: &serde_json::Value) -> FeedbackId {
    body["id"]
        .as_str()
        .expect("response carries an id")
        .parse()
        .expect("id parses")
}

/// Direct submission with no AI credential ends in the default enrichment.
#[tokio::test]
async fn test_ingest_without_credential_e2e() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server
        .post("/api/ingest")
        .json(&fixtures::ingest_payload("App crashes on login", "App"))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["message"], "Feedback received and queued for analysis");
    let id = id_from(&body);

    // Created unprocessed, id queued
    let created = ctx.store.snapshot(id).expect("record exists");
    assert!(!created.is_processed);
    assert_eq!(ctx.queue.pending(), vec![id]);

    // No key configured: the real OpenAI analyzer falls back
    let analyzer = OpenAiAnalyzer::new(OpenAiConfig::default()).expect("analyzer builds");
    let outcomes = integration_tests::setup::drain(&ctx.worker_with(Arc::new(analyzer))).await;
    assert_eq!(outcomes, vec![ItemOutcome::Processed]);

    let processed = ctx.store.snapshot(id).expect("record exists");
    assert!(processed.is_processed);
    assert_eq!(processed.sentiment, Some(Sentiment::Neutral));
    assert_eq!(processed.category, Some(Category::Uncategorized));
    assert_eq!(processed.summary.as_deref(), Some("App crashes on login"));
    assert_eq!(processed.created_at, created.created_at);
}

/// GitHub issue with no secret configured is stored and processed the same way.
#[tokio::test]
async fn test_github_webhook_e2e() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server
        .post("/api/webhooks/github")
        .json(&fixtures::github_issue_payload("opened", "Bug", Some("It breaks")))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["status"], "queued");
    let id = id_from(&body);

    let created = ctx.store.snapshot(id).expect("record exists");
    assert_eq!(created.content, "Title: Bug\nBody: It breaks");
    assert_eq!(created.source, "GitHub");
    assert!(!created.is_processed);

    let outcomes =
        integration_tests::setup::drain(&ctx.worker_with(Arc::new(FallbackAnalyzer))).await;
    assert_eq!(outcomes, vec![ItemOutcome::Processed]);

    let processed = ctx.store.snapshot(id).expect("record exists");
    assert!(processed.is_processed);
    assert_eq!(processed.sentiment, Some(Sentiment::Neutral));
    assert_eq!(processed.category, Some(Category::Uncategorized));
    assert_eq!(processed.summary.as_deref(), Some("Title: Bug\nBody: It breaks"));
}

/// Signed webhook delivery is accepted when a secret is configured.
#[tokio::test]
async fn test_signed_github_webhook_e2e() {
    let ctx = TestContext::with_webhook_secret(fixtures::WEBHOOK_SECRET);
    let server = server(&ctx);

    let payload = fixtures::github_issue_payload("opened", "Dark mode", None);
    let (body, signature) = fixtures::signed(&payload, fixtures::WEBHOOK_SECRET);

    let response = server
        .post("/api/webhooks/github")
        .content_type("application/json")
        .add_header("X-Hub-Signature-256", &signature)
        .bytes(body.into())
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    let id = id_from(&response.json());
    assert_eq!(
        ctx.store.snapshot(id).expect("record exists").content,
        "Title: Dark mode\nBody: "
    );
}

/// Comment creation events also become feedback.
#[tokio::test]
async fn test_issue_comment_created_is_queued() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let response = server
        .post("/api/webhooks/github")
        .json(&fixtures::github_comment_payload("Slow sync", "Takes minutes"))
        .await;

    response.assert_status(StatusCode::ACCEPTED);
    assert_eq!(ctx.queue.len(), 1);
}

/// Enrichment results from the analyzer are stored on the record.
#[tokio::test]
async fn test_enrichment_fields_are_stored() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    server
        .post("/api/ingest")
        .json(&fixtures::ingest_payload("The app crashes when I upload", "Email"))
        .await
        .assert_status(StatusCode::ACCEPTED);

    assert_eq!(ctx.drain().await, vec![ItemOutcome::Processed]);

    let records = ctx.store.list().await.unwrap();
    assert_eq!(records.len(), 1);
    let record = &records[0];
    assert!(record.is_processed);
    assert_eq!(record.sentiment, Some(Sentiment::Negative));
    assert_eq!(record.category, Some(Category::Bug));
    assert_eq!(
        record.summary.as_deref(),
        Some("Summary of: The app crashes when I upload")
    );
    assert_eq!(ctx.analyzer.calls(), vec!["The app crashes when I upload"]);
}

/// Items are processed in submission order.
#[tokio::test]
async fn test_items_processed_in_fifo_order() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let mut contents = Vec::new();
    for payload in fixtures::ingest_batch(5) {
        contents.push(payload["content"].as_str().unwrap().to_string());
        server
            .post("/api/ingest")
            .json(&payload)
            .await
            .assert_status(StatusCode::ACCEPTED);
    }

    let outcomes = ctx.drain().await;
    assert_eq!(outcomes.len(), 5);
    assert!(outcomes.iter().all(|o| *o == ItemOutcome::Processed));
    assert_eq!(ctx.analyzer.calls(), contents);
}

/// GET /api/feedback returns every record newest first, enriched or not.
#[tokio::test]
async fn test_list_feedback_newest_first() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    for content in ["oldest", "middle", "newest"] {
        server
            .post("/api/ingest")
            .json(&fixtures::ingest_payload(content, "App"))
            .await
            .assert_status(StatusCode::ACCEPTED);
        tokio::time::sleep(Duration::from_millis(2)).await;
    }

    // Process only the first item
    let worker = ctx.worker();
    worker
        .process_next(funnel_core::PopTimeout::Bounded(Duration::from_millis(50)))
        .await
        .unwrap();

    let response = server.get("/api/feedback").await;
    response.assert_status_ok();
    let records: Vec<serde_json::Value> = response.json();

    let contents: Vec<_> = records
        .iter()
        .map(|r| r["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, vec!["newest", "middle", "oldest"]);

    assert_eq!(records[2]["is_processed"], true);
    assert_eq!(records[2]["sentiment"], "neutral");
    assert_eq!(records[2]["category"], "feature_request");
    assert_eq!(records[0]["is_processed"], false);
    assert!(records[0]["sentiment"].is_null());
    assert!(records[0]["created_at"].is_string());
}

/// The long-running worker picks up items as they arrive and stops on cancel.
#[tokio::test]
async fn test_running_worker_processes_submissions() {
    let ctx = TestContext::new();
    let server = server(&ctx);

    let worker = Arc::new(ctx.worker());
    let shutdown = CancellationToken::new();
    let handle = {
        let worker = worker.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move { worker.run(shutdown).await })
    };

    let response = server
        .post("/api/ingest")
        .json(&fixtures::ingest_payload("I love the new dashboard", "Survey"))
        .await;
    response.assert_status(StatusCode::ACCEPTED);
    let id = id_from(&response.json());

    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        if ctx.store.snapshot(id).map(|r| r.is_processed).unwrap_or(false) {
            break;
        }
        assert!(tokio::time::Instant::now() < deadline, "worker did not process item");
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let record = ctx.store.snapshot(id).unwrap();
    assert_eq!(record.category, Some(Category::Praise));
    assert_eq!(record.sentiment, Some(Sentiment::Positive));

    shutdown.cancel();
    tokio::time::timeout(Duration::from_secs(5), handle)
        .await
        .expect("worker stops after cancel")
        .unwrap();
}
