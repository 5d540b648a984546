//! ClickHouse record store tests.
//!
//! Requires Docker to be running for the ClickHouse testcontainer, or
//! `FUNNEL_TEST_CLICKHOUSE_URL` pointing at a running server.

use axum::http::StatusCode;
use axum_test::TestServer;
use chrono::{Duration as TimeDelta, Utc};
use clickhouse_client::{count_feedback, count_unprocessed, ClickHouseOffsetStore};
use funnel_core::{Category, Enrichment, NewFeedback, OffsetStore, RecordStore, Sentiment};
use integration_tests::{fixtures, setup::drain, setup::ClickHouseContext};
use std::sync::Arc;
use worker::{FallbackAnalyzer, ItemOutcome};

#[tokio::test]
async fn test_create_get_update() {
    let ctx = ClickHouseContext::new().await;

    let record = ctx
        .store
        .create(NewFeedback::new("Export is slow", "Email"))
        .await
        .expect("create");

    let fetched = ctx.store.get(record.id).await.unwrap().expect("exists");
    assert_eq!(fetched.content, "Export is slow");
    assert_eq!(fetched.source, "Email");
    assert!(!fetched.is_processed);
    assert!(fetched.sentiment.is_none());

    let mut updated = fetched.clone();
    updated.apply_enrichment(Enrichment {
        sentiment: Sentiment::Negative,
        category: Category::Bug,
        summary: "Slow export".into(),
    });
    ctx.store.update(&updated).await.expect("update");

    let after = ctx.store.get(record.id).await.unwrap().expect("exists");
    assert!(after.is_processed);
    assert_eq!(after.sentiment, Some(Sentiment::Negative));
    assert_eq!(after.category, Some(Category::Bug));
    assert_eq!(after.summary.as_deref(), Some("Slow export"));
    assert_eq!(
        after.created_at.timestamp_millis(),
        record.created_at.timestamp_millis()
    );

    // The update replaced the row rather than adding a record
    assert_eq!(count_feedback(&ctx.clickhouse).await.unwrap(), 1);
    assert_eq!(count_unprocessed(&ctx.clickhouse).await.unwrap(), 0);
}

#[tokio::test]
async fn test_get_unknown_is_none() {
    let ctx = ClickHouseContext::new().await;
    let missing = funnel_core::FeedbackId::generate();
    assert!(ctx.store.get(missing).await.unwrap().is_none());
}

#[tokio::test]
async fn test_list_newest_first_and_unprocessed_scan() {
    let ctx = ClickHouseContext::new().await;

    let mut ids = Vec::new();
    for content in ["first", "second", "third"] {
        let record = ctx
            .store
            .create(NewFeedback::new(content, "App"))
            .await
            .unwrap();
        ids.push(record.id);
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }

    let listed: Vec<_> = ctx
        .store
        .list()
        .await
        .unwrap()
        .into_iter()
        .map(|r| r.content)
        .collect();
    assert_eq!(listed, vec!["third", "second", "first"]);

    let cutoff = Utc::now() + TimeDelta::seconds(1);
    let stale = ctx.store.list_unprocessed_before(cutoff).await.unwrap();
    assert_eq!(stale, ids);

    let past = Utc::now() - TimeDelta::hours(1);
    assert!(ctx.store.list_unprocessed_before(past).await.unwrap().is_empty());
}

#[tokio::test]
async fn test_pipeline_on_clickhouse() {
    let ctx = ClickHouseContext::new().await;
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .post("/api/ingest")
        .json(&fixtures::ingest_payload("App crashes on login", "App"))
        .await
        .assert_status(StatusCode::ACCEPTED);

    let outcomes = drain(&ctx.worker(Arc::new(FallbackAnalyzer))).await;
    assert_eq!(outcomes, vec![ItemOutcome::Processed]);

    let records: Vec<serde_json::Value> = server.get("/api/feedback").await.json();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0]["is_processed"], true);
    assert_eq!(records[0]["sentiment"], "neutral");
    assert_eq!(records[0]["category"], "uncategorized");
    assert_eq!(records[0]["summary"], "App crashes on login");
}

#[tokio::test]
async fn test_health_reports_store_connected() {
    let ctx = ClickHouseContext::new().await;
    assert!(ctx.store.health_check().await);
    assert!(!ctx.clickhouse_url().is_empty());
}

#[tokio::test]
async fn test_queue_offsets_latest_save_wins() {
    let ctx = ClickHouseContext::new().await;
    let offsets = ClickHouseOffsetStore::new(ctx.clickhouse.clone());

    assert_eq!(offsets.load("feedback_queue", 0).await.unwrap(), None);

    for next in [1, 2, 3] {
        offsets.save("feedback_queue", 0, next).await.unwrap();
    }
    offsets.save("other_topic", 0, 40).await.unwrap();

    assert_eq!(offsets.load("feedback_queue", 0).await.unwrap(), Some(3));
    assert_eq!(offsets.load("other_topic", 0).await.unwrap(), Some(40));

    // A restarted process sees the same position.
    let restarted = ClickHouseOffsetStore::new(ctx.clickhouse.clone());
    assert_eq!(restarted.load("feedback_queue", 0).await.unwrap(), Some(3));
}
