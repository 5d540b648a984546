//! Tests for health check endpoints.
//!
//! The health registry is process-global, so each test checks through
//! the router it owns before asserting.

use axum::http::StatusCode;
use axum_test::TestServer;
use funnel_core::{FeedbackId, WorkQueue};
use integration_tests::setup::TestContext;

/// /health reports both backends and the queue depth
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();
    for field in ["status", "store_connected", "queue_connected", "queue_depth"] {
        assert!(body.get(field).is_some(), "Response should have '{}'", field);
    }

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        ["healthy", "degraded", "unhealthy"].contains(&status),
        "unexpected status '{}'",
        status
    );
}

/// Queue depth counts waiting ids
#[tokio::test]
async fn test_health_reports_queue_depth() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    for _ in 0..3 {
        ctx.queue.push(FeedbackId::generate()).await.unwrap();
    }

    let body: serde_json::Value = server.get("/health").await.json();
    assert_eq!(body["queue_depth"], 3);
    assert_eq!(body["store_connected"], true);
    assert_eq!(body["queue_connected"], true);
}

/// In-memory backends are always ready
#[tokio::test]
async fn test_ready_endpoint() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health/ready").await;
    response.assert_status(StatusCode::OK);
}

/// Liveness does not depend on backends
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health/live").await.assert_status_ok();
}

/// Unknown routes are 404
#[tokio::test]
async fn test_unknown_route_returns_404() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .get("/api/unknown")
        .await
        .assert_status(StatusCode::NOT_FOUND);
}

/// Wrong method on a known route is 405
#[tokio::test]
async fn test_wrong_method_returns_405() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server
        .get("/api/ingest")
        .await
        .assert_status(StatusCode::METHOD_NOT_ALLOWED);
}
