//! GitHub issue webhook.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use funnel_core::GitHubIssueEvent;
use telemetry::metrics;
use tracing::{debug, warn};

use crate::extractors::HubSignature;
use crate::response::{ApiError, WebhookResponse};
use crate::state::AppState;

/// POST /api/webhooks/github
///
/// Order of checks: signature (401), payload (400), action (200 ignored).
/// Only `opened` and `created` actions become feedback.
pub async fn github_webhook_handler(
    State(state): State<AppState>,
    signature: HubSignature,
    body: Bytes,
) -> Result<(StatusCode, Json<WebhookResponse>), ApiError> {
    metrics().webhooks_received.inc();

    state
        .verifier
        .check(&body, signature.as_deref())
        .map_err(|e| {
            warn!(has_signature = signature.0.is_some(), "Webhook signature rejected");
            metrics().webhooks_unauthorized.inc();
            e
        })?;

    let event = GitHubIssueEvent::parse(&body).map_err(|e| {
        warn!(error = %e, "Invalid webhook payload");
        metrics().feedback_rejected.inc();
        e
    })?;

    let Some(feedback) = event.to_feedback() else {
        debug!(action = %event.action.as_str(), "Ignoring webhook action");
        metrics().webhooks_ignored.inc();
        return Ok((StatusCode::OK, Json(WebhookResponse::ignored())));
    };

    let record = state.ingestor.submit(feedback).await?;

    Ok((StatusCode::ACCEPTED, Json(WebhookResponse::queued(record.id))))
}
