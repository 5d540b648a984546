//! Direct feedback submission.

use axum::{body::Bytes, extract::State, http::StatusCode, Json};
use funnel_core::{limits::MAX_INGEST_BODY_BYTES, Error, IngestRequest, ValidationErrorCode};
use telemetry::metrics;
use tracing::{debug, warn};

use crate::response::{ApiError, IngestResponse};
use crate::state::AppState;

/// POST /api/ingest
///
/// Body `{"content": "...", "source": "..."}`, both required and non-blank.
/// Responds 202 only after the record exists and its id is queued.
pub async fn ingest_handler(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<IngestResponse>), ApiError> {
    metrics().feedback_received.inc();

    if body.len() > MAX_INGEST_BODY_BYTES {
        metrics().feedback_rejected.inc();
        return Err(Error::validation_code(
            ValidationErrorCode::PayloadTooLarge,
            format!(
                "Payload size {}KB exceeds {}KB limit",
                body.len() / 1024,
                MAX_INGEST_BODY_BYTES / 1024
            ),
        )
        .into());
    }

    let request = IngestRequest::parse(&body).map_err(|e| {
        warn!(error = %e, "Rejected feedback submission");
        metrics().feedback_rejected.inc();
        e
    })?;

    debug!(source = %request.source, content_len = request.content.len(), "Received feedback");

    let record = state.ingestor.submit(request.into_new_feedback()).await?;

    Ok((StatusCode::ACCEPTED, Json(IngestResponse::accepted(record.id))))
}
