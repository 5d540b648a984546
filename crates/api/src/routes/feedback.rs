//! Feedback listing.

use axum::{extract::State, Json};
use funnel_core::FeedbackRecord;

use crate::response::ApiError;
use crate::state::AppState;

/// GET /api/feedback - all records, newest first.
pub async fn list_handler(
    State(state): State<AppState>,
) -> Result<Json<Vec<FeedbackRecord>>, ApiError> {
    let records = state.store.list().await?;
    Ok(Json(records))
}
