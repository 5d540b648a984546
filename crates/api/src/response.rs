//! Standardized API responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use funnel_core::{Error, FeedbackId};
use serde::{Deserialize, Serialize};

pub const INGEST_ACCEPTED_MESSAGE: &str = "Feedback received and queued for analysis";

/// 202 body for `POST /api/ingest`.
#[derive(Debug, Serialize, Deserialize)]
pub struct IngestResponse {
    pub message: String,
    pub id: String,
}

impl IngestResponse {
    pub fn accepted(id: FeedbackId) -> Self {
        Self {
            message: INGEST_ACCEPTED_MESSAGE.to_string(),
            id: id.to_string(),
        }
    }
}

/// Body for `POST /api/webhooks/github`.
#[derive(Debug, Serialize, Deserialize)]
pub struct WebhookResponse {
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl WebhookResponse {
    pub fn queued(id: FeedbackId) -> Self {
        Self {
            status: "queued".to_string(),
            id: Some(id.to_string()),
        }
    }

    pub fn ignored() -> Self {
        Self {
            status: "ignored".to_string(),
            id: None,
        }
    }
}

/// Health check response.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub store_connected: bool,
    pub queue_connected: bool,
    pub queue_depth: u64,
}

/// Error response.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            code: code.into(),
        }
    }
}

/// API error carrying a status and a stable code.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ErrorResponse,
}

impl ApiError {
    pub fn with_code(status: StatusCode, code: impl Into<String>, msg: impl Into<String>) -> Self {
        Self {
            status,
            response: ErrorResponse::new(msg, code),
        }
    }

    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::BAD_REQUEST, "VALID_001", msg)
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::UNAUTHORIZED, "AUTH_001", msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::with_code(StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_001", msg)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(self.response)).into_response()
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        let status =
            StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        // Backend details stay in the logs.
        let message = match &err {
            Error::Validation { message, .. } => message.clone(),
            Error::Serialization(e) => e.to_string(),
            Error::Auth(msg) | Error::NotFound(msg) => msg.clone(),
            Error::Store(_) => "Failed to save feedback".to_string(),
            Error::Queue(_) => "Failed to queue feedback for analysis".to_string(),
            Error::Enrichment(_) | Error::Internal(_) => "Internal server error".to_string(),
        };

        ApiError::with_code(status, err.code(), message)
    }
}
