//! Unified error types for the feedback funnel.
//!
//! Error codes:
//! - VALID_001-002: Validation errors
//! - AUTH_001: Webhook signature errors
//! - NOT_FOUND_001: Unknown record
//! - DB_001: Record store errors
//! - QUEUE_001: Work queue errors
//! - AI_001: Enrichment errors

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / missing or empty field
    InvalidFormat,
    /// VALID_002: Payload exceeds the size limit
    PayloadTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::PayloadTooLarge => "VALID_002",
        }
    }
}

/// Unified error type for the feedback funnel.
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed or missing input. No side effects happened.
    #[error("[{code}] {message}")]
    Validation { code: &'static str, message: String },

    /// Webhook signature mismatch. No side effects happened.
    #[error("unauthorized: {0}")]
    Auth(String),

    #[error("feedback not found: {0}")]
    NotFound(String),

    /// Record store create/read/update failure.
    #[error("store error: {0}")]
    Store(String),

    /// Work queue push/pop failure.
    #[error("queue error: {0}")]
    Queue(String),

    /// Enrichment call failure.
    #[error("enrichment error: {0}")]
    Enrichment(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::validation_code(ValidationErrorCode::InvalidFormat, msg)
    }

    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::Validation {
            code: code.code(),
            message: msg.into(),
        }
    }

    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }

    pub fn not_found(msg: impl ToString) -> Self {
        Self::NotFound(msg.to_string())
    }

    pub fn store(msg: impl Into<String>) -> Self {
        Self::Store(msg.into())
    }

    pub fn queue(msg: impl Into<String>) -> Self {
        Self::Queue(msg.into())
    }

    pub fn enrichment(msg: impl Into<String>) -> Self {
        Self::Enrichment(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Serialization(_) => 400,
            Self::Auth(_) => 401,
            Self::NotFound(_) => 404,
            Self::Store(_) => 500,
            Self::Queue(_) => 503,
            Self::Enrichment(_) => 502,
            Self::Internal(_) => 500,
        }
    }

    /// Get the stable error code.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation { code, .. } => code,
            Self::Serialization(_) => ValidationErrorCode::InvalidFormat.code(),
            Self::Auth(_) => "AUTH_001",
            Self::NotFound(_) => "NOT_FOUND_001",
            Self::Store(_) => "DB_001",
            Self::Queue(_) => "QUEUE_001",
            Self::Enrichment(_) => "AI_001",
            Self::Internal(_) => "INTERNAL_001",
        }
    }

    /// Whether the caller caused this error (4xx).
    pub fn is_client_error(&self) -> bool {
        (400..500).contains(&self.http_status())
    }
}
