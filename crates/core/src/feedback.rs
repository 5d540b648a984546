//! Feedback record types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

use crate::error::{Error, Result};

/// Identifier of a feedback record.
///
/// UUIDv7, so identifiers assigned later sort after earlier ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeedbackId(Uuid);

impl FeedbackId {
    /// Allocates a fresh identifier.
    pub fn generate() -> Self {
        Self(Uuid::now_v7())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for FeedbackId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s.trim())
            .map(Self)
            .map_err(|e| Error::validation(format!("invalid feedback id {:?}: {}", s, e)))
    }
}

/// Sentiment assigned by enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Sentiment {
    Positive,
    Negative,
    Neutral,
    /// Label outside the known set, kept verbatim (normalized).
    Unrecognized(String),
}

impl Sentiment {
    /// Parses a label case-insensitively.
    pub fn parse(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            "neutral" => Self::Neutral,
            other => Self::Unrecognized(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
            Self::Unrecognized(s) => s,
        }
    }
}

impl From<String> for Sentiment {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Sentiment> for String {
    fn from(s: Sentiment) -> Self {
        s.as_str().to_string()
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category assigned by enrichment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum Category {
    Bug,
    FeatureRequest,
    Praise,
    Uncategorized,
    /// Label outside the known set, kept verbatim (normalized).
    Unrecognized(String),
}

impl Category {
    /// Parses a label: lowercased, spaces replaced with underscores.
    ///
    /// `"Feature Request"` parses as [`Category::FeatureRequest`].
    pub fn parse(label: &str) -> Self {
        let normalized = label.trim().to_lowercase().replace(' ', "_");
        match normalized.as_str() {
            "bug" => Self::Bug,
            "feature_request" => Self::FeatureRequest,
            "praise" => Self::Praise,
            "uncategorized" => Self::Uncategorized,
            _ => Self::Unrecognized(normalized),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Bug => "bug",
            Self::FeatureRequest => "feature_request",
            Self::Praise => "praise",
            Self::Uncategorized => "uncategorized",
            Self::Unrecognized(s) => s,
        }
    }
}

impl From<String> for Category {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<Category> for String {
    fn from(c: Category) -> Self {
        c.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of enriching one piece of feedback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrichment {
    pub sentiment: Sentiment,
    pub category: Category,
    pub summary: String,
}

impl Enrichment {
    /// The degraded-mode result: neutral, uncategorized, summary is the content.
    pub fn fallback(content: &str) -> Self {
        Self {
            sentiment: Sentiment::Neutral,
            category: Category::Uncategorized,
            summary: content.to_string(),
        }
    }
}

/// Input for creating a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewFeedback {
    pub content: String,
    pub source: String,
}

impl NewFeedback {
    pub fn new(content: impl Into<String>, source: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source: source.into(),
        }
    }
}

/// A stored feedback item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedbackRecord {
    pub id: FeedbackId,
    pub content: String,
    /// Origin tag, e.g. "App", "Email", "GitHub".
    pub source: String,
    pub sentiment: Option<Sentiment>,
    pub category: Option<Category>,
    pub summary: Option<String>,
    pub is_processed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FeedbackRecord {
    /// Creates an unprocessed record with a fresh id.
    pub fn new(input: NewFeedback) -> Self {
        let now = Utc::now();
        Self {
            id: FeedbackId::generate(),
            content: input.content,
            source: input.source,
            sentiment: None,
            category: None,
            summary: None,
            is_processed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Populates all enrichment fields and marks the record processed.
    pub fn apply_enrichment(&mut self, enrichment: Enrichment) {
        self.sentiment = Some(enrichment.sentiment);
        self.category = Some(enrichment.category);
        self.summary = Some(enrichment.summary);
        self.is_processed = true;
        self.updated_at = Utc::now();
    }

    /// Enrichment fields, present only on processed records.
    pub fn enrichment(&self) -> Option<Enrichment> {
        match (&self.sentiment, &self.category, &self.summary) {
            (Some(sentiment), Some(category), Some(summary)) => Some(Enrichment {
                sentiment: sentiment.clone(),
                category: category.clone(),
                summary: summary.clone(),
            }),
            _ => None,
        }
    }
}
