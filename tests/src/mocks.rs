//! Mock implementations for testing.

use async_trait::async_trait;
use funnel_core::{Category, Enrichment, Error, Result, Sentiment};
use parking_lot::Mutex;
use std::sync::Arc;
use worker::Analyzer;

/// Analyzer that records every call and returns a scripted result.
///
/// Content containing "crash" is labelled a negative bug, "love" a
/// positive praise, anything else a neutral feature request. Failure
/// mode makes every call return an enrichment error.
#[derive(Clone, Default)]
pub struct MockAnalyzer {
    calls: Arc<Mutex<Vec<String>>>,
    should_fail: Arc<Mutex<bool>>,
}

impl MockAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Contents passed to `analyze`, in call order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    /// Set failure mode for testing error handling.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }
}

#[async_trait]
impl Analyzer for MockAnalyzer {
    async fn analyze(&self, content: &str) -> Result<Enrichment> {
        self.calls.lock().push(content.to_string());

        if *self.should_fail.lock() {
            return Err(Error::enrichment("Mock analyzer failure"));
        }

        let lower = content.to_lowercase();
        let (sentiment, category) = if lower.contains("crash") {
            (Sentiment::Negative, Category::Bug)
        } else if lower.contains("love") {
            (Sentiment::Positive, Category::Praise)
        } else {
            (Sentiment::Neutral, Category::FeatureRequest)
        };

        Ok(Enrichment {
            sentiment,
            category,
            summary: format!("Summary of: {}", content),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_analyzer_labels() {
        let mock = MockAnalyzer::new();

        let bug = mock.analyze("App crashes on login").await.unwrap();
        assert_eq!(bug.category, Category::Bug);
        assert_eq!(bug.sentiment, Sentiment::Negative);

        let praise = mock.analyze("I love it").await.unwrap();
        assert_eq!(praise.category, Category::Praise);

        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn test_mock_analyzer_failure_mode() {
        let mock = MockAnalyzer::new();
        mock.set_should_fail(true);

        assert!(mock.analyze("anything").await.is_err());
        assert_eq!(mock.calls(), vec!["anything".to_string()]);
    }
}
