//! Feedback enrichment via an OpenAI-compatible chat completion API.
//!
//! The model is asked for three labelled lines (`Sentiment:`, `Category:`,
//! `Summary:`). Labels are matched case-insensitively and any field the
//! response omits keeps its degraded-mode default.

use async_trait::async_trait;
use funnel_core::{Category, Enrichment, Error, Result, Sentiment};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use telemetry::metrics;
use tracing::{debug, info, warn};

/// Produces sentiment, category and summary for a piece of feedback.
#[async_trait]
pub trait Analyzer: Send + Sync {
    async fn analyze(&self, content: &str) -> Result<Enrichment>;
}

/// Always returns the degraded-mode default.
#[derive(Debug, Clone, Copy, Default)]
pub struct FallbackAnalyzer;

#[async_trait]
impl Analyzer for FallbackAnalyzer {
    async fn analyze(&self, content: &str) -> Result<Enrichment> {
        Ok(Enrichment::fallback(content))
    }
}

/// OpenAI client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAiConfig {
    /// API key. Empty or absent disables remote calls.
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_model() -> String {
    "gpt-3.5-turbo".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl OpenAiConfig {
    /// The configured key, if non-empty.
    pub fn credential(&self) -> Option<&str> {
        self.api_key
            .as_deref()
            .map(str::trim)
            .filter(|key| !key.is_empty())
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

fn build_prompt(content: &str) -> String {
    format!(
        "Analyze the following customer feedback.\n\
         Provide the result in exactly this format:\n\
         Sentiment: [Positive/Negative/Neutral]\n\
         Category: [Bug/Feature Request/Praise]\n\
         Summary: [One sentence summary]\n\n\
         Feedback: \"{}\"",
        content
    )
}

/// Analyzer backed by the chat completions endpoint.
pub struct OpenAiAnalyzer {
    config: OpenAiConfig,
    http: reqwest::Client,
}

impl OpenAiAnalyzer {
    pub fn new(config: OpenAiConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("Failed to build HTTP client: {}", e)))?;

        if config.credential().is_none() {
            warn!("OPENAI_API_KEY not set, enrichment will use default values");
        } else {
            info!(model = %config.model, base_url = %config.base_url, "OpenAI enrichment enabled");
        }

        Ok(Self { config, http })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.credential().is_some()
    }

    async fn complete(&self, api_key: &str, content: &str) -> Result<String> {
        let prompt = build_prompt(content);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
        };
        let url = format!(
            "{}/chat/completions",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .http
            .post(&url)
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| Error::enrichment(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(Error::enrichment(format!(
                "AI service returned {}: {}",
                status, body
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| Error::enrichment(format!("Invalid AI response: {}", e)))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Error::enrichment("no response from AI"))
    }
}

#[async_trait]
impl Analyzer for OpenAiAnalyzer {
    async fn analyze(&self, content: &str) -> Result<Enrichment> {
        let Some(api_key) = self.config.credential() else {
            return Ok(Enrichment::fallback(content));
        };

        let start = Instant::now();
        let result = self.complete(api_key, content).await;
        metrics()
            .enrichment_latency_ms
            .observe(start.elapsed().as_millis() as u64);

        let text = result?;
        debug!(response_len = text.len(), "Received AI analysis");
        Ok(parse_analysis(&text, content))
    }
}

/// Strips a case-insensitive `label:` prefix.
fn strip_label<'a>(line: &'a str, label: &str) -> Option<&'a str> {
    let head = line.get(..label.len())?;
    if head.eq_ignore_ascii_case(label) {
        line.get(label.len()..).map(str::trim)
    } else {
        None
    }
}

/// Parses a labelled model reply, keeping defaults for missing fields.
///
/// A label with an empty value also keeps the default, so no stored field
/// is ever blank.
pub fn parse_analysis(response: &str, content: &str) -> Enrichment {
    let mut enrichment = Enrichment::fallback(content);

    for line in response.lines().map(str::trim) {
        if let Some(value) = strip_label(line, "sentiment:").filter(|v| !v.is_empty()) {
            enrichment.sentiment = Sentiment::parse(value);
        } else if let Some(value) = strip_label(line, "category:").filter(|v| !v.is_empty()) {
            enrichment.category = Category::parse(value);
        } else if let Some(value) = strip_label(line, "summary:").filter(|v| !v.is_empty()) {
            enrichment.summary = value.to_string();
        }
    }

    enrichment
}
