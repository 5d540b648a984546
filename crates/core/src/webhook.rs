//! GitHub issue webhook: signature verification and payload mapping.
//!
//! GitHub signs each delivery with HMAC-SHA256 over the raw body and sends
//! it as `X-Hub-Signature-256: sha256=<hex>`.

use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::error::{Error, Result};
use crate::feedback::NewFeedback;
use crate::limits::MAX_CONTENT_BYTES;

type HmacSha256 = Hmac<Sha256>;

/// Header carrying the body signature.
pub const SIGNATURE_HEADER: &str = "X-Hub-Signature-256";

/// Prefix of the signature header value.
pub const SIGNATURE_PREFIX: &str = "sha256=";

/// Source tag for records created from GitHub deliveries.
pub const GITHUB_SOURCE: &str = "GitHub";

fn mac_over(secret: &[u8], body: &[u8]) -> Result<HmacSha256> {
    let mut mac = HmacSha256::new_from_slice(secret)
        .map_err(|e| Error::auth(format!("Unusable webhook secret: {}", e)))?;
    mac.update(body);
    Ok(mac)
}

/// Computes the header value GitHub would send for `body`.
pub fn sign(secret: &[u8], body: &[u8]) -> Result<String> {
    let mac = mac_over(secret, body)?;
    Ok(format!(
        "{}{}",
        SIGNATURE_PREFIX,
        hex::encode(mac.finalize().into_bytes())
    ))
}

/// Verifies a presented signature header against `body`.
///
/// Comparison of the MAC is constant-time. A missing prefix, bad hex or
/// wrong length all fail verification.
pub fn verify_signature(secret: &[u8], body: &[u8], presented: Option<&str>) -> bool {
    let Some(presented) = presented else {
        return false;
    };
    let Some(hex_sig) = presented.trim().strip_prefix(SIGNATURE_PREFIX) else {
        return false;
    };
    let Ok(expected) = hex::decode(hex_sig) else {
        return false;
    };

    let Ok(mac) = mac_over(secret, body) else {
        return false;
    };
    mac.verify_slice(&expected).is_ok()
}

/// Shared-secret policy for the webhook endpoint.
#[derive(Debug, Clone, Default)]
pub struct WebhookVerifier {
    secret: Option<Vec<u8>>,
}

impl WebhookVerifier {
    /// An empty secret disables verification.
    pub fn new(secret: Option<&str>) -> Self {
        Self {
            secret: secret
                .filter(|s| !s.is_empty())
                .map(|s| s.as_bytes().to_vec()),
        }
    }

    /// Whether a secret is configured.
    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// Checks the delivery; always passes when no secret is configured.
    pub fn check(&self, body: &[u8], presented: Option<&str>) -> Result<()> {
        match &self.secret {
            None => Ok(()),
            Some(secret) if verify_signature(secret, body, presented) => Ok(()),
            Some(_) => Err(Error::auth("Invalid signature")),
        }
    }
}

/// Issue event action. Deliveries without one (such as `ping`) read as
/// an empty `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum IssueAction {
    Opened,
    Created,
    Other(String),
}

impl Default for IssueAction {
    fn default() -> Self {
        Self::Other(String::new())
    }
}

impl IssueAction {
    /// Only creation events become feedback.
    pub fn is_creation(&self) -> bool {
        matches!(self, Self::Opened | Self::Created)
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Opened => "opened",
            Self::Created => "created",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for IssueAction {
    fn from(s: String) -> Self {
        match s.as_str() {
            "opened" => Self::Opened,
            "created" => Self::Created,
            _ => Self::Other(s),
        }
    }
}

impl From<IssueAction> for String {
    fn from(a: IssueAction) -> Self {
        a.as_str().to_string()
    }
}

/// The issue part of the payload. GitHub sends `body: null` for issues
/// without a description.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Issue {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub body: Option<String>,
}

/// The fields of a GitHub issue event used here. Everything else in the
/// delivery is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubIssueEvent {
    #[serde(default)]
    pub action: IssueAction,
    #[serde(default)]
    pub issue: Issue,
}

impl GitHubIssueEvent {
    pub fn parse(body: &[u8]) -> Result<Self> {
        serde_json::from_slice(body).map_err(|_| Error::validation("Invalid payload"))
    }

    /// `"Title: <title>\nBody: <body>"`, missing parts rendered empty.
    ///
    /// Cut at a character boundary to at most `MAX_CONTENT_BYTES`, the
    /// same bound direct submissions are held to.
    pub fn content(&self) -> String {
        let mut content = format!(
            "Title: {}\nBody: {}",
            self.issue.title.as_deref().unwrap_or_default(),
            self.issue.body.as_deref().unwrap_or_default()
        );
        truncate_to_bytes(&mut content, MAX_CONTENT_BYTES);
        content
    }

    /// The record to create, or `None` for non-creation actions.
    pub fn to_feedback(&self) -> Option<NewFeedback> {
        self.action
            .is_creation()
            .then(|| NewFeedback::new(self.content(), GITHUB_SOURCE))
    }
}

fn truncate_to_bytes(value: &mut String, max: usize) {
    if value.len() <= max {
        return;
    }
    let mut end = max;
    while !value.is_char_boundary(end) {
        end -= 1;
    }
    value.truncate(end);
}
