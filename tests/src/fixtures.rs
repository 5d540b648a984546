//! Request payloads for tests.

use funnel_core::webhook::sign;
use serde_json::{json, Value};

/// Secret used by tests that enable webhook verification.
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";

/// `POST /api/ingest` body.
pub fn ingest_payload(content: &str, source: &str) -> Value {
    json!({ "content": content, "source": source })
}

/// A GitHub `issues` delivery with the given action.
pub fn github_issue_payload(action: &str, title: &str, body: Option<&str>) -> Value {
    json!({
        "action": action,
        "issue": {
            "number": 42,
            "title": title,
            "body": body,
            "state": "open",
            "user": { "login": "octocat" }
        },
        "repository": { "full_name": "octo-org/widgets" },
        "sender": { "login": "octocat" }
    })
}

/// A GitHub `issue_comment` delivery. Comments carry the parent issue.
pub fn github_comment_payload(issue_title: &str, issue_body: &str) -> Value {
    json!({
        "action": "created",
        "issue": { "number": 7, "title": issue_title, "body": issue_body },
        "comment": { "id": 1, "body": "+1" }
    })
}

/// Serialized body plus its `X-Hub-Signature-256` value.
pub fn signed(payload: &Value, secret: &str) -> (Vec<u8>, String) {
    let body = serde_json::to_vec(payload).expect("payload serializes");
    let signature = sign(secret.as_bytes(), &body).expect("payload signs");
    (body, signature)
}

/// `n` distinct ingest payloads.
pub fn ingest_batch(n: usize) -> Vec<Value> {
    (0..n)
        .map(|i| ingest_payload(&format!("Feedback number {}", i), "App"))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_matches_verifier() {
        let payload = github_issue_payload("opened", "t", Some("b"));
        let (body, signature) = signed(&payload, WEBHOOK_SECRET);
        assert!(funnel_core::webhook::verify_signature(
            WEBHOOK_SECRET.as_bytes(),
            &body,
            Some(&signature)
        ));
    }

    #[test]
    fn test_null_body_is_kept() {
        let payload = github_issue_payload("opened", "t", None);
        assert!(payload["issue"]["body"].is_null());
    }
}
