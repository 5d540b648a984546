//! Request extractors.

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use funnel_core::webhook::SIGNATURE_HEADER;
use std::convert::Infallible;

/// The `X-Hub-Signature-256` header, if present and valid UTF-8.
///
/// Absence is not a rejection here; the verifier decides whether a
/// missing signature is acceptable.
#[derive(Debug, Clone, Default)]
pub struct HubSignature(pub Option<String>);

impl HubSignature {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for HubSignature
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let signature = parts
            .headers
            .get(SIGNATURE_HEADER)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.trim().to_string());

        Ok(HubSignature(signature))
    }
}
