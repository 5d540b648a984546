//! Size limits for ingestion.
//!
//! MEMORY SAFETY: request bodies are rejected before parsing when they
//! exceed these limits.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so `MAX_SOURCE_LEN` is duplicated on `IngestRequest`. Keep both in
//! sync when modifying. Content size is checked in bytes by a custom
//! validator that reads `MAX_CONTENT_BYTES` directly.

/// Maximum feedback content size in bytes (64KB).
///
/// Applies to direct submissions and to webhook content alike. Also
/// bounds the prompt sent to the enrichment model.
pub const MAX_CONTENT_BYTES: usize = 64 * 1024;

/// Maximum source tag length (chars).
/// Tags are short labels like "App", "Email", "Twitter".
pub const MAX_SOURCE_LEN: usize = 128;

/// Maximum direct-submission body size in bytes.
///
/// Content limit plus room for JSON framing and escapes.
pub const MAX_INGEST_BODY_BYTES: usize = 2 * MAX_CONTENT_BYTES;

/// Maximum webhook body size in bytes (1MB).
///
/// GitHub issue events carry the full repository and sender objects,
/// so they are much larger than the synthesized content.
pub const MAX_WEBHOOK_BODY_BYTES: usize = 1024 * 1024;
