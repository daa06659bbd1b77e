//! Source documents and their processing lifecycle.

pub mod stage;

pub use stage::{DocumentStage, StageOperation};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A source document moving through the processing pipeline.
///
/// `original_text` is the raw extracted text and may contain personal
/// data; it must never appear in logs (see [`crate::sanitize`]).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Document {
    pub id: String,
    /// SHA-256 hex digest of the raw upload, used for duplicate detection.
    pub fingerprint: String,
    pub filename: String,
    pub mime_type: Option<String>,
    pub stage: DocumentStage,
    pub original_text: Option<String>,
    pub redacted_text: Option<String>,
    /// Structured analysis produced by the analysis stage.
    pub analysis: Option<serde_json::Value>,
    /// Coarse progress (0-100) of the currently running stage.
    pub progress: u32,
    pub progress_message: String,
    pub failure_notes: Option<String>,
    /// Set when a stage flags content a human should look at before
    /// publishing.
    pub requires_manual_review: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Document {
    pub fn new(fingerprint: String, filename: String, mime_type: Option<String>) -> Self {
        let now = Utc::now();
        Document {
            id: Uuid::new_v4().to_string(),
            fingerprint,
            filename,
            mime_type,
            stage: DocumentStage::New,
            original_text: None,
            redacted_text: None,
            analysis: None,
            progress: 0,
            progress_message: String::new(),
            failure_notes: None,
            requires_manual_review: false,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Parses a stored stage string, falling back to `Failed` with a warning
/// for values no current version produces.
pub(crate) fn parse_stage(raw: &str, document_id: &str) -> DocumentStage {
    DocumentStage::parse(raw).unwrap_or_else(|| {
        log::warn!(
            "Unknown stage '{}' for document {}, treating as failed",
            raw,
            document_id
        );
        DocumentStage::Failed
    })
}

/// Parses a stored RFC 3339 timestamp, falling back to now with a warning.
pub(crate) fn parse_timestamp(raw: &str, field: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|e| {
            log::warn!("Invalid {} timestamp '{}': {}", field, raw, e);
            Utc::now()
        })
}
