//! Pipeline stage seams: text extraction and the AI transformation
//! stages (redaction, analysis, artifact generation).
//!
//! Both seams are traits so the orchestration layer can be tested with
//! scripted implementations and the real backends can be swapped without
//! touching the pipeline.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::QualitySignals;

/// The three AI transformation stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageKind {
    Redaction,
    Analysis,
    Generation,
}

impl std::fmt::Display for StageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageKind::Redaction => write!(f, "redaction"),
            StageKind::Analysis => write!(f, "analysis"),
            StageKind::Generation => write!(f, "generation"),
        }
    }
}

/// Input handed to an AI stage.
#[derive(Debug, Clone)]
pub struct StageInput<'a> {
    pub document_id: &'a str,
    /// Source text for the stage: original text for redaction, redacted
    /// text afterwards.
    pub text: &'a str,
    /// Analysis output, present only for generation.
    pub analysis: Option<&'a serde_json::Value>,
}

/// Output of the redaction stage.
#[derive(Debug, Clone)]
pub struct RedactionOutput {
    pub redacted_text: String,
    /// Set when the stage was unsure and a human should verify the
    /// redaction before publication.
    pub requires_manual_review: bool,
}

/// Output of the analysis stage.
#[derive(Debug, Clone)]
pub struct AnalysisOutput {
    pub analysis: serde_json::Value,
    pub requires_manual_review: bool,
}

/// Output of the generation stage: a complete draft article.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ArtifactDraft {
    pub title: String,
    pub body_html: String,
    pub excerpt: String,
    pub focus_keyword: String,
    pub meta_title: String,
    pub meta_description: String,
    pub area: Option<String>,
    pub tags: Vec<String>,
    pub quality: QualitySignals,
}

/// Failure modes of an AI stage.
#[derive(Error, Debug, Clone)]
pub enum AiStageError {
    #[error("AI backend unavailable: {0}")]
    Unavailable(String),

    #[error("AI backend rejected the request: {0}")]
    Rejected(String),

    #[error("AI output could not be parsed: {0}")]
    Malformed(String),
}

/// An AI backend capable of running the three transformation stages.
pub trait AiStage: Send + Sync {
    fn redact(&self, input: &StageInput<'_>) -> Result<RedactionOutput, AiStageError>;
    fn analyze(&self, input: &StageInput<'_>) -> Result<AnalysisOutput, AiStageError>;
    fn generate(&self, input: &StageInput<'_>) -> Result<ArtifactDraft, AiStageError>;
}

/// Failure modes of text extraction.
#[derive(Error, Debug, Clone)]
pub enum ExtractError {
    #[error("Unsupported document type: {0}")]
    Unsupported(String),

    #[error("Document bytes are not valid text: {0}")]
    InvalidEncoding(String),

    #[error("Document contains no text")]
    Empty,
}

/// Turns raw uploaded bytes into plain text.
pub trait Extractor: Send + Sync {
    fn extract(&self, raw: &[u8], mime_hint: Option<&str>) -> Result<String, ExtractError>;
}

/// Extractor for plain-text uploads. Rejects binary content and empty
/// files.
#[derive(Debug, Default)]
pub struct PlainTextExtractor;

impl Extractor for PlainTextExtractor {
    fn extract(&self, raw: &[u8], mime_hint: Option<&str>) -> Result<String, ExtractError> {
        if let Some(mime) = mime_hint {
            if !mime.starts_with("text/") && mime != "application/octet-stream" {
                return Err(ExtractError::Unsupported(mime.to_string()));
            }
        }

        let text = std::str::from_utf8(raw)
            .map_err(|e| ExtractError::InvalidEncoding(e.to_string()))?;

        if text.trim().is_empty() {
            return Err(ExtractError::Empty);
        }

        Ok(text.to_string())
    }
}
