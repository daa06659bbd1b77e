//! Document stage enumeration and transition table.
//!
//! Stages form a closed enum with an explicit transition table, so an
//! illegal transition is a failed conditional update, never a stray
//! string comparison.

use serde::{Deserialize, Serialize};

/// Processing stage of a document.
///
/// Forward chain: `New → TextExtracted → Redacting → Redacted → Analyzing
/// → Analyzed → ArtifactCreated`. Any stage may move to `Failed`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DocumentStage {
    New,
    TextExtracted,
    Redacting,
    Redacted,
    Analyzing,
    Analyzed,
    ArtifactCreated,
    Failed,
}

impl DocumentStage {
    /// Stable string form used for database storage.
    pub fn as_str(&self) -> &'static str {
        match self {
            DocumentStage::New => "new",
            DocumentStage::TextExtracted => "text_extracted",
            DocumentStage::Redacting => "redacting",
            DocumentStage::Redacted => "redacted",
            DocumentStage::Analyzing => "analyzing",
            DocumentStage::Analyzed => "analyzed",
            DocumentStage::ArtifactCreated => "artifact_created",
            DocumentStage::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "new" => Some(DocumentStage::New),
            "text_extracted" => Some(DocumentStage::TextExtracted),
            "redacting" => Some(DocumentStage::Redacting),
            "redacted" => Some(DocumentStage::Redacted),
            "analyzing" => Some(DocumentStage::Analyzing),
            "analyzed" => Some(DocumentStage::Analyzed),
            "artifact_created" => Some(DocumentStage::ArtifactCreated),
            "failed" => Some(DocumentStage::Failed),
            _ => None,
        }
    }

    /// True while an async worker owns the document.
    pub fn is_in_flight(&self) -> bool {
        matches!(self, DocumentStage::Redacting | DocumentStage::Analyzing)
    }

    /// Whether a direct transition to `to` is legal.
    pub fn can_transition(&self, to: DocumentStage) -> bool {
        use DocumentStage::*;

        if to == Failed {
            return *self != Failed;
        }

        matches!(
            (*self, to),
            (New, TextExtracted)
                | (TextExtracted, Redacting)
                | (Redacting, Redacted)
                | (Redacted, Analyzing)
                | (Analyzing, Analyzed)
                | (Analyzed, ArtifactCreated)
        )
    }
}

impl std::fmt::Display for DocumentStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A caller-triggerable stage transition.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageOperation {
    Redact,
    Analyze,
    Generate,
}

impl StageOperation {
    /// The stage a document must be in before this operation may start.
    pub fn required_stage(&self) -> DocumentStage {
        match self {
            StageOperation::Redact => DocumentStage::TextExtracted,
            StageOperation::Analyze => DocumentStage::Redacted,
            StageOperation::Generate => DocumentStage::Analyzed,
        }
    }

    /// The in-flight stage flipped synchronously at trigger time.
    ///
    /// Generation has no dedicated in-flight stage — the document stays
    /// `Analyzed` and re-entrancy is enforced by the orchestrator's
    /// in-flight guard.
    pub fn running_stage(&self) -> Option<DocumentStage> {
        match self {
            StageOperation::Redact => Some(DocumentStage::Redacting),
            StageOperation::Analyze => Some(DocumentStage::Analyzing),
            StageOperation::Generate => None,
        }
    }

    /// The stage set by the worker on successful completion.
    pub fn completed_stage(&self) -> DocumentStage {
        match self {
            StageOperation::Redact => DocumentStage::Redacted,
            StageOperation::Analyze => DocumentStage::Analyzed,
            StageOperation::Generate => DocumentStage::ArtifactCreated,
        }
    }
}

impl std::fmt::Display for StageOperation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StageOperation::Redact => write!(f, "redact"),
            StageOperation::Analyze => write!(f, "analyze"),
            StageOperation::Generate => write!(f, "generate"),
        }
    }
}
