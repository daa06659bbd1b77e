//! Stage job and result types passed over the worker pool channels.

use crate::document::{DocumentStage, StageOperation};

/// A unit of work: run one stage operation on one document.
#[derive(Debug, Clone)]
pub struct StageJob {
    pub document_id: String,
    pub operation: StageOperation,
}

impl StageJob {
    pub fn new(document_id: impl Into<String>, operation: StageOperation) -> Self {
        Self {
            document_id: document_id.into(),
            operation,
        }
    }
}

/// Outcome of a stage job.
#[derive(Debug, Clone)]
pub struct StageResult {
    pub document_id: String,
    pub operation: StageOperation,
    pub success: bool,
    /// Stage the document ended up in.
    pub stage: DocumentStage,
    pub error: Option<String>,
}

impl StageResult {
    pub fn success(job: &StageJob) -> Self {
        Self {
            document_id: job.document_id.clone(),
            operation: job.operation,
            success: true,
            stage: job.operation.completed_stage(),
            error: None,
        }
    }

    pub fn failure(job: &StageJob, error: impl Into<String>) -> Self {
        Self {
            document_id: job.document_id.clone(),
            operation: job.operation,
            success: false,
            stage: DocumentStage::Failed,
            error: Some(error.into()),
        }
    }
}
