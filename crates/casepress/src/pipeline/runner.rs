//! Stage execution: runs one AI stage against a document and persists
//! the outcome.

use std::sync::Arc;

use tracing::{info_span, warn};

use crate::artifact::{count_words, Artifact};
use crate::db::{artifact_repo, document_repo, Database};
use crate::document::StageOperation;
use crate::sanitize::content_summary;
use crate::stages::{AiStage, StageInput};
use crate::worker::job::{StageJob, StageResult};

/// Runs stage jobs. One instance is shared by all pool workers.
pub struct StageRunner {
    db: Database,
    ai: Arc<dyn AiStage>,
}

impl StageRunner {
    pub fn new(db: Database, ai: Arc<dyn AiStage>) -> Self {
        Self { db, ai }
    }

    /// Executes a stage job end to end.
    ///
    /// The document was already flipped to its in-flight stage (or
    /// reserved, for generation) by the orchestrator before the job was
    /// queued. On failure the document is marked `failed` with the
    /// reason in its failure notes.
    pub fn run(&self, job: &StageJob) -> StageResult {
        let _span = info_span!("stage",
            document_id = %job.document_id,
            operation = %job.operation,
        )
        .entered();

        match self.execute(job) {
            Ok(()) => StageResult::success(job),
            Err(reason) => {
                warn!(error = %reason, "Stage failed");
                if let Err(e) = document_repo::mark_failed(&self.db, &job.document_id, &reason) {
                    log::error!(
                        "Failed to record failure for document {}: {}",
                        job.document_id,
                        e
                    );
                }
                StageResult::failure(job, reason)
            }
        }
    }

    fn execute(&self, job: &StageJob) -> Result<(), String> {
        let doc = document_repo::find_by_id(&self.db, &job.document_id)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("Document {} vanished", job.document_id))?;

        match job.operation {
            StageOperation::Redact => {
                let text = doc
                    .original_text
                    .as_deref()
                    .ok_or("Document has no extracted text")?;
                tracing::debug!(content = %content_summary(text), "Running redaction");

                document_repo::set_progress(&self.db, &doc.id, 10, "Redacting personal data")
                    .map_err(|e| e.to_string())?;

                let output = self
                    .ai
                    .redact(&StageInput {
                        document_id: &doc.id,
                        text,
                        analysis: None,
                    })
                    .map_err(|e| e.to_string())?;

                let applied = document_repo::store_redaction(
                    &self.db,
                    &doc.id,
                    &output.redacted_text,
                    output.requires_manual_review,
                )
                .map_err(|e| e.to_string())?;
                if !applied {
                    return Err("Document left the redacting stage mid-run".to_string());
                }
            }
            StageOperation::Analyze => {
                let text = doc
                    .redacted_text
                    .as_deref()
                    .ok_or("Document has no redacted text")?;

                document_repo::set_progress(&self.db, &doc.id, 10, "Analyzing content")
                    .map_err(|e| e.to_string())?;

                let output = self
                    .ai
                    .analyze(&StageInput {
                        document_id: &doc.id,
                        text,
                        analysis: None,
                    })
                    .map_err(|e| e.to_string())?;

                let applied = document_repo::store_analysis(
                    &self.db,
                    &doc.id,
                    &output.analysis,
                    output.requires_manual_review,
                )
                .map_err(|e| e.to_string())?;
                if !applied {
                    return Err("Document left the analyzing stage mid-run".to_string());
                }
            }
            StageOperation::Generate => {
                let text = doc
                    .redacted_text
                    .as_deref()
                    .ok_or("Document has no redacted text")?;
                let analysis = doc.analysis.as_ref().ok_or("Document has no analysis")?;

                document_repo::set_progress(&self.db, &doc.id, 10, "Generating article")
                    .map_err(|e| e.to_string())?;

                let draft = self
                    .ai
                    .generate(&StageInput {
                        document_id: &doc.id,
                        text,
                        analysis: Some(analysis),
                    })
                    .map_err(|e| e.to_string())?;

                // Regeneration replaces the draft content in place and
                // keeps publish bookkeeping.
                match artifact_repo::find_by_document(&self.db, &doc.id)
                    .map_err(|e| e.to_string())?
                {
                    Some(existing) => {
                        let word_count = count_words(&draft.body_html);
                        artifact_repo::update_draft_content(
                            &self.db,
                            &existing.id,
                            &draft,
                            word_count,
                        )
                        .map_err(|e| e.to_string())?;
                    }
                    None => {
                        let artifact = Artifact::from_draft(&doc.id, draft);
                        artifact_repo::insert(&self.db, &artifact).map_err(|e| e.to_string())?;
                    }
                }

                let applied = document_repo::mark_artifact_created(&self.db, &doc.id)
                    .map_err(|e| e.to_string())?;
                if !applied {
                    return Err("Document left the analyzed stage mid-run".to_string());
                }
            }
        }

        Ok(())
    }
}
