//! Stage orchestration: validates trigger requests, flips documents to
//! their in-flight stage, and hands jobs to the pool.
//!
//! Re-entrancy is enforced twice: an in-memory in-flight set catches
//! concurrent triggers in this process, and the conditional stage update
//! catches everything else. A caller that loses either race gets
//! `Conflict`, never a second run.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use tracing::info;

use crate::db::{document_repo, Database};
use crate::document::{Document, DocumentStage, StageOperation};
use crate::error::OrchestrateError;
use crate::stages::AiStage;
use crate::worker::job::{StageJob, StageResult};
use crate::worker::pool::StagePool;

pub struct TaskOrchestrator {
    db: Database,
    pool: StagePool,
    inflight: Arc<Mutex<HashSet<String>>>,
}

impl TaskOrchestrator {
    pub fn new(db: Database, ai: Arc<dyn AiStage>, worker_count: usize) -> Self {
        let inflight = Arc::new(Mutex::new(HashSet::new()));
        let pool = StagePool::new(db.clone(), ai, worker_count, Arc::clone(&inflight));
        Self { db, pool, inflight }
    }

    /// Triggers a stage operation on a document.
    ///
    /// Returns once the document has been flipped to its in-flight stage
    /// and the job is queued; the stage itself runs on a pool worker.
    pub fn trigger(
        &self,
        document_id: &str,
        operation: StageOperation,
    ) -> Result<Document, OrchestrateError> {
        let doc = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| OrchestrateError::NotFound(document_id.to_string()))?;

        if doc.stage.is_in_flight() {
            return Err(OrchestrateError::Conflict {
                document_id: document_id.to_string(),
                stage: doc.stage,
            });
        }

        let required = operation.required_stage();
        if doc.stage != required {
            return Err(OrchestrateError::InvalidTransition {
                document_id: document_id.to_string(),
                operation,
                current: doc.stage,
            });
        }

        if !self.reserve(document_id) {
            return Err(OrchestrateError::Conflict {
                document_id: document_id.to_string(),
                stage: doc.stage,
            });
        }

        // Flip to the in-flight stage before queuing, so every observer
        // sees the document as busy from this point on. Generation has
        // no in-flight stage; its conditional update re-asserts
        // `analyzed` and clears stale failure notes.
        let (from, to, message) = match operation.running_stage() {
            Some(running) => (required, running, format!("{} started", operation)),
            None => (required, required, "Generation started".to_string()),
        };
        let flipped =
            document_repo::transition(&self.db, document_id, from, to, 0, &message, true)?;
        if !flipped {
            self.release(document_id);
            return Err(OrchestrateError::Conflict {
                document_id: document_id.to_string(),
                stage: doc.stage,
            });
        }

        if self
            .pool
            .submit(StageJob::new(document_id, operation))
            .is_err()
        {
            // Queue gone; undo the flip so the document is not stranded.
            self.release(document_id);
            document_repo::mark_failed(&self.db, document_id, "Worker pool unavailable")?;
            return Err(OrchestrateError::PoolUnavailable);
        }

        info!(document_id = %document_id, operation = %operation, "Stage triggered");

        document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| OrchestrateError::NotFound(document_id.to_string()))
    }

    /// Resets a document back to `text_extracted` so the pipeline can run
    /// again, keeping the extracted text but discarding derived state.
    pub fn reprocess(&self, document_id: &str) -> Result<Document, OrchestrateError> {
        let doc = document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| OrchestrateError::NotFound(document_id.to_string()))?;

        if doc.stage.is_in_flight() || self.is_reserved(document_id) {
            return Err(OrchestrateError::Conflict {
                document_id: document_id.to_string(),
                stage: doc.stage,
            });
        }

        if doc.original_text.is_none() {
            return Err(OrchestrateError::MissingSourceText(document_id.to_string()));
        }

        let applied = document_repo::reset_for_reprocess(&self.db, document_id)?;
        if !applied {
            let current = document_repo::find_by_id(&self.db, document_id)?
                .map(|d| d.stage)
                .unwrap_or(DocumentStage::Failed);
            return Err(OrchestrateError::Conflict {
                document_id: document_id.to_string(),
                stage: current,
            });
        }

        info!(document_id = %document_id, "Document reset for reprocessing");

        document_repo::find_by_id(&self.db, document_id)?
            .ok_or_else(|| OrchestrateError::NotFound(document_id.to_string()))
    }

    /// Non-blocking poll for a finished stage.
    pub fn try_recv_result(&self) -> Option<StageResult> {
        self.pool.try_recv_result()
    }

    /// Blocking wait for the next finished stage.
    pub fn recv_result(&self) -> Option<StageResult> {
        self.pool.recv_result()
    }

    pub fn shutdown(&self) {
        self.pool.shutdown();
    }

    pub fn wait(self) {
        self.pool.wait();
    }

    fn reserve(&self, document_id: &str) -> bool {
        let mut guard = match self.inflight.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("In-flight set lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        guard.insert(document_id.to_string())
    }

    fn release(&self, document_id: &str) {
        match self.inflight.lock() {
            Ok(mut guard) => {
                guard.remove(document_id);
            }
            Err(poisoned) => {
                log::warn!("In-flight set lock poisoned, recovering");
                poisoned.into_inner().remove(document_id);
            }
        }
    }

    fn is_reserved(&self, document_id: &str) -> bool {
        match self.inflight.lock() {
            Ok(guard) => guard.contains(document_id),
            Err(poisoned) => {
                log::warn!("In-flight set lock poisoned, recovering");
                poisoned.into_inner().contains(document_id)
            }
        }
    }
}
