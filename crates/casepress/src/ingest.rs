//! Document ingestion: fingerprinting, duplicate detection, and
//! synchronous text extraction.

use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::info_span;

use crate::db::{document_repo, Database, DatabaseError};
use crate::document::Document;
use crate::sanitize::content_summary;
use crate::stages::Extractor;

/// Errors from ingesting an upload.
#[derive(Error, Debug)]
pub enum IngestError {
    #[error("Upload is empty")]
    EmptyUpload,

    #[error("Duplicate of existing document {existing_id}")]
    Duplicate {
        fingerprint: String,
        existing_id: String,
    },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

/// Accepts uploads and produces documents ready for the pipeline.
pub struct Ingestor {
    db: Database,
    extractor: Arc<dyn Extractor>,
}

impl Ingestor {
    pub fn new(db: Database, extractor: Arc<dyn Extractor>) -> Self {
        Self { db, extractor }
    }

    /// Ingests an upload: fingerprints it, rejects exact duplicates, and
    /// runs extraction before returning.
    ///
    /// Extraction failures do not fail the call — the document is stored
    /// at `failed` with the reason in its failure notes, so the upload is
    /// never silently lost.
    pub fn ingest(
        &self,
        raw: &[u8],
        filename: &str,
        mime_hint: Option<&str>,
    ) -> Result<Document, IngestError> {
        if raw.is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        let fingerprint = fingerprint(raw);

        if let Some(existing) = document_repo::find_by_fingerprint(&self.db, &fingerprint)? {
            log::info!(
                "Rejecting duplicate upload '{}' (existing document {})",
                filename,
                existing.id
            );
            return Err(IngestError::Duplicate {
                fingerprint,
                existing_id: existing.id,
            });
        }

        let mime_type = mime_hint.map(|m| m.to_string()).or_else(|| {
            mime_guess::from_path(filename)
                .first()
                .map(|m| m.essence_str().to_string())
        });

        let doc = Document::new(fingerprint, filename.to_string(), mime_type);
        document_repo::insert(&self.db, &doc)?;

        let span = info_span!("ingest", document_id = %doc.id, filename = %filename);
        let _enter = span.enter();

        match self.extractor.extract(raw, doc.mime_type.as_deref()) {
            Ok(text) => {
                tracing::info!(content = %content_summary(&text), "Text extracted");
                document_repo::store_extracted(&self.db, &doc.id, &text)?;
            }
            Err(e) => {
                tracing::warn!(error = %e, "Extraction failed");
                document_repo::mark_failed(&self.db, &doc.id, &e.to_string())?;
            }
        }

        Ok(document_repo::find_by_id(&self.db, &doc.id)?.unwrap_or(doc))
    }
}

/// SHA-256 hex digest of the raw upload bytes.
pub fn fingerprint(raw: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw);
    format!("{:x}", hasher.finalize())
}
