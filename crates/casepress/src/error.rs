use std::path::PathBuf;
use thiserror::Error;

use crate::document::{DocumentStage, StageOperation};

#[derive(Error, Debug)]
pub enum CasepressError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),

    #[error("Ingestion error: {0}")]
    Ingest(#[from] crate::ingest::IngestError),

    #[error("Orchestration error: {0}")]
    Orchestrate(#[from] OrchestrateError),

    #[error("Publishing error: {0}")]
    Publish(#[from] crate::publish::PublishError),

    #[error("Status sync error: {0}")]
    Sync(#[from] crate::publish::SyncError),
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config JSON: {0}")]
    ParseJson(#[from] serde_json::Error),

    #[error("Config validation failed: {message}")]
    Validation { message: String },

    #[error("Schema validation failed: {errors}")]
    SchemaValidation { errors: String },
}

/// Errors from triggering or resetting a stage transition.
///
/// `Conflict` means the document is already being processed — the caller
/// should poll the document state instead of retrying immediately.
#[derive(Error, Debug)]
pub enum OrchestrateError {
    #[error("Document not found: {0}")]
    NotFound(String),

    #[error("Document {document_id} is already being processed (stage: {stage})")]
    Conflict {
        document_id: String,
        stage: DocumentStage,
    },

    #[error("Cannot run {operation} on document {document_id} in stage {current}")]
    InvalidTransition {
        document_id: String,
        operation: StageOperation,
        current: DocumentStage,
    },

    #[error("Document {0} has no extracted text to reprocess")]
    MissingSourceText(String),

    #[error("Worker pool unavailable")]
    PoolUnavailable,

    #[error("Database error: {0}")]
    Database(#[from] crate::db::DatabaseError),
}

pub type Result<T> = std::result::Result<T, CasepressError>;
