//! Publishing and status-sync error types.

use thiserror::Error;

use crate::db::DatabaseError;
use crate::publish::validator::ValidationError;
use crate::remote::RemoteError;

/// Errors from publishing an artifact or running a batch.
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Remote target not found: {0}")]
    TargetNotFound(String),

    #[error("Artifact {artifact_id} failed validation: {}", format_validation(.errors))]
    Validation {
        artifact_id: String,
        errors: Vec<ValidationError>,
    },

    /// A non-retryable remote failure; no further attempts were made.
    #[error("Publish failed terminally on attempt {attempt}: {source}")]
    Terminal {
        attempt: u32,
        #[source]
        source: RemoteError,
    },

    /// All attempts were retryable failures.
    #[error("Publish failed after {attempts} attempts: {source}")]
    Exhausted {
        attempts: u32,
        #[source]
        source: RemoteError,
    },

    #[error("Batch of {requested} exceeds the cap of {cap}")]
    BatchTooLarge { requested: usize, cap: usize },

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}

fn format_validation(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from synchronizing local status with the remote.
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Artifact not found: {0}")]
    ArtifactNotFound(String),

    #[error("Artifact {0} has no remote post to sync against")]
    NotPublished(String),

    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    #[error("Database error: {0}")]
    Database(#[from] DatabaseError),
}
