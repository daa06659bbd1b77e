pub mod artifact;
pub mod config;
pub mod db;
pub mod document;
pub mod error;
pub mod ingest;
pub mod logging;
pub mod pipeline;
pub mod progress;
pub mod publish;
pub mod remote;
pub mod sanitize;
pub mod stages;
pub mod worker;

pub use artifact::{Artifact, PublishStatus, QualitySignals};
pub use config::{load_config, Config};
pub use db::Database;
pub use document::{Document, DocumentStage, StageOperation};
pub use error::{CasepressError, ConfigError, OrchestrateError, Result};
pub use ingest::{IngestError, Ingestor};
pub use pipeline::StageRunner;
pub use progress::{BatchStatus, ProgressEntry, ProgressTracker};
pub use publish::{
    BatchCoordinator, PublishError, QueuePlan, RetryPolicy, RetryingPublisher,
    StatusSynchronizer, SyncError, ValidationLimits,
};
pub use remote::{
    DesiredStatus, RemoteClient, RemoteError, RemotePayload, RemoteRef, RemoteTarget,
};
pub use worker::TaskOrchestrator;
