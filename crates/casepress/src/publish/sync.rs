//! Remote status synchronization.
//!
//! Reconciles the local publish status of an artifact with what the
//! remote actually reports. Sync only ever touches status and remote
//! identity; `last_publish_error` belongs to the publisher and is never
//! modified here.

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::artifact::{Artifact, PublishStatus};
use crate::db::{artifact_repo, Database};
use crate::publish::error::SyncError;
use crate::remote::{RemoteClient, RemoteError, RemoteState};

pub struct StatusSynchronizer {
    db: Database,
    client: Arc<dyn RemoteClient>,
    timeout: Duration,
}

impl StatusSynchronizer {
    pub fn new(db: Database, client: Arc<dyn RemoteClient>, timeout: Duration) -> Self {
        Self {
            db,
            client,
            timeout,
        }
    }

    /// Syncs one artifact against its remote post and returns the
    /// refreshed artifact.
    ///
    /// A remote 404 means the post was deleted out from under us: the
    /// artifact is detached (back to `draft`, remote identity cleared)
    /// rather than treated as an error. Any other remote failure leaves
    /// the artifact untouched.
    pub fn sync(&self, artifact_id: &str) -> Result<Artifact, SyncError> {
        let artifact = artifact_repo::find_by_id(&self.db, artifact_id)?
            .ok_or_else(|| SyncError::ArtifactNotFound(artifact_id.to_string()))?;

        let remote_ref = artifact
            .remote_ref
            .as_ref()
            .ok_or_else(|| SyncError::NotPublished(artifact_id.to_string()))?;

        match self.client.status(remote_ref, self.timeout) {
            Ok(state) => {
                let status = match state.state {
                    RemoteState::Published => PublishStatus::Published,
                    RemoteState::Draft => PublishStatus::Draft,
                    RemoteState::Other(ref raw) => {
                        // Unmanaged states (pending, scheduled, private)
                        // mean the post exists but is not live; keep the
                        // artifact eligible for a later publish.
                        info!(artifact_id = %artifact.id, state = %raw, "Remote post in unmanaged state");
                        PublishStatus::Ready
                    }
                };

                if status != artifact.publish_status {
                    info!(
                        artifact_id = %artifact.id,
                        from = %artifact.publish_status,
                        to = %status,
                        "Remote status differs, updating"
                    );
                    artifact_repo::set_status(&self.db, &artifact.id, status)?;
                }

                // Refresh the URL if the remote reports a new one.
                if let Some(url) = state.url {
                    if url != remote_ref.url {
                        artifact_repo::set_remote_url(&self.db, &artifact.id, &url)?;
                    }
                }
            }
            Err(RemoteError::NotFound(_)) => {
                warn!(artifact_id = %artifact.id, "Remote post vanished, detaching");
                artifact_repo::clear_remote_ref(&self.db, &artifact.id)?;
            }
            Err(e) => return Err(SyncError::Remote(e)),
        }

        artifact_repo::find_by_id(&self.db, &artifact.id)?
            .ok_or_else(|| SyncError::ArtifactNotFound(artifact.id.clone()))
    }
}
