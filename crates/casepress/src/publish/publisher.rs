//! Publishing a single artifact with linear-backoff retries.
//!
//! Retry policy: `max_attempts` is the total attempt count, the delay
//! before attempt n+1 is `base_delay * n`, and retryability is decided
//! solely by [`RemoteError::is_retryable`]. Validation runs before any
//! network call and short-circuits the whole operation.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info_span, warn};

use crate::artifact::{Artifact, PublishStatus};
use crate::db::{artifact_repo, Database};
use crate::publish::error::PublishError;
use crate::publish::validator::{validate, ValidationLimits};
use crate::remote::{DesiredStatus, RemoteClient, RemotePayload, RemoteTarget};
use crate::sanitize::redact_url;

/// Sleep seam so tests can observe backoff without waiting it out.
pub trait Sleeper: Send + Sync {
    fn sleep(&self, duration: Duration);
}

/// Production sleeper backed by `std::thread::sleep`.
pub struct ThreadSleeper;

impl Sleeper for ThreadSleeper {
    fn sleep(&self, duration: Duration) {
        std::thread::sleep(duration);
    }
}

/// Retry parameters for remote calls.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Backoff before attempt n+1 is `base_delay * n`.
    pub base_delay: Duration,
    /// Per-attempt timeout handed to the remote client.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(2),
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

/// Publishes artifacts to one remote target, retrying transient
/// failures.
pub struct RetryingPublisher {
    db: Database,
    client: Arc<dyn RemoteClient>,
    sleeper: Arc<dyn Sleeper>,
    policy: RetryPolicy,
    limits: ValidationLimits,
}

impl RetryingPublisher {
    pub fn new(
        db: Database,
        client: Arc<dyn RemoteClient>,
        policy: RetryPolicy,
        limits: ValidationLimits,
    ) -> Self {
        Self {
            db,
            client,
            sleeper: Arc::new(ThreadSleeper),
            policy,
            limits,
        }
    }

    /// Replaces the sleeper, for tests.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Publishes one artifact to the target, creating or updating the
    /// remote post. On success the artifact's status and remote identity
    /// are persisted; on final failure `last_publish_error` records the
    /// reason.
    pub fn publish(
        &self,
        artifact_id: &str,
        target: &RemoteTarget,
        desired: DesiredStatus,
    ) -> Result<Artifact, PublishError> {
        let artifact = artifact_repo::find_by_id(&self.db, artifact_id)?
            .ok_or_else(|| PublishError::ArtifactNotFound(artifact_id.to_string()))?;

        let _span = info_span!("publish",
            artifact_id = %artifact.id,
            target = %redact_url(&target.base_url),
        )
        .entered();

        // No network traffic for an artifact that cannot be published.
        let violations = validate(&artifact, &self.limits);
        if !violations.is_empty() {
            return Err(PublishError::Validation {
                artifact_id: artifact.id.clone(),
                errors: violations,
            });
        }

        let payload = RemotePayload::from_artifact(&artifact, target, desired);
        let existing = artifact
            .remote_ref
            .as_ref()
            .filter(|r| r.target_id == target.id);

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self
                .client
                .create_or_update(&payload, existing, self.policy.attempt_timeout)
            {
                Ok(remote_ref) => {
                    let (status, published_at) = match desired {
                        DesiredStatus::Publish => (PublishStatus::Published, Some(Utc::now())),
                        DesiredStatus::Draft => (PublishStatus::Ready, None),
                    };
                    artifact_repo::set_publish_success(
                        &self.db,
                        &artifact.id,
                        status,
                        &remote_ref,
                        published_at,
                    )?;
                    tracing::info!(attempt, post_id = remote_ref.post_id, "Publish succeeded");

                    return artifact_repo::find_by_id(&self.db, &artifact.id)?
                        .ok_or_else(|| PublishError::ArtifactNotFound(artifact.id.clone()));
                }
                Err(e) if e.is_retryable() && attempt < self.policy.max_attempts => {
                    let delay = self.policy.base_delay * attempt;
                    warn!(attempt, error = %e, delay_ms = delay.as_millis() as u64, "Publish attempt failed, retrying");
                    self.sleeper.sleep(delay);
                }
                Err(e) if e.is_retryable() => {
                    artifact_repo::set_publish_failure(&self.db, &artifact.id, &e.to_string())?;
                    return Err(PublishError::Exhausted {
                        attempts: attempt,
                        source: e,
                    });
                }
                Err(e) => {
                    artifact_repo::set_publish_failure(&self.db, &artifact.id, &e.to_string())?;
                    return Err(PublishError::Terminal { attempt, source: e });
                }
            }
        }
    }
}
