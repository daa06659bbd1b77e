//! Batch publishing: sequential runs over a set of artifacts with
//! progress visible to pollers.

use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::db::{artifact_repo, Database};
use crate::progress::{ProgressEntry, ProgressTracker};
use crate::publish::error::PublishError;
use crate::publish::publisher::{RetryingPublisher, RetryPolicy, Sleeper, ThreadSleeper};
use crate::publish::validator::ValidationLimits;
use crate::remote::{DesiredStatus, RemoteClient, RemoteTarget};

/// Runs batch publishes on a background thread, one artifact at a time.
///
/// Items are strictly sequential so the remote target never sees
/// concurrent writes from one batch. With `stop_on_error` the remainder
/// of the batch is left unattempted after the first failure.
pub struct BatchCoordinator {
    db: Database,
    client: Arc<dyn RemoteClient>,
    sleeper: Arc<dyn Sleeper>,
    tracker: Arc<ProgressTracker>,
    policy: RetryPolicy,
    limits: ValidationLimits,
    /// Most artifacts allowed in one batch.
    cap: usize,
}

impl BatchCoordinator {
    pub fn new(
        db: Database,
        client: Arc<dyn RemoteClient>,
        tracker: Arc<ProgressTracker>,
        policy: RetryPolicy,
        limits: ValidationLimits,
        cap: usize,
    ) -> Self {
        Self {
            db,
            client,
            sleeper: Arc::new(ThreadSleeper),
            tracker,
            policy,
            limits,
            cap,
        }
    }

    /// Replaces the sleeper used by per-item publishes, for tests.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// Starts a batch publish and returns its progress token.
    ///
    /// Validates the batch size and that every artifact exists before
    /// spawning; the publishes themselves run in the background.
    pub fn start_batch(
        &self,
        artifact_ids: Vec<String>,
        target: RemoteTarget,
        desired: DesiredStatus,
        stop_on_error: bool,
    ) -> Result<String, PublishError> {
        if artifact_ids.len() > self.cap {
            return Err(PublishError::BatchTooLarge {
                requested: artifact_ids.len(),
                cap: self.cap,
            });
        }

        for id in &artifact_ids {
            if artifact_repo::find_by_id(&self.db, id)?.is_none() {
                return Err(PublishError::ArtifactNotFound(id.clone()));
            }
        }

        let token = Uuid::new_v4().to_string();
        self.tracker.start(&token, artifact_ids.len());

        let publisher = RetryingPublisher::new(
            self.db.clone(),
            Arc::clone(&self.client),
            self.policy.clone(),
            self.limits,
        )
        .with_sleeper(Arc::clone(&self.sleeper));
        let tracker = Arc::clone(&self.tracker);
        let thread_token = token.clone();

        std::thread::spawn(move || {
            run_batch(
                publisher,
                tracker,
                thread_token,
                artifact_ids,
                target,
                desired,
                stop_on_error,
            );
        });

        Ok(token)
    }

    /// Re-queues artifacts whose last publish failed, oldest failures
    /// first. Returns `None` when there is nothing to retry.
    pub fn retry_failed(
        &self,
        target: RemoteTarget,
        desired: DesiredStatus,
        limit: u64,
    ) -> Result<Option<String>, PublishError> {
        let failed = artifact_repo::list_failed(&self.db, limit.min(self.cap as u64))?;
        if failed.is_empty() {
            return Ok(None);
        }

        let ids = failed.into_iter().map(|a| a.id).collect();
        self.start_batch(ids, target, desired, false).map(Some)
    }

    /// Progress snapshot for a batch token.
    pub fn progress(&self, token: &str) -> Option<ProgressEntry> {
        self.tracker.get(token)
    }
}

fn run_batch(
    publisher: RetryingPublisher,
    tracker: Arc<ProgressTracker>,
    token: String,
    artifact_ids: Vec<String>,
    target: RemoteTarget,
    desired: DesiredStatus,
    stop_on_error: bool,
) {
    info!(token = %token, total = artifact_ids.len(), "Batch publish started");

    for id in &artifact_ids {
        tracker.begin_item(&token, id);

        match publisher.publish(id, &target, desired) {
            Ok(_) => {
                tracker.record_success(&token, id);
            }
            Err(e) => {
                warn!(token = %token, artifact_id = %id, error = %e, "Batch item failed");
                tracker.record_failure(&token, id, &e.to_string());
                if stop_on_error {
                    info!(token = %token, "Stopping batch after failure");
                    break;
                }
            }
        }
    }

    tracker.complete(&token);
    info!(token = %token, "Batch publish finished");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::{Artifact, PublishStatus, QualitySignals};
    use crate::db::document_repo;
    use crate::document::Document;
    use crate::progress::BatchStatus;
    use crate::remote::{
        RemoteError, RemotePayload, RemotePostState, RemoteRef, RemoteSection,
    };
    use crate::stages::ArtifactDraft;
    use chrono::Utc;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    struct ScriptedClient {
        script: Mutex<Vec<Result<RemoteRef, RemoteError>>>,
    }

    impl RemoteClient for ScriptedClient {
        fn create_or_update(
            &self,
            _payload: &RemotePayload,
            _existing: Option<&RemoteRef>,
            _timeout: Duration,
        ) -> Result<RemoteRef, RemoteError> {
            let mut script = self.script.lock().unwrap();
            if script.is_empty() {
                return Ok(RemoteRef {
                    post_id: 99,
                    url: "https://cms.example.com/?p=99".to_string(),
                    target_id: "target-1".to_string(),
                });
            }
            script.remove(0)
        }

        fn status(
            &self,
            _remote_ref: &RemoteRef,
            _timeout: Duration,
        ) -> Result<RemotePostState, RemoteError> {
            Err(RemoteError::Transient("not scripted".to_string()))
        }

        fn sections(&self, _timeout: Duration) -> Result<Vec<RemoteSection>, RemoteError> {
            Ok(vec![])
        }
    }

    struct NoSleep;
    impl Sleeper for NoSleep {
        fn sleep(&self, _duration: Duration) {}
    }

    fn target() -> RemoteTarget {
        RemoteTarget {
            id: "target-1".to_string(),
            name: "Main".to_string(),
            base_url: "https://cms.example.com".to_string(),
            default_section_id: None,
            section_map: HashMap::new(),
            active: true,
            created_at: Utc::now(),
        }
    }

    fn insert_publishable(db: &Database, fingerprint: &str) -> Artifact {
        let doc = Document::new(fingerprint.to_string(), "v.txt".to_string(), None);
        document_repo::insert(db, &doc).unwrap();
        let artifact = Artifact::from_draft(
            &doc.id,
            ArtifactDraft {
                title: "Title".to_string(),
                body_html: "word ".repeat(600),
                excerpt: "Excerpt".to_string(),
                focus_keyword: "kw".to_string(),
                meta_title: "MT".to_string(),
                meta_description: "MD".to_string(),
                area: None,
                tags: vec![],
                quality: QualitySignals {
                    content_score: 80,
                    seo_score: 80,
                    readability_score: 80,
                    overall_score: 80,
                },
            },
        );
        artifact_repo::insert(db, &artifact).unwrap();
        artifact
    }

    fn coordinator(
        db: &Database,
        script: Vec<Result<RemoteRef, RemoteError>>,
        cap: usize,
    ) -> BatchCoordinator {
        BatchCoordinator::new(
            db.clone(),
            Arc::new(ScriptedClient {
                script: Mutex::new(script),
            }),
            Arc::new(ProgressTracker::new(3600)),
            RetryPolicy {
                max_attempts: 2,
                base_delay: Duration::from_millis(1),
                attempt_timeout: Duration::from_secs(1),
            },
            ValidationLimits::default(),
            cap,
        )
        .with_sleeper(Arc::new(NoSleep))
    }

    fn wait_for_completion(coordinator: &BatchCoordinator, token: &str) -> ProgressEntry {
        for _ in 0..200 {
            if let Some(entry) = coordinator.progress(token) {
                if entry.status == BatchStatus::Completed {
                    return entry;
                }
            }
            std::thread::sleep(Duration::from_millis(10));
        }
        panic!("batch {} did not complete in time", token);
    }

    #[test]
    fn test_batch_publishes_all() {
        let db = Database::open_in_memory().unwrap();
        let a = insert_publishable(&db, "fp-1");
        let b = insert_publishable(&db, "fp-2");

        let c = coordinator(&db, vec![], 10);
        let token = c
            .start_batch(
                vec![a.id.clone(), b.id.clone()],
                target(),
                DesiredStatus::Publish,
                false,
            )
            .unwrap();

        let entry = wait_for_completion(&c, &token);
        assert_eq!(entry.current, 2);
        assert_eq!(entry.succeeded.len(), 2);
        assert!(entry.failed.is_empty());

        for id in [&a.id, &b.id] {
            let stored = artifact_repo::find_by_id(&db, id).unwrap().unwrap();
            assert_eq!(stored.publish_status, PublishStatus::Published);
        }
    }

    #[test]
    fn test_batch_continues_past_failure_by_default() {
        let db = Database::open_in_memory().unwrap();
        let a = insert_publishable(&db, "fp-1");
        let b = insert_publishable(&db, "fp-2");

        // First item fails terminally, second succeeds.
        let c = coordinator(&db, vec![Err(RemoteError::Auth("401".to_string()))], 10);
        let token = c
            .start_batch(
                vec![a.id.clone(), b.id.clone()],
                target(),
                DesiredStatus::Publish,
                false,
            )
            .unwrap();

        let entry = wait_for_completion(&c, &token);
        assert_eq!(entry.current, 2);
        assert_eq!(entry.succeeded, vec![b.id.clone()]);
        assert_eq!(entry.failed.len(), 1);
        assert_eq!(entry.failed[0].id, a.id);
    }

    #[test]
    fn test_stop_on_error_leaves_remainder_unattempted() {
        let db = Database::open_in_memory().unwrap();
        let a = insert_publishable(&db, "fp-1");
        let b = insert_publishable(&db, "fp-2");

        let c = coordinator(&db, vec![Err(RemoteError::Auth("401".to_string()))], 10);
        let token = c
            .start_batch(
                vec![a.id.clone(), b.id.clone()],
                target(),
                DesiredStatus::Publish,
                true,
            )
            .unwrap();

        let entry = wait_for_completion(&c, &token);
        assert_eq!(entry.current, 1);
        assert!(entry.succeeded.is_empty());
        assert_eq!(entry.failed.len(), 1);

        // Second artifact was never attempted.
        let stored = artifact_repo::find_by_id(&db, &b.id).unwrap().unwrap();
        assert_eq!(stored.publish_status, PublishStatus::Draft);
    }

    #[test]
    fn test_batch_cap() {
        let db = Database::open_in_memory().unwrap();
        let a = insert_publishable(&db, "fp-1");
        let b = insert_publishable(&db, "fp-2");

        let c = coordinator(&db, vec![], 1);
        let err = c.start_batch(
            vec![a.id, b.id],
            target(),
            DesiredStatus::Publish,
            false,
        );
        assert!(matches!(
            err,
            Err(PublishError::BatchTooLarge { requested: 2, cap: 1 })
        ));
    }

    #[test]
    fn test_batch_rejects_unknown_artifact() {
        let db = Database::open_in_memory().unwrap();
        let c = coordinator(&db, vec![], 10);
        let err = c.start_batch(
            vec!["missing".to_string()],
            target(),
            DesiredStatus::Publish,
            false,
        );
        assert!(matches!(err, Err(PublishError::ArtifactNotFound(_))));
    }

    #[test]
    fn test_retry_failed_requeues() {
        let db = Database::open_in_memory().unwrap();
        let a = insert_publishable(&db, "fp-1");
        artifact_repo::set_publish_failure(&db, &a.id, "old failure").unwrap();

        let c = coordinator(&db, vec![], 10);
        let token = c
            .retry_failed(target(), DesiredStatus::Publish, 10)
            .unwrap()
            .unwrap();

        let entry = wait_for_completion(&c, &token);
        assert_eq!(entry.succeeded, vec![a.id.clone()]);

        let stored = artifact_repo::find_by_id(&db, &a.id).unwrap().unwrap();
        assert_eq!(stored.publish_status, PublishStatus::Published);
        assert!(stored.last_publish_error.is_none());
    }

    #[test]
    fn test_retry_failed_with_nothing_to_do() {
        let db = Database::open_in_memory().unwrap();
        let c = coordinator(&db, vec![], 10);
        let token = c.retry_failed(target(), DesiredStatus::Publish, 10).unwrap();
        assert!(token.is_none());
    }
}
