//! Shared test utilities for casepress integration tests.
//!
//! Provides scripted stand-ins for the two external seams: the AI stage
//! backend and the remote CMS client.

use std::sync::Mutex;
use std::time::Duration;

use casepress::artifact::QualitySignals;
use casepress::publish::Sleeper;
use casepress::remote::{
    RemoteClient, RemoteError, RemotePayload, RemotePostState, RemoteRef, RemoteSection,
    RemoteTarget,
};
use casepress::stages::{
    AiStage, AiStageError, AnalysisOutput, ArtifactDraft, RedactionOutput, StageInput,
};
use chrono::Utc;
use std::collections::HashMap;

/// AI backend producing a deterministic, publishable artifact.
pub struct StubAiStage;

impl AiStage for StubAiStage {
    fn redact(&self, input: &StageInput<'_>) -> Result<RedactionOutput, AiStageError> {
        Ok(RedactionOutput {
            redacted_text: input.text.replace("John Doe", "[party A]"),
            requires_manual_review: false,
        })
    }

    fn analyze(&self, _input: &StageInput<'_>) -> Result<AnalysisOutput, AiStageError> {
        Ok(AnalysisOutput {
            analysis: serde_json::json!({
                "area": "tenancy",
                "keyPoints": ["deposit withheld", "landlord liable"],
            }),
            requires_manual_review: false,
        })
    }

    fn generate(&self, input: &StageInput<'_>) -> Result<ArtifactDraft, AiStageError> {
        let area = input
            .analysis
            .and_then(|a| a["area"].as_str())
            .unwrap_or("general")
            .to_string();
        Ok(ArtifactDraft {
            title: "When Landlords Must Return the Deposit".to_string(),
            body_html: format!("<p>{}</p>", "word ".repeat(600)),
            excerpt: "A district court ruling on deposits.".to_string(),
            focus_keyword: "rental deposit".to_string(),
            meta_title: "Rental Deposits and the Law".to_string(),
            meta_description: "What a recent verdict means for tenants.".to_string(),
            area: Some(area),
            tags: vec!["tenancy".to_string()],
            quality: QualitySignals {
                content_score: 82,
                seo_score: 78,
                readability_score: 85,
                overall_score: 81,
            },
        })
    }
}

/// Remote client replaying scripted outcomes for `create_or_update`, and
/// a separately scripted `status` response.
pub struct FakeRemoteClient {
    publish_script: Mutex<Vec<Result<RemoteRef, RemoteError>>>,
    status_response: Mutex<Option<Result<RemotePostState, RemoteError>>>,
    publish_calls: Mutex<u32>,
}

impl FakeRemoteClient {
    pub fn new(publish_script: Vec<Result<RemoteRef, RemoteError>>) -> Self {
        Self {
            publish_script: Mutex::new(publish_script),
            status_response: Mutex::new(None),
            publish_calls: Mutex::new(0),
        }
    }

    pub fn always_succeeding() -> Self {
        Self::new(Vec::new())
    }

    pub fn with_status(self, response: Result<RemotePostState, RemoteError>) -> Self {
        *self.status_response.lock().unwrap() = Some(response);
        self
    }

    pub fn publish_calls(&self) -> u32 {
        *self.publish_calls.lock().unwrap()
    }
}

impl RemoteClient for FakeRemoteClient {
    fn create_or_update(
        &self,
        _payload: &RemotePayload,
        existing: Option<&RemoteRef>,
        _timeout: Duration,
    ) -> Result<RemoteRef, RemoteError> {
        let calls = {
            let mut guard = self.publish_calls.lock().unwrap();
            *guard += 1;
            *guard
        };

        let mut script = self.publish_script.lock().unwrap();
        if script.is_empty() {
            // Default: update keeps the post id, create mints one.
            let post_id = existing.map(|r| r.post_id).unwrap_or(100 + calls as i64);
            return Ok(RemoteRef {
                post_id,
                url: format!("https://cms.example.com/?p={}", post_id),
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
        self.status_response
            .lock()
            .unwrap()
            .take()
            .unwrap_or(Err(RemoteError::Transient("status not scripted".to_string())))
    }

    fn sections(&self, _timeout: Duration) -> Result<Vec<RemoteSection>, RemoteError> {
        Ok(vec![RemoteSection {
            id: 1,
            name: "General".to_string(),
        }])
    }
}

/// Sleeper that records delays instead of waiting.
pub struct RecordingSleeper {
    pub delays: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self {
            delays: Mutex::new(Vec::new()),
        }
    }
}

impl Sleeper for RecordingSleeper {
    fn sleep(&self, duration: Duration) {
        self.delays.lock().unwrap().push(duration);
    }
}

pub fn test_target() -> RemoteTarget {
    let mut section_map = HashMap::new();
    section_map.insert("tenancy".to_string(), 7);
    RemoteTarget {
        id: "target-1".to_string(),
        name: "Main Site".to_string(),
        base_url: "https://cms.example.com".to_string(),
        default_section_id: Some(1),
        section_map,
        active: true,
        created_at: Utc::now(),
    }
}
