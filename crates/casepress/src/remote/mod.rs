//! Remote CMS targets, payload mapping, and the client seam.
//!
//! Publishing talks to a remote CMS through [`RemoteClient`], a trait so
//! tests can script outcomes without any network. Each client instance is
//! bound to exactly one target.

use std::collections::HashMap;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::artifact::Artifact;

/// Identity of a post on a remote target.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct RemoteRef {
    pub post_id: i64,
    pub url: String,
    pub target_id: String,
}

/// Post state as reported by the remote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemoteState {
    Published,
    Draft,
    /// Any state this system does not manage (pending review, scheduled,
    /// private, ...).
    Other(String),
}

/// A status probe result for an existing remote post.
#[derive(Debug, Clone)]
pub struct RemotePostState {
    pub state: RemoteState,
    pub url: Option<String>,
}

/// A content section (category) on the remote target.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteSection {
    pub id: i64,
    pub name: String,
}

/// Whether a publish call should leave the remote post live or as a
/// remote-side draft.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DesiredStatus {
    Draft,
    Publish,
}

impl DesiredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            DesiredStatus::Draft => "draft",
            DesiredStatus::Publish => "publish",
        }
    }
}

/// A configured remote CMS destination.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoteTarget {
    pub id: String,
    pub name: String,
    pub base_url: String,
    /// Section used when no area-specific mapping matches.
    pub default_section_id: Option<i64>,
    /// Maps an artifact's practice area to a section id on this target.
    pub section_map: HashMap<String, i64>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl RemoteTarget {
    /// Resolves the section for an artifact's area, if any.
    pub fn section_for(&self, area: Option<&str>) -> Option<i64> {
        area.and_then(|a| self.section_map.get(a).copied())
            .or(self.default_section_id)
    }
}

/// The wire-shaped post body sent to a remote target.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RemotePayload {
    pub title: String,
    pub content: String,
    pub excerpt: String,
    pub status: String,
    pub section_ids: Vec<i64>,
    pub tags: Vec<String>,
    pub meta_title: String,
    pub meta_description: String,
    pub focus_keyword: String,
}

impl RemotePayload {
    pub fn from_artifact(artifact: &Artifact, target: &RemoteTarget, desired: DesiredStatus) -> Self {
        let section_ids = target
            .section_for(artifact.area.as_deref())
            .into_iter()
            .collect();
        RemotePayload {
            title: artifact.title.clone(),
            content: artifact.body_html.clone(),
            excerpt: artifact.excerpt.clone(),
            status: desired.as_str().to_string(),
            section_ids,
            tags: artifact.tags.clone(),
            meta_title: artifact.meta_title.clone(),
            meta_description: artifact.meta_description.clone(),
            focus_keyword: artifact.focus_keyword.clone(),
        }
    }
}

/// Classified remote failure. Retryability is a property of the variant,
/// never of message text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RemoteError {
    #[error("Authentication rejected: {0}")]
    Auth(String),

    #[error("Remote resource not found: {0}")]
    NotFound(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transient remote failure: {0}")]
    Transient(String),

    #[error("Malformed remote response: {0}")]
    Malformed(String),
}

impl RemoteError {
    /// Whether a retry with backoff may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            RemoteError::RateLimited(_) | RemoteError::Timeout(_) | RemoteError::Transient(_)
        )
    }
}

/// Client for one remote target.
pub trait RemoteClient: Send + Sync {
    /// Creates the post, or updates it in place when `existing` is given.
    fn create_or_update(
        &self,
        payload: &RemotePayload,
        existing: Option<&RemoteRef>,
        timeout: Duration,
    ) -> Result<RemoteRef, RemoteError>;

    /// Fetches the current state of an existing post.
    fn status(&self, remote_ref: &RemoteRef, timeout: Duration) -> Result<RemotePostState, RemoteError>;

    /// Lists the sections available on the target.
    fn sections(&self, timeout: Duration) -> Result<Vec<RemoteSection>, RemoteError>;
}
