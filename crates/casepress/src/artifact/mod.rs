//! Publishable artifacts generated from analyzed documents.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::remote::RemoteRef;
use crate::stages::ArtifactDraft;

/// Publication lifecycle of an artifact, independent of the source
/// document's processing stage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PublishStatus {
    Draft,
    Ready,
    Published,
    Failed,
}

impl PublishStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PublishStatus::Draft => "draft",
            PublishStatus::Ready => "ready",
            PublishStatus::Published => "published",
            PublishStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(PublishStatus::Draft),
            "ready" => Some(PublishStatus::Ready),
            "published" => Some(PublishStatus::Published),
            "failed" => Some(PublishStatus::Failed),
            _ => None,
        }
    }
}

impl std::fmt::Display for PublishStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Quality scores assigned during generation, each 0-100.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct QualitySignals {
    pub content_score: u32,
    pub seo_score: u32,
    pub readability_score: u32,
    pub overall_score: u32,
}

/// A generated article ready for (or already) published to a remote CMS.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Artifact {
    pub id: String,
    pub document_id: String,
    pub title: String,
    pub body_html: String,
    pub excerpt: String,
    pub focus_keyword: String,
    pub meta_title: String,
    pub meta_description: String,
    /// Legal practice area, used to pick a remote section.
    pub area: Option<String>,
    pub tags: Vec<String>,
    pub word_count: u32,
    pub quality: QualitySignals,
    pub publish_status: PublishStatus,
    /// Set after the first successful publish; cleared when the remote
    /// post disappears.
    pub remote_ref: Option<RemoteRef>,
    pub last_publish_error: Option<String>,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Artifact {
    /// Builds a fresh draft artifact from generation output.
    pub fn from_draft(document_id: &str, draft: ArtifactDraft) -> Self {
        let now = Utc::now();
        let word_count = count_words(&draft.body_html);
        Artifact {
            id: Uuid::new_v4().to_string(),
            document_id: document_id.to_string(),
            title: draft.title,
            body_html: draft.body_html,
            excerpt: draft.excerpt,
            focus_keyword: draft.focus_keyword,
            meta_title: draft.meta_title,
            meta_description: draft.meta_description,
            area: draft.area,
            tags: draft.tags,
            word_count,
            quality: draft.quality,
            publish_status: PublishStatus::Draft,
            remote_ref: None,
            last_publish_error: None,
            published_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Counts whitespace-separated words. Markup tags count as words, which
/// slightly overestimates; the validation threshold accounts for this.
pub fn count_words(text: &str) -> u32 {
    text.split_whitespace().count() as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_draft() -> ArtifactDraft {
        ArtifactDraft {
            title: "Liability in Rental Disputes".to_string(),
            body_html: "<p>one two three four five</p>".to_string(),
            excerpt: "A short excerpt.".to_string(),
            focus_keyword: "rental liability".to_string(),
            meta_title: "Rental Liability Explained".to_string(),
            meta_description: "What landlords owe tenants.".to_string(),
            area: Some("tenancy".to_string()),
            tags: vec!["rental".to_string()],
            quality: QualitySignals {
                content_score: 80,
                seo_score: 75,
                readability_score: 82,
                overall_score: 79,
            },
        }
    }

    #[test]
    fn test_status_str_roundtrip() {
        for status in [
            PublishStatus::Draft,
            PublishStatus::Ready,
            PublishStatus::Published,
            PublishStatus::Failed,
        ] {
            assert_eq!(PublishStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(PublishStatus::parse("pending"), None);
    }

    #[test]
    fn test_from_draft_starts_as_draft() {
        let artifact = Artifact::from_draft("doc-1", sample_draft());
        assert_eq!(artifact.publish_status, PublishStatus::Draft);
        assert!(artifact.remote_ref.is_none());
        assert!(artifact.last_publish_error.is_none());
        assert!(artifact.published_at.is_none());
        assert_eq!(artifact.document_id, "doc-1");
        assert_eq!(artifact.word_count, 5);
    }

    #[test]
    fn test_count_words() {
        assert_eq!(count_words(""), 0);
        assert_eq!(count_words("  one   two "), 2);
    }
}
