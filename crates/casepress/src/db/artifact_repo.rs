//! Artifact repository — persistence for the `artifacts` table.
//!
//! Publish bookkeeping is split into narrow updates so each caller
//! touches only the columns it owns: `set_publish_failure` writes
//! `last_publish_error`, `clear_remote_ref` deliberately leaves it alone.

use chrono::Utc;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::artifact::{Artifact, PublishStatus, QualitySignals};
use crate::document::parse_timestamp;
use crate::remote::RemoteRef;
use crate::stages::ArtifactDraft;

fn from_row(row: &Row<'_>) -> Result<Artifact, rusqlite::Error> {
    let id: String = row.get("id")?;
    let status_raw: String = row.get("publish_status")?;
    let tags_raw: String = row.get("tags")?;
    let remote_post_id: Option<i64> = row.get("remote_post_id")?;
    let remote_url: Option<String> = row.get("remote_url")?;
    let remote_target_id: Option<String> = row.get("remote_target_id")?;
    let published_raw: Option<String> = row.get("published_at")?;
    let created_raw: String = row.get("created_at")?;
    let updated_raw: String = row.get("updated_at")?;

    let publish_status = PublishStatus::parse(&status_raw).unwrap_or_else(|| {
        log::warn!("Unknown publish status '{}' for artifact {}", status_raw, id);
        PublishStatus::Draft
    });

    let tags: Vec<String> = serde_json::from_str(&tags_raw).unwrap_or_else(|e| {
        log::warn!("Invalid tags JSON for artifact {}: {}", id, e);
        Vec::new()
    });

    let remote_ref = match (remote_post_id, remote_url, remote_target_id) {
        (Some(post_id), Some(url), Some(target_id)) => Some(RemoteRef {
            post_id,
            url,
            target_id,
        }),
        _ => None,
    };

    Ok(Artifact {
        publish_status,
        tags,
        remote_ref,
        published_at: published_raw.map(|raw| parse_timestamp(&raw, "published_at")),
        created_at: parse_timestamp(&created_raw, "created_at"),
        updated_at: parse_timestamp(&updated_raw, "updated_at"),
        document_id: row.get("document_id")?,
        title: row.get("title")?,
        body_html: row.get("body_html")?,
        excerpt: row.get("excerpt")?,
        focus_keyword: row.get("focus_keyword")?,
        meta_title: row.get("meta_title")?,
        meta_description: row.get("meta_description")?,
        area: row.get("area")?,
        word_count: row.get("word_count")?,
        quality: QualitySignals {
            content_score: row.get("content_score")?,
            seo_score: row.get("seo_score")?,
            readability_score: row.get("readability_score")?,
            overall_score: row.get("overall_score")?,
        },
        last_publish_error: row.get("last_publish_error")?,
        id,
    })
}

/// Inserts a new artifact row.
pub fn insert(db: &Database, artifact: &Artifact) -> Result<(), DatabaseError> {
    let tags = serde_json::to_string(&artifact.tags).unwrap_or_else(|_| "[]".to_string());
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO artifacts (id, document_id, title, body_html, excerpt, focus_keyword,
             meta_title, meta_description, area, tags, word_count, content_score, seo_score,
             readability_score, overall_score, publish_status, remote_post_id, remote_url,
             remote_target_id, last_publish_error, published_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16,
             ?17, ?18, ?19, ?20, ?21, ?22, ?23)",
            params![
                artifact.id,
                artifact.document_id,
                artifact.title,
                artifact.body_html,
                artifact.excerpt,
                artifact.focus_keyword,
                artifact.meta_title,
                artifact.meta_description,
                artifact.area,
                tags,
                artifact.word_count,
                artifact.quality.content_score,
                artifact.quality.seo_score,
                artifact.quality.readability_score,
                artifact.quality.overall_score,
                artifact.publish_status.as_str(),
                artifact.remote_ref.as_ref().map(|r| r.post_id),
                artifact.remote_ref.as_ref().map(|r| r.url.clone()),
                artifact.remote_ref.as_ref().map(|r| r.target_id.clone()),
                artifact.last_publish_error,
                artifact.published_at.map(|t| t.to_rfc3339()),
                artifact.created_at.to_rfc3339(),
                artifact.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Finds an artifact by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Artifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM artifacts WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], from_row)?;
        match rows.next() {
            Some(Ok(artifact)) => Ok(Some(artifact)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds the artifact generated from a document, if any.
pub fn find_by_document(db: &Database, document_id: &str) -> Result<Option<Artifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM artifacts WHERE document_id = ?1")?;
        let mut rows = stmt.query_map(params![document_id], from_row)?;
        match rows.next() {
            Some(Ok(artifact)) => Ok(Some(artifact)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Replaces the generated content of an existing artifact while
/// preserving its publish bookkeeping (status, remote ref, error,
/// timestamps). Used when a document is regenerated.
pub fn update_draft_content(
    db: &Database,
    id: &str,
    draft: &ArtifactDraft,
    word_count: u32,
) -> Result<(), DatabaseError> {
    let tags = serde_json::to_string(&draft.tags).unwrap_or_else(|_| "[]".to_string());
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET title=?2, body_html=?3, excerpt=?4, focus_keyword=?5,
             meta_title=?6, meta_description=?7, area=?8, tags=?9, word_count=?10,
             content_score=?11, seo_score=?12, readability_score=?13, overall_score=?14,
             updated_at=?15
             WHERE id=?1",
            params![
                id,
                draft.title,
                draft.body_html,
                draft.excerpt,
                draft.focus_keyword,
                draft.meta_title,
                draft.meta_description,
                draft.area,
                tags,
                word_count,
                draft.quality.content_score,
                draft.quality.seo_score,
                draft.quality.readability_score,
                draft.quality.overall_score,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Records a successful publish: status, remote identity, timestamp, and
/// a cleared error slot.
pub fn set_publish_success(
    db: &Database,
    id: &str,
    status: PublishStatus,
    remote_ref: &RemoteRef,
    published_at: Option<chrono::DateTime<Utc>>,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET publish_status=?2, remote_post_id=?3, remote_url=?4,
             remote_target_id=?5, last_publish_error=NULL, published_at=?6, updated_at=?7
             WHERE id=?1",
            params![
                id,
                status.as_str(),
                remote_ref.post_id,
                remote_ref.url,
                remote_ref.target_id,
                published_at.map(|t| t.to_rfc3339()),
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Records a failed publish attempt.
pub fn set_publish_failure(db: &Database, id: &str, error: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET publish_status='failed', last_publish_error=?2, updated_at=?3
             WHERE id=?1",
            params![id, error, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Sets the publish status without touching any other column.
pub fn set_status(db: &Database, id: &str, status: PublishStatus) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET publish_status=?2, updated_at=?3 WHERE id=?1",
            params![id, status.as_str(), Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Refreshes only the remote URL (permalinks can change server-side).
pub fn set_remote_url(db: &Database, id: &str, url: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET remote_url=?2, updated_at=?3 WHERE id=?1",
            params![id, url, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Detaches an artifact from a vanished remote post: back to `draft`,
/// remote identity cleared. `last_publish_error` is left untouched — it
/// describes the last publish attempt, not the remote's current state.
pub fn clear_remote_ref(db: &Database, id: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE artifacts SET publish_status='draft', remote_post_id=NULL, remote_url=NULL,
             remote_target_id=NULL, published_at=NULL, updated_at=?2
             WHERE id=?1",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Lists artifacts eligible for publishing: status `ready`, score at or
/// above the threshold, not yet attached to a remote post. Highest score
/// first, newest first within a score.
pub fn list_ready(db: &Database, min_score: u32) -> Result<Vec<Artifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM artifacts
             WHERE publish_status = 'ready' AND overall_score >= ?1 AND remote_post_id IS NULL
             ORDER BY overall_score DESC, created_at DESC",
        )?;
        let artifacts = stmt
            .query_map(params![min_score], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artifacts)
    })
}

/// Lists artifacts whose last publish attempt failed, oldest failure
/// first.
pub fn list_failed(db: &Database, limit: u64) -> Result<Vec<Artifact>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT * FROM artifacts WHERE publish_status = 'failed'
             ORDER BY updated_at ASC LIMIT ?1",
        )?;
        let artifacts = stmt
            .query_map(params![limit as i64], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(artifacts)
    })
}

/// Counts artifacts per publish status.
pub fn status_counts(db: &Database) -> Result<Vec<(String, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare(
            "SELECT publish_status, COUNT(*) FROM artifacts
             GROUP BY publish_status ORDER BY publish_status",
        )?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::document_repo;
    use crate::document::Document;

    fn test_db() -> Database {
        Database::open_in_memory().expect("Failed to create test database")
    }

    fn insert_document(db: &Database, fingerprint: &str) -> Document {
        let doc = Document::new(fingerprint.to_string(), "v.txt".to_string(), None);
        document_repo::insert(db, &doc).unwrap();
        doc
    }

    fn sample_artifact(db: &Database, fingerprint: &str, score: u32) -> Artifact {
        let doc = insert_document(db, fingerprint);
        let artifact = Artifact::from_draft(
            &doc.id,
            ArtifactDraft {
                title: "Title".to_string(),
                body_html: "<p>body text here</p>".to_string(),
                excerpt: "Excerpt".to_string(),
                focus_keyword: "keyword".to_string(),
                meta_title: "Meta".to_string(),
                meta_description: "Desc".to_string(),
                area: Some("tenancy".to_string()),
                tags: vec!["law".to_string(), "rental".to_string()],
                quality: QualitySignals {
                    content_score: score,
                    seo_score: score,
                    readability_score: score,
                    overall_score: score,
                },
            },
        );
        insert(db, &artifact).unwrap();
        artifact
    }

    fn remote_ref() -> RemoteRef {
        RemoteRef {
            post_id: 42,
            url: "https://cms.example.com/?p=42".to_string(),
            target_id: "target-1".to_string(),
        }
    }

    #[test]
    fn test_insert_and_find() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-1", 70);

        let found = find_by_id(&db, &artifact.id).unwrap().unwrap();
        assert_eq!(found.title, "Title");
        assert_eq!(found.tags, vec!["law", "rental"]);
        assert_eq!(found.publish_status, PublishStatus::Draft);
        assert!(found.remote_ref.is_none());
    }

    #[test]
    fn test_find_by_document() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-2", 70);

        let found = find_by_document(&db, &artifact.document_id).unwrap();
        assert_eq!(found.unwrap().id, artifact.id);
        assert!(find_by_document(&db, "missing").unwrap().is_none());
    }

    #[test]
    fn test_one_artifact_per_document() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-3", 70);

        let mut second = artifact.clone();
        second.id = "other-id".to_string();
        assert!(insert(&db, &second).is_err());
    }

    #[test]
    fn test_publish_success_then_failure() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-4", 70);

        set_publish_success(
            &db,
            &artifact.id,
            PublishStatus::Published,
            &remote_ref(),
            Some(Utc::now()),
        )
        .unwrap();
        let found = find_by_id(&db, &artifact.id).unwrap().unwrap();
        assert_eq!(found.publish_status, PublishStatus::Published);
        assert_eq!(found.remote_ref.as_ref().unwrap().post_id, 42);
        assert!(found.published_at.is_some());
        assert!(found.last_publish_error.is_none());

        set_publish_failure(&db, &artifact.id, "remote 502").unwrap();
        let found = find_by_id(&db, &artifact.id).unwrap().unwrap();
        assert_eq!(found.publish_status, PublishStatus::Failed);
        assert_eq!(found.last_publish_error.as_deref(), Some("remote 502"));
    }

    #[test]
    fn test_clear_remote_ref_preserves_error() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-5", 70);
        set_publish_success(
            &db,
            &artifact.id,
            PublishStatus::Published,
            &remote_ref(),
            Some(Utc::now()),
        )
        .unwrap();
        set_publish_failure(&db, &artifact.id, "last error").unwrap();

        clear_remote_ref(&db, &artifact.id).unwrap();

        let found = find_by_id(&db, &artifact.id).unwrap().unwrap();
        assert_eq!(found.publish_status, PublishStatus::Draft);
        assert!(found.remote_ref.is_none());
        assert!(found.published_at.is_none());
        assert_eq!(found.last_publish_error.as_deref(), Some("last error"));
    }

    #[test]
    fn test_list_ready_filters_and_orders() {
        let db = test_db();
        let low = sample_artifact(&db, "fp-low", 40);
        let mid = sample_artifact(&db, "fp-mid", 60);
        let high = sample_artifact(&db, "fp-high", 90);
        let published = sample_artifact(&db, "fp-pub", 95);

        for a in [&low, &mid, &high] {
            set_status(&db, &a.id, PublishStatus::Ready).unwrap();
        }
        set_status(&db, &published.id, PublishStatus::Ready).unwrap();
        set_publish_success(
            &db,
            &published.id,
            PublishStatus::Published,
            &remote_ref(),
            Some(Utc::now()),
        )
        .unwrap();

        let ready = list_ready(&db, 50).unwrap();
        let ids: Vec<&str> = ready.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids, vec![high.id.as_str(), mid.id.as_str()]);
    }

    #[test]
    fn test_update_draft_content_preserves_publish_fields() {
        let db = test_db();
        let artifact = sample_artifact(&db, "fp-6", 70);
        set_publish_success(
            &db,
            &artifact.id,
            PublishStatus::Published,
            &remote_ref(),
            Some(Utc::now()),
        )
        .unwrap();

        let draft = ArtifactDraft {
            title: "New Title".to_string(),
            body_html: "<p>regenerated body</p>".to_string(),
            excerpt: "New excerpt".to_string(),
            focus_keyword: "new keyword".to_string(),
            meta_title: "New Meta".to_string(),
            meta_description: "New Desc".to_string(),
            area: None,
            tags: vec![],
            quality: QualitySignals {
                content_score: 85,
                seo_score: 85,
                readability_score: 85,
                overall_score: 85,
            },
        };
        update_draft_content(&db, &artifact.id, &draft, 2).unwrap();

        let found = find_by_id(&db, &artifact.id).unwrap().unwrap();
        assert_eq!(found.title, "New Title");
        assert_eq!(found.quality.overall_score, 85);
        // Publish bookkeeping untouched.
        assert_eq!(found.publish_status, PublishStatus::Published);
        assert_eq!(found.remote_ref.as_ref().unwrap().post_id, 42);
        assert!(found.published_at.is_some());
    }

    #[test]
    fn test_status_counts() {
        let db = test_db();
        let a = sample_artifact(&db, "fp-7", 70);
        let b = sample_artifact(&db, "fp-8", 70);
        sample_artifact(&db, "fp-9", 70);
        set_status(&db, &a.id, PublishStatus::Ready).unwrap();
        set_publish_failure(&db, &b.id, "boom").unwrap();

        let counts = status_counts(&db).unwrap();
        assert!(counts.contains(&("draft".to_string(), 1)));
        assert!(counts.contains(&("ready".to_string(), 1)));
        assert!(counts.contains(&("failed".to_string(), 1)));
    }

    #[test]
    fn test_list_failed() {
        let db = test_db();
        let a = sample_artifact(&db, "fp-10", 70);
        set_publish_failure(&db, &a.id, "boom").unwrap();

        let failed = list_failed(&db, 10).unwrap();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].id, a.id);
    }
}
