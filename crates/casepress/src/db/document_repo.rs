//! Document repository — persistence for the `documents` table.
//!
//! Stage changes go through [`transition`], a conditional update that
//! only applies when the row is still in the expected stage. Callers
//! check the returned flag to detect lost races.

use chrono::Utc;
use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::document::{parse_stage, parse_timestamp, Document, DocumentStage};

fn from_row(row: &Row<'_>) -> Result<Document, rusqlite::Error> {
    let id: String = row.get("id")?;
    let stage_raw: String = row.get("stage")?;
    let analysis_raw: Option<String> = row.get("analysis")?;
    let created_raw: String = row.get("created_at")?;
    let updated_raw: String = row.get("updated_at")?;

    let analysis = analysis_raw.and_then(|raw| match serde_json::from_str(&raw) {
        Ok(value) => Some(value),
        Err(e) => {
            log::warn!("Invalid analysis JSON for document {}: {}", id, e);
            None
        }
    });

    Ok(Document {
        stage: parse_stage(&stage_raw, &id),
        analysis,
        created_at: parse_timestamp(&created_raw, "created_at"),
        updated_at: parse_timestamp(&updated_raw, "updated_at"),
        fingerprint: row.get("fingerprint")?,
        filename: row.get("filename")?,
        mime_type: row.get("mime_type")?,
        original_text: row.get("original_text")?,
        redacted_text: row.get("redacted_text")?,
        progress: row.get("progress")?,
        progress_message: row.get("progress_message")?,
        failure_notes: row.get("failure_notes")?,
        requires_manual_review: row.get::<_, i64>("requires_manual_review")? != 0,
        id,
    })
}

/// Inserts a new document row.
pub fn insert(db: &Database, doc: &Document) -> Result<(), DatabaseError> {
    let analysis = doc
        .analysis
        .as_ref()
        .map(|v| serde_json::to_string(v).unwrap_or_default());
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO documents (id, fingerprint, filename, mime_type, stage, original_text,
             redacted_text, analysis, progress, progress_message, failure_notes,
             requires_manual_review, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                doc.id,
                doc.fingerprint,
                doc.filename,
                doc.mime_type,
                doc.stage.as_str(),
                doc.original_text,
                doc.redacted_text,
                analysis,
                doc.progress,
                doc.progress_message,
                doc.failure_notes,
                doc.requires_manual_review as i64,
                doc.created_at.to_rfc3339(),
                doc.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Finds a document by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], from_row)?;
        match rows.next() {
            Some(Ok(doc)) => Ok(Some(doc)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Finds a document by its content fingerprint.
pub fn find_by_fingerprint(
    db: &Database,
    fingerprint: &str,
) -> Result<Option<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM documents WHERE fingerprint = ?1")?;
        let mut rows = stmt.query_map(params![fingerprint], from_row)?;
        match rows.next() {
            Some(Ok(doc)) => Ok(Some(doc)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists documents, newest first.
pub fn list(db: &Database, limit: u64) -> Result<Vec<Document>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM documents ORDER BY created_at DESC LIMIT ?1")?;
        let docs = stmt
            .query_map(params![limit as i64], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(docs)
    })
}

/// Atomically moves a document from `from` to `to`.
///
/// Returns `false` when the row was no longer in `from` — the caller
/// lost a race and must not proceed.
pub fn transition(
    db: &Database,
    id: &str,
    from: DocumentStage,
    to: DocumentStage,
    progress: u32,
    message: &str,
    clear_failure: bool,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let sql = if clear_failure {
            "UPDATE documents SET stage=?3, progress=?4, progress_message=?5, \
             failure_notes=NULL, updated_at=?6 WHERE id=?1 AND stage=?2"
        } else {
            "UPDATE documents SET stage=?3, progress=?4, progress_message=?5, \
             updated_at=?6 WHERE id=?1 AND stage=?2"
        };
        let changed = conn.execute(
            sql,
            params![
                id,
                from.as_str(),
                to.as_str(),
                progress,
                message,
                Utc::now().to_rfc3339(),
            ],
        )?;
        Ok(changed == 1)
    })
}

/// Stores extraction output and advances to `text_extracted`.
pub fn store_extracted(db: &Database, id: &str, text: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET original_text=?2, stage='text_extracted', progress=100,
             progress_message='Text extracted', updated_at=?3
             WHERE id=?1 AND stage='new'",
            params![id, text, Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

/// Stores redaction output and advances `redacting` → `redacted`.
pub fn store_redaction(
    db: &Database,
    id: &str,
    redacted_text: &str,
    requires_review: bool,
) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET redacted_text=?2, stage='redacted', progress=100,
             progress_message='Redaction complete',
             requires_manual_review=MAX(requires_manual_review, ?3), updated_at=?4
             WHERE id=?1 AND stage='redacting'",
            params![id, redacted_text, requires_review as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

/// Stores analysis output and advances `analyzing` → `analyzed`.
pub fn store_analysis(
    db: &Database,
    id: &str,
    analysis: &serde_json::Value,
    requires_review: bool,
) -> Result<bool, DatabaseError> {
    // Serializing a `serde_json::Value` cannot fail.
    let analysis_json = serde_json::to_string(analysis).unwrap_or_default();
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET analysis=?2, stage='analyzed', progress=100,
             progress_message='Analysis complete',
             requires_manual_review=MAX(requires_manual_review, ?3), updated_at=?4
             WHERE id=?1 AND stage='analyzing'",
            params![id, analysis_json, requires_review as i64, Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

/// Marks generation done, advancing `analyzed` → `artifact_created`.
pub fn mark_artifact_created(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET stage='artifact_created', progress=100,
             progress_message='Artifact created', updated_at=?2
             WHERE id=?1 AND stage='analyzed'",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

/// Marks a document failed, recording the reason. Applies from any stage.
pub fn mark_failed(db: &Database, id: &str, reason: &str) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET stage='failed', failure_notes=?2,
             progress_message='Failed', updated_at=?3 WHERE id=?1",
            params![id, reason, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Updates coarse progress for the currently running stage.
pub fn set_progress(
    db: &Database,
    id: &str,
    progress: u32,
    message: &str,
) -> Result<(), DatabaseError> {
    db.with_conn(|conn| {
        conn.execute(
            "UPDATE documents SET progress=?2, progress_message=?3, updated_at=?4 WHERE id=?1",
            params![id, progress, message, Utc::now().to_rfc3339()],
        )?;
        Ok(())
    })
}

/// Resets a document back to `text_extracted`, clearing derived state so
/// the pipeline can run again from the top.
///
/// Conditional on the document not being in flight; returns `false` when
/// the reset did not apply.
pub fn reset_for_reprocess(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute(
            "UPDATE documents SET stage='text_extracted', redacted_text=NULL, analysis=NULL,
             progress=0, progress_message='Reset for reprocessing', failure_notes=NULL,
             updated_at=?2
             WHERE id=?1 AND stage NOT IN ('new', 'redacting', 'analyzing')",
            params![id, Utc::now().to_rfc3339()],
        )?;
        Ok(changed == 1)
    })
}

/// Counts documents per stage.
pub fn count_by_stage(db: &Database) -> Result<Vec<(String, u64)>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT stage, COUNT(*) FROM documents GROUP BY stage ORDER BY stage")?;
        let counts = stmt
            .query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, u64>(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(counts)
    })
}

/// Deletes a document (cascades to its artifact).
pub fn delete(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed = conn.execute("DELETE FROM documents WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}
