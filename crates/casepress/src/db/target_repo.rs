//! Remote target repository — persistence for the `remote_targets` table.

use rusqlite::{params, Row};

use super::{Database, DatabaseError};
use crate::document::parse_timestamp;
use crate::remote::RemoteTarget;

fn from_row(row: &Row<'_>) -> Result<RemoteTarget, rusqlite::Error> {
    let id: String = row.get("id")?;
    let section_map_raw: String = row.get("section_map")?;
    let created_raw: String = row.get("created_at")?;

    let section_map = serde_json::from_str(&section_map_raw).unwrap_or_else(|e| {
        log::warn!("Invalid section map JSON for target {}: {}", id, e);
        Default::default()
    });

    Ok(RemoteTarget {
        section_map,
        created_at: parse_timestamp(&created_raw, "created_at"),
        name: row.get("name")?,
        base_url: row.get("base_url")?,
        default_section_id: row.get("default_section_id")?,
        active: row.get::<_, i64>("active")? != 0,
        id,
    })
}

/// Inserts a new remote target.
pub fn insert(db: &Database, target: &RemoteTarget) -> Result<(), DatabaseError> {
    let section_map =
        serde_json::to_string(&target.section_map).unwrap_or_else(|_| "{}".to_string());
    db.with_conn(|conn| {
        conn.execute(
            "INSERT INTO remote_targets (id, name, base_url, default_section_id, section_map,
             active, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                target.id,
                target.name,
                target.base_url,
                target.default_section_id,
                section_map,
                target.active as i64,
                target.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    })
}

/// Finds a target by its ID.
pub fn find_by_id(db: &Database, id: &str) -> Result<Option<RemoteTarget>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt = conn.prepare("SELECT * FROM remote_targets WHERE id = ?1")?;
        let mut rows = stmt.query_map(params![id], from_row)?;
        match rows.next() {
            Some(Ok(target)) => Ok(Some(target)),
            Some(Err(e)) => Err(DatabaseError::Sqlite(e)),
            None => Ok(None),
        }
    })
}

/// Lists active targets by name.
pub fn list_active(db: &Database) -> Result<Vec<RemoteTarget>, DatabaseError> {
    db.with_conn(|conn| {
        let mut stmt =
            conn.prepare("SELECT * FROM remote_targets WHERE active = 1 ORDER BY name")?;
        let targets = stmt
            .query_map([], from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(targets)
    })
}

/// Deactivates a target without removing its history.
pub fn deactivate(db: &Database, id: &str) -> Result<bool, DatabaseError> {
    db.with_conn(|conn| {
        let changed =
            conn.execute("UPDATE remote_targets SET active = 0 WHERE id = ?1", params![id])?;
        Ok(changed == 1)
    })
}
