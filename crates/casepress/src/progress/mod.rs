//! In-memory batch progress tracking.
//!
//! Each batch publish run gets an entry keyed by its token. Entries are
//! evicted after a retention window and the store is capped, oldest
//! first, so abandoned pollers cannot grow memory without bound.

use std::collections::HashMap;
use std::sync::RwLock;

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const MAX_ENTRIES: usize = 100;

/// Lifecycle of a batch run.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    Processing,
    Completed,
}

/// One failed item within a batch.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemFailure {
    pub id: String,
    pub error: String,
}

/// Snapshot of a batch run.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressEntry {
    pub status: BatchStatus,
    /// Items attempted so far.
    pub current: usize,
    pub total: usize,
    pub succeeded: Vec<String>,
    pub failed: Vec<ItemFailure>,
    /// Item currently being published, if any.
    pub current_id: Option<String>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Thread-safe progress store shared between the batch worker and
/// pollers.
pub struct ProgressTracker {
    entries: RwLock<HashMap<String, ProgressEntry>>,
    retention: Duration,
}

impl ProgressTracker {
    pub fn new(retention_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            retention: Duration::seconds(retention_secs),
        }
    }

    /// Registers a new batch run.
    pub fn start(&self, token: &str, total: usize) {
        let mut entries = self.write_entries();
        evict(&mut entries, self.retention);

        entries.insert(
            token.to_string(),
            ProgressEntry {
                status: BatchStatus::Processing,
                current: 0,
                total,
                succeeded: Vec::new(),
                failed: Vec::new(),
                current_id: None,
                started_at: Utc::now(),
                completed_at: None,
            },
        );
    }

    /// Marks an item as the one currently being attempted.
    pub fn begin_item(&self, token: &str, id: &str) {
        let mut entries = self.write_entries();
        if let Some(entry) = entries.get_mut(token) {
            entry.current += 1;
            entry.current_id = Some(id.to_string());
        }
    }

    pub fn record_success(&self, token: &str, id: &str) {
        let mut entries = self.write_entries();
        if let Some(entry) = entries.get_mut(token) {
            entry.succeeded.push(id.to_string());
            entry.current_id = None;
        }
    }

    pub fn record_failure(&self, token: &str, id: &str, error: &str) {
        let mut entries = self.write_entries();
        if let Some(entry) = entries.get_mut(token) {
            entry.failed.push(ItemFailure {
                id: id.to_string(),
                error: error.to_string(),
            });
            entry.current_id = None;
        }
    }

    /// Finalizes a batch run. Later calls for the same token are no-ops,
    /// so completion is recorded exactly once.
    pub fn complete(&self, token: &str) {
        let mut entries = self.write_entries();
        if let Some(entry) = entries.get_mut(token) {
            if entry.status != BatchStatus::Completed {
                entry.status = BatchStatus::Completed;
                entry.completed_at = Some(Utc::now());
            }
        }
    }

    /// Returns a snapshot of a batch run, or `None` once it has been
    /// evicted.
    pub fn get(&self, token: &str) -> Option<ProgressEntry> {
        {
            let mut entries = self.write_entries();
            evict(&mut entries, self.retention);
        }
        let entries = match self.entries.read() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Progress store lock poisoned, recovering");
                poisoned.into_inner()
            }
        };
        entries.get(token).cloned()
    }

    fn write_entries(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, ProgressEntry>> {
        match self.entries.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Progress store lock poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// Drops completed entries past the retention window, then enforces the
/// size cap by dropping the oldest entries.
fn evict(entries: &mut HashMap<String, ProgressEntry>, retention: Duration) {
    let cutoff = Utc::now() - retention;
    entries.retain(|_, entry| match entry.completed_at {
        Some(completed) => completed > cutoff,
        None => true,
    });

    while entries.len() > MAX_ENTRIES {
        let oldest = entries
            .iter()
            .min_by_key(|(_, entry)| entry.started_at)
            .map(|(token, _)| token.clone());
        match oldest {
            Some(token) => {
                entries.remove(&token);
            }
            None => break,
        }
    }
}
