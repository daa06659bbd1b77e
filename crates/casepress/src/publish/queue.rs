//! Publishing queue planning.
//!
//! Pure computation over a snapshot of eligible artifacts: orders the
//! backlog and estimates how long it takes to drain at a given rate.
//! Nothing here mutates state, so a plan can be recomputed freely.

use serde::Serialize;

use crate::artifact::Artifact;
use crate::db::{artifact_repo, Database, DatabaseError};

/// Queue view of an eligible artifact.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuedArtifact {
    pub id: String,
    pub title: String,
    pub word_count: u32,
    pub overall_score: u32,
    pub focus_keyword: String,
}

impl From<&Artifact> for QueuedArtifact {
    fn from(artifact: &Artifact) -> Self {
        Self {
            id: artifact.id.clone(),
            title: artifact.title.clone(),
            word_count: artifact.word_count,
            overall_score: artifact.quality.overall_score,
            focus_keyword: artifact.focus_keyword.clone(),
        }
    }
}

/// A drain plan for the publishing backlog.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct QueuePlan {
    pub target_id: String,
    pub total_eligible: usize,
    pub per_day: u32,
    /// Days to drain the backlog, rounded up so a partial final day
    /// counts as a full one. Zero when `per_day` is zero.
    pub estimated_days: u32,
    /// The first day's worth of artifacts, best first.
    pub first_slice: Vec<QueuedArtifact>,
}

/// Plans the queue from an already-fetched snapshot.
///
/// `eligible` is expected in publish order (highest score first, newest
/// first within a score); the ordering is re-applied here so callers
/// can pass unordered snapshots too.
pub fn plan(target_id: &str, eligible: &[Artifact], per_day: u32) -> QueuePlan {
    let mut ordered: Vec<&Artifact> = eligible.iter().collect();
    ordered.sort_by(|a, b| {
        b.quality
            .overall_score
            .cmp(&a.quality.overall_score)
            .then(b.created_at.cmp(&a.created_at))
    });

    let total_eligible = ordered.len();
    let estimated_days = if per_day == 0 {
        0
    } else {
        (total_eligible as u32).div_ceil(per_day)
    };

    let first_slice = ordered
        .iter()
        .take(per_day as usize)
        .map(|a| QueuedArtifact::from(*a))
        .collect();

    QueuePlan {
        target_id: target_id.to_string(),
        total_eligible,
        per_day,
        estimated_days,
        first_slice,
    }
}

/// Plans the queue from the store: snapshots the eligible artifacts for
/// the given score threshold, then computes the plan.
pub fn plan_from_store(
    db: &Database,
    target_id: &str,
    min_score: u32,
    per_day: u32,
) -> Result<QueuePlan, DatabaseError> {
    let eligible = artifact_repo::list_ready(db, min_score)?;
    Ok(plan(target_id, &eligible, per_day))
}
