use serde::Serialize;
use traj_core::{parse_timestamp, Trajectory, TrajectoryStatus};

use crate::index::IndexEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortField {
    #[default]
    StartedAt,
    CompletedAt,
    Title,
}

impl std::str::FromStr for SortField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "startedAt" | "started_at" | "started" => Ok(SortField::StartedAt),
            "completedAt" | "completed_at" | "completed" => Ok(SortField::CompletedAt),
            "title" => Ok(SortField::Title),
            other => Err(format!("unknown sort field: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    Asc,
    #[default]
    Desc,
}

/// Filters and paging for [`crate::FileStorage::list`].
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    pub status: Option<TrajectoryStatus>,
    /// Inclusive lower bound on `startedAt` (RFC 3339).
    pub since: Option<String>,
    /// Exclusive upper bound on `startedAt` (RFC 3339).
    pub until: Option<String>,
    pub sort_by: SortField,
    pub direction: SortDirection,
    pub offset: usize,
    pub limit: Option<usize>,
}

/// Listing row: index fields plus counts derived from the full trajectory.
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrajectorySummary {
    pub id: String,
    pub title: String,
    pub status: TrajectoryStatus,
    pub started_at: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    pub chapter_count: usize,
    pub decision_count: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

impl TrajectorySummary {
    pub fn from_trajectory(t: &Trajectory) -> Self {
        Self {
            id: t.id.clone(),
            title: t.task.title.clone(),
            status: t.status,
            started_at: t.started_at.clone(),
            completed_at: t.completed_at.clone(),
            chapter_count: t.chapters.len(),
            decision_count: t.decision_count(),
            confidence: t.retrospective.as_ref().map(|r| r.confidence),
        }
    }
}

/// Order two timestamps, preferring parsed instants and falling back to string order.
pub(crate) fn cmp_timestamps(a: &str, b: &str) -> std::cmp::Ordering {
    match (parse_timestamp(a), parse_timestamp(b)) {
        (Some(x), Some(y)) => x.cmp(&y),
        _ => a.cmp(b),
    }
}

pub(crate) fn matches(entry: &IndexEntry, query: &ListQuery) -> bool {
    if let Some(status) = query.status {
        if entry.status != status {
            return false;
        }
    }
    if let Some(since) = &query.since {
        if cmp_timestamps(&entry.started_at, since).is_lt() {
            return false;
        }
    }
    if let Some(until) = &query.until {
        if cmp_timestamps(&entry.started_at, until).is_ge() {
            return false;
        }
    }
    true
}

pub(crate) fn sort_entries(entries: &mut [(&String, &IndexEntry)], query: &ListQuery) {
    entries.sort_by(|(a_id, a), (b_id, b)| {
        let ord = match query.sort_by {
            SortField::StartedAt => cmp_timestamps(&a.started_at, &b.started_at),
            SortField::CompletedAt => match (&a.completed_at, &b.completed_at) {
                (Some(x), Some(y)) => cmp_timestamps(x, y),
                (Some(_), None) => std::cmp::Ordering::Greater,
                (None, Some(_)) => std::cmp::Ordering::Less,
                (None, None) => std::cmp::Ordering::Equal,
            },
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
        }
        .then_with(|| a_id.cmp(b_id));
        match query.direction {
            SortDirection::Asc => ord,
            SortDirection::Desc => ord.reverse(),
        }
    });
}
