//! `index.json`: a denormalized cache of every stored trajectory's
//! headline fields. The trajectory files remain the source of truth; a
//! missing or unreadable index is treated as empty and rewritten on the
//! next save.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use traj_core::{now_rfc3339, Trajectory, TrajectoryError, TrajectoryStatus};

use crate::write_atomic;

pub const INDEX_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IndexEntry {
    pub title: String,
    pub status: TrajectoryStatus,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    /// Location of the trajectory JSON, relative to the store root.
    pub path: String,
}

impl IndexEntry {
    pub fn from_trajectory(t: &Trajectory, path: String) -> Self {
        Self {
            title: t.task.title.clone(),
            status: t.status,
            started_at: t.started_at.clone(),
            completed_at: t.completed_at.clone(),
            path,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StoreIndex {
    pub version: u32,
    pub last_updated: String,
    #[serde(default)]
    pub trajectories: BTreeMap<String, IndexEntry>,
}

impl Default for StoreIndex {
    fn default() -> Self {
        Self {
            version: INDEX_VERSION,
            last_updated: now_rfc3339(),
            trajectories: BTreeMap::new(),
        }
    }
}

impl StoreIndex {
    /// Read the index; `None` when the file is missing or unreadable.
    pub fn read(path: &Path) -> traj_core::Result<Option<Self>> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "index missing");
                return Ok(None);
            }
            Err(e) => return Err(TrajectoryError::storage(path, e)),
        };
        match serde_json::from_str(&content) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "index unreadable");
                Ok(None)
            }
        }
    }

    /// Like [`StoreIndex::read`], with a missing or corrupt file yielding an empty index.
    pub fn load(path: &Path) -> traj_core::Result<Self> {
        Ok(Self::read(path)?.unwrap_or_default())
    }

    /// Stamp `lastUpdated` and write atomically.
    pub fn save(&mut self, path: &Path) -> traj_core::Result<()> {
        self.last_updated = now_rfc3339();
        let data = serde_json::to_vec_pretty(self)
            .map_err(|e| TrajectoryError::storage(path, e.into()))?;
        write_atomic(path, &data).map_err(|e| TrajectoryError::storage(path, e))
    }

    pub fn upsert(&mut self, id: &str, entry: IndexEntry) {
        self.trajectories.insert(id.to_string(), entry);
    }

    pub fn remove(&mut self, id: &str) -> Option<IndexEntry> {
        self.trajectories.remove(id)
    }

    pub fn get(&self, id: &str) -> Option<&IndexEntry> {
        self.trajectories.get(id)
    }

    pub fn len(&self) -> usize {
        self.trajectories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.trajectories.is_empty()
    }
}
