//! Builds [`TraceRecord`]s from VCS diffs.
//!
//! Every failure mode here degrades to `None` or an empty list. A missing
//! repository or an unreadable diff suppresses the trace and never the
//! trajectory itself.

use traj_core::id::new_trace_id;
use traj_core::{
    now_rfc3339, Contributor, TraceConversation, TraceFile, TraceRange, TraceRecord, Trajectory,
};

use crate::config::TraceConfig;
use crate::diff::{parse_unified_diff, FileRanges};
use crate::vcs::Vcs;

pub const AI_CONTRIBUTOR: &str = "ai";

pub struct TraceGenerator<V: Vcs> {
    vcs: V,
    config: TraceConfig,
}

impl<V: Vcs> TraceGenerator<V> {
    pub fn new(vcs: V, config: TraceConfig) -> Self {
        TraceGenerator { vcs, config }
    }

    pub fn vcs(&self) -> &V {
        &self.vcs
    }

    /// Current head, or `None` outside a repository.
    pub fn capture_reference(&self) -> Option<String> {
        if !self.vcs.is_repository() {
            return None;
        }
        self.vcs.head_ref()
    }

    pub fn diff_references(&self, start_ref: &str, end_ref: &str) -> Vec<FileRanges> {
        match self.vcs.diff(start_ref, end_ref) {
            Some(text) => parse_unified_diff(&text),
            None => Vec::new(),
        }
    }

    pub fn changed_files(&self, start_ref: &str, end_ref: &str) -> Vec<String> {
        if !self.vcs.is_repository() {
            return Vec::new();
        }
        self.vcs.changed_files(start_ref, end_ref)
    }

    pub fn detect_contributor_model(&self) -> String {
        self.config.model_label().to_string()
    }

    /// Diff `start_ref` against the current head and attribute the new lines.
    pub fn generate_trace(&self, trajectory: &Trajectory, start_ref: &str) -> Option<TraceRecord> {
        let end_ref = self.capture_reference()?;
        self.trace_between(trajectory, start_ref, &end_ref)
    }

    /// Like [`generate_trace`](Self::generate_trace) with a caller-resolved end reference.
    pub fn trace_between(
        &self,
        trajectory: &Trajectory,
        start_ref: &str,
        end_ref: &str,
    ) -> Option<TraceRecord> {
        if !self.vcs.is_repository() {
            tracing::debug!("not inside a repository, skipping trace");
            return None;
        }

        let contributor = Contributor {
            kind: AI_CONTRIBUTOR.to_string(),
            model: Some(self.detect_contributor_model()),
        };
        let files: Vec<TraceFile> = self
            .diff_references(start_ref, end_ref)
            .into_iter()
            .filter(|f| !f.ranges.is_empty())
            .map(|f| TraceFile {
                path: f.path,
                conversations: vec![TraceConversation {
                    contributor: contributor.clone(),
                    ranges: f
                        .ranges
                        .into_iter()
                        .map(|r| TraceRange {
                            start_line: r.start_line,
                            end_line: r.end_line,
                            revision: Some(end_ref.to_string()),
                            content_hash: r.content_hash,
                        })
                        .collect(),
                }],
            })
            .collect();

        if files.is_empty() {
            tracing::debug!(start_ref, end_ref, "no attributable changes");
            return None;
        }

        Some(TraceRecord {
            id: new_trace_id(),
            timestamp: now_rfc3339(),
            trajectory: trajectory.id.clone(),
            files,
        })
    }
}
