//! Structural and semantic rules for trajectories and their inputs.
//!
//! Every check returns a [`ValidationReport`] listing all violations rather
//! than stopping at the first, so storage reads can log-and-skip and model
//! operations can fail hard with the same data.

use std::fmt;

use crate::id::{has_id_shape, is_trajectory_id, CHAPTER_PREFIX};
use crate::trajectory::{CompleteInput, CreateInput};
use crate::types::{
    Decision, Retrospective, TaskSource, Trajectory, TrajectoryStatus, MAX_TITLE_CHARS,
};

/// One failed rule, located by a JSON-ish path (`task.title`, `chapters[2].endedAt`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationReport {
    pub violations: Vec<Violation>,
}

impl ValidationReport {
    pub fn single(path: &str, message: impl Into<String>) -> Self {
        ValidationReport {
            violations: vec![Violation {
                path: path.to_string(),
                message: message.into(),
            }],
        }
    }

    pub fn is_empty(&self) -> bool {
        self.violations.is_empty()
    }

    pub fn has_path(&self, path: &str) -> bool {
        self.violations.iter().any(|v| v.path == path)
    }

    fn check(&mut self, ok: bool, path: impl Into<String>, message: impl Into<String>) {
        if !ok {
            self.violations.push(Violation {
                path: path.into(),
                message: message.into(),
            });
        }
    }

    fn into_result(self) -> Result<(), ValidationReport> {
        if self.violations.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .violations
            .iter()
            .map(|v| format!("{}: {}", v.path, v.message))
            .collect();
        f.write_str(&parts.join("; "))
    }
}

fn is_blank(s: &str) -> bool {
    s.trim().is_empty()
}

fn check_title(report: &mut ValidationReport, path: &str, title: &str) {
    report.check(!is_blank(title), path, "must not be empty");
    report.check(
        title.chars().count() <= MAX_TITLE_CHARS,
        path,
        format!("must be at most {MAX_TITLE_CHARS} characters"),
    );
}

fn check_source(report: &mut ValidationReport, path: &str, source: &TaskSource) {
    report.check(
        !is_blank(&source.system),
        format!("{path}.system"),
        "must not be empty",
    );
    report.check(!is_blank(&source.id), format!("{path}.id"), "must not be empty");
}

fn check_confidence(report: &mut ValidationReport, path: &str, confidence: f64) {
    report.check(
        (0.0..=1.0).contains(&confidence),
        path,
        "must be between 0 and 1",
    );
}

fn check_retrospective(report: &mut ValidationReport, r: &Retrospective) {
    report.check(
        !is_blank(&r.summary),
        "retrospective.summary",
        "must not be empty",
    );
    report.check(
        !is_blank(&r.approach),
        "retrospective.approach",
        "must not be empty",
    );
    check_confidence(report, "retrospective.confidence", r.confidence);
}

// ── Input gates ──

pub fn validate_create(input: &CreateInput) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    check_title(&mut report, "title", &input.title);
    if let Some(source) = &input.source {
        check_source(&mut report, "source", source);
    }
    report.into_result()
}

pub fn validate_complete(input: &CompleteInput) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    report.check(!is_blank(&input.summary), "summary", "must not be empty");
    report.check(!is_blank(&input.approach), "approach", "must not be empty");
    check_confidence(&mut report, "confidence", input.confidence);
    report.into_result()
}

pub fn validate_decision(input: &Decision) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();
    report.check(!is_blank(&input.question), "question", "must not be empty");
    report.check(!is_blank(&input.chosen), "chosen", "must not be empty");
    report.check(!is_blank(&input.reasoning), "reasoning", "must not be empty");
    for (i, alt) in input.alternatives.iter().enumerate() {
        report.check(
            !is_blank(&alt.option),
            format!("alternatives[{i}].option"),
            "must not be empty",
        );
    }
    if let Some(c) = input.confidence {
        check_confidence(&mut report, "confidence", c);
    }
    report.into_result()
}

// ── Whole-trajectory gate ──

/// Check every structural rule a persisted trajectory must satisfy.
pub fn validate_trajectory(t: &Trajectory) -> Result<(), ValidationReport> {
    let mut report = ValidationReport::default();

    report.check(
        is_trajectory_id(&t.id),
        "id",
        "must match traj_[a-z0-9]{12}",
    );
    report.check(t.version >= 1, "version", "must be at least 1");
    check_title(&mut report, "task.title", &t.task.title);
    if let Some(source) = &t.task.source {
        check_source(&mut report, "task.source", source);
    }
    report.check(!is_blank(&t.started_at), "startedAt", "must not be empty");

    match t.status {
        TrajectoryStatus::Active => {
            report.check(
                t.completed_at.is_none(),
                "completedAt",
                "must be absent while active",
            );
            report.check(
                t.retrospective.is_none(),
                "retrospective",
                "must be absent while active",
            );
        }
        TrajectoryStatus::Completed => {
            report.check(
                t.completed_at.is_some(),
                "completedAt",
                "required once completed",
            );
            report.check(
                t.retrospective.is_some(),
                "retrospective",
                "required once completed",
            );
        }
        TrajectoryStatus::Abandoned => {
            report.check(
                t.completed_at.is_some(),
                "completedAt",
                "required once abandoned",
            );
            report.check(
                t.retrospective.is_none(),
                "retrospective",
                "only allowed on completed trajectories",
            );
        }
    }
    if let Some(r) = &t.retrospective {
        check_retrospective(&mut report, r);
    }

    let last = t.chapters.len().saturating_sub(1);
    for (i, chapter) in t.chapters.iter().enumerate() {
        report.check(
            has_id_shape(&chapter.id, CHAPTER_PREFIX),
            format!("chapters[{i}].id"),
            "must match chap_[a-z0-9]+",
        );
        report.check(
            !is_blank(&chapter.title),
            format!("chapters[{i}].title"),
            "must not be empty",
        );
        let may_be_open = i == last && !t.status.is_terminal();
        report.check(
            may_be_open || chapter.ended_at.is_some(),
            format!("chapters[{i}].endedAt"),
            "only the last chapter of an active trajectory may be open",
        );
        for (j, event) in chapter.events.iter().enumerate() {
            report.check(
                !is_blank(&event.content),
                format!("chapters[{i}].events[{j}].content"),
                "must not be empty",
            );
        }
    }

    report.into_result()
}

/// Decode JSON and run [`validate_trajectory`]; the only path from bytes to a `Trajectory`.
pub fn parse_trajectory(json: &str) -> Result<Trajectory, ValidationReport> {
    let t: Trajectory =
        serde_json::from_str(json).map_err(|e| ValidationReport::single("$", e.to_string()))?;
    validate_trajectory(&t)?;
    Ok(t)
}
