//! Pure state transitions over [`Trajectory`] values.
//!
//! Every function takes the current value by reference and returns a new
//! one; the input is never mutated. Terminal states (`completed`,
//! `abandoned`) reject every transition except collaborator bookkeeping
//! (`record_commits`, `record_files_changed`, `attach_trace`).

use crate::error::{Result, TrajectoryError};
use crate::id::{new_chapter_id, new_trajectory_id};
use crate::now_rfc3339;
use crate::schema::{self, ValidationReport};
use crate::trace::TraceRecord;
use crate::types::{
    AgentParticipant, AgentRole, Chapter, Decision, EventType, Retrospective, Significance,
    Task, TaskSource, TraceRef, Trajectory, TrajectoryEvent, TrajectoryStatus,
    DEFAULT_AGENT_NAME, DEFAULT_CHAPTER_TITLE, SCHEMA_VERSION,
};

// ── Inputs ──

#[derive(Debug, Clone, Default)]
pub struct CreateInput {
    pub title: String,
    pub description: Option<String>,
    pub source: Option<TaskSource>,
    pub project_id: Option<String>,
    pub tags: Vec<String>,
    /// Agent that starts the work; registered with the `lead` role.
    pub agent: Option<String>,
}

impl CreateInput {
    pub fn new(title: impl Into<String>) -> Self {
        CreateInput {
            title: title.into(),
            ..Default::default()
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddChapterInput {
    pub title: String,
    pub agent_name: String,
}

impl AddChapterInput {
    pub fn new(title: impl Into<String>, agent_name: impl Into<String>) -> Self {
        AddChapterInput {
            title: title.into(),
            agent_name: agent_name.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AddEventInput {
    pub event_type: EventType,
    pub content: String,
    pub raw: Option<serde_json::Value>,
    pub significance: Option<Significance>,
    pub tags: Vec<String>,
}

impl AddEventInput {
    pub fn new(event_type: EventType, content: impl Into<String>) -> Self {
        AddEventInput {
            event_type,
            content: content.into(),
            raw: None,
            significance: None,
            tags: Vec::new(),
        }
    }

    pub fn note(content: impl Into<String>) -> Self {
        Self::new(EventType::Note, content)
    }
}

#[derive(Debug, Clone, Default)]
pub struct CompleteInput {
    pub summary: String,
    pub approach: String,
    pub confidence: f64,
    pub decisions: Vec<Decision>,
    pub challenges: Vec<String>,
    pub learnings: Vec<String>,
    pub suggestions: Vec<String>,
    pub time_spent: Option<String>,
}

impl CompleteInput {
    pub fn new(summary: impl Into<String>, approach: impl Into<String>, confidence: f64) -> Self {
        CompleteInput {
            summary: summary.into(),
            approach: approach.into(),
            confidence,
            ..Default::default()
        }
    }
}

// ── Helpers ──

fn ensure_active(t: &Trajectory) -> Result<()> {
    if t.status.is_terminal() {
        return Err(TrajectoryError::AlreadyCompleted {
            id: t.id.clone(),
            status: t.status,
        });
    }
    Ok(())
}

/// Set `endedAt` on the open chapter, if any.
fn close_open_chapter(chapters: &mut [Chapter], now: &str) {
    if let Some(last) = chapters.last_mut() {
        if last.ended_at.is_none() {
            last.ended_at = Some(now.to_string());
        }
    }
}

fn register_agent(agents: &mut Vec<AgentParticipant>, name: &str, role: AgentRole, now: &str) {
    if agents.iter().any(|a| a.name == name) {
        return;
    }
    agents.push(AgentParticipant {
        name: name.to_string(),
        role,
        joined_at: now.to_string(),
    });
}

fn push_unique(list: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !item.is_empty() && !list.contains(item) {
            list.push(item.clone());
        }
    }
}

fn open_chapter(t: &mut Trajectory, title: &str, agent_name: &str, now: &str) {
    close_open_chapter(&mut t.chapters, now);
    register_agent(&mut t.agents, agent_name, AgentRole::Contributor, now);
    t.chapters.push(Chapter {
        id: new_chapter_id(),
        title: title.to_string(),
        agent_name: agent_name.to_string(),
        started_at: now.to_string(),
        ended_at: None,
        events: Vec::new(),
    });
}

fn append_event(t: &mut Trajectory, input: AddEventInput, now: &str) {
    if t.chapters.is_empty() {
        open_chapter(t, DEFAULT_CHAPTER_TITLE, DEFAULT_AGENT_NAME, now);
    }
    if let Some(chapter) = t.chapters.last_mut() {
        chapter.events.push(TrajectoryEvent {
            ts: now.to_string(),
            event_type: input.event_type,
            content: input.content,
            raw: input.raw.filter(|v| !v.is_null()),
            significance: input.significance,
            tags: input.tags,
        });
    }
}

// ── Transitions ──

/// Start a new trajectory in the `active` state.
pub fn create(input: CreateInput) -> Result<Trajectory> {
    schema::validate_create(&input)?;
    let now = now_rfc3339();

    let mut agents = Vec::new();
    if let Some(agent) = input.agent.as_deref().filter(|a| !a.trim().is_empty()) {
        register_agent(&mut agents, agent, AgentRole::Lead, &now);
    }

    Ok(Trajectory {
        id: new_trajectory_id(),
        version: SCHEMA_VERSION,
        task: Task {
            title: input.title,
            description: input.description.filter(|d| !d.is_empty()),
            source: input.source,
        },
        status: TrajectoryStatus::Active,
        started_at: now,
        completed_at: None,
        agents,
        chapters: Vec::new(),
        retrospective: None,
        commits: Vec::new(),
        files_changed: Vec::new(),
        project_id: input.project_id,
        tags: input.tags,
        trace: None,
    })
}

/// Close the open chapter and open a new one.
pub fn add_chapter(t: &Trajectory, input: AddChapterInput) -> Result<Trajectory> {
    ensure_active(t)?;
    if input.title.trim().is_empty() {
        return Err(ValidationReport::single("title", "must not be empty").into());
    }
    if input.agent_name.trim().is_empty() {
        return Err(ValidationReport::single("agentName", "must not be empty").into());
    }
    let now = now_rfc3339();
    let mut next = t.clone();
    open_chapter(&mut next, &input.title, &input.agent_name, &now);
    Ok(next)
}

/// Append an event to the current chapter, synthesizing a "Work" chapter if none exists.
pub fn add_event(t: &Trajectory, input: AddEventInput) -> Result<Trajectory> {
    ensure_active(t)?;
    if input.content.trim().is_empty() {
        return Err(ValidationReport::single("content", "must not be empty").into());
    }
    let now = now_rfc3339();
    let mut next = t.clone();
    append_event(&mut next, input, &now);
    Ok(next)
}

/// Record a decision as a high-significance `decision` event.
pub fn add_decision(t: &Trajectory, decision: Decision) -> Result<Trajectory> {
    schema::validate_decision(&decision)?;
    let raw = serde_json::to_value(&decision)
        .map_err(|e| ValidationReport::single("decision", e.to_string()))?;
    add_event(
        t,
        AddEventInput {
            event_type: EventType::Decision,
            content: format!("{}: {}", decision.question, decision.chosen),
            raw: Some(raw),
            significance: Some(Significance::High),
            tags: Vec::new(),
        },
    )
}

/// Move an active trajectory to `completed` and attach its retrospective.
pub fn complete(t: &Trajectory, input: CompleteInput) -> Result<Trajectory> {
    ensure_active(t)?;
    schema::validate_complete(&input)?;
    let now = now_rfc3339();
    let mut next = t.clone();
    close_open_chapter(&mut next.chapters, &now);
    next.status = TrajectoryStatus::Completed;
    next.completed_at = Some(now);
    next.retrospective = Some(Retrospective {
        summary: input.summary,
        approach: input.approach,
        confidence: input.confidence,
        decisions: input.decisions,
        challenges: input.challenges,
        learnings: input.learnings,
        suggestions: input.suggestions,
        time_spent: input.time_spent,
    });
    Ok(next)
}

/// Move an active trajectory to `abandoned`, noting the reason in the last chapter.
pub fn abandon(t: &Trajectory, reason: Option<&str>) -> Result<Trajectory> {
    ensure_active(t)?;
    let now = now_rfc3339();
    let mut next = t.clone();
    close_open_chapter(&mut next.chapters, &now);
    if let Some(reason) = reason.filter(|r| !r.trim().is_empty()) {
        if let Some(chapter) = next.chapters.last_mut() {
            chapter.events.push(TrajectoryEvent {
                ts: now.clone(),
                event_type: EventType::Note,
                content: format!("Abandoned: {reason}"),
                raw: None,
                significance: Some(Significance::High),
                tags: Vec::new(),
            });
        }
    }
    next.status = TrajectoryStatus::Abandoned;
    next.completed_at = Some(now);
    Ok(next)
}

// ── Collaborator bookkeeping ──

pub fn record_commits(t: &Trajectory, shas: &[String]) -> Trajectory {
    let mut next = t.clone();
    push_unique(&mut next.commits, shas);
    next
}

pub fn record_files_changed(t: &Trajectory, paths: &[String]) -> Trajectory {
    let mut next = t.clone();
    push_unique(&mut next.files_changed, paths);
    next
}

/// Remember the VCS reference the session started from.
pub fn begin_trace(t: &Trajectory, start_ref: &str) -> Result<Trajectory> {
    ensure_active(t)?;
    let mut next = t.clone();
    next.trace = Some(TraceRef {
        start_ref: start_ref.to_string(),
        end_ref: None,
        trace_id: None,
    });
    Ok(next)
}

/// Link a generated trace record. Keeps an existing `startRef` when present.
pub fn attach_trace(
    t: &Trajectory,
    record: &TraceRecord,
    start_ref: &str,
    end_ref: &str,
) -> Trajectory {
    let mut next = t.clone();
    let start_ref = next
        .trace
        .as_ref()
        .map(|r| r.start_ref.clone())
        .unwrap_or_else(|| start_ref.to_string());
    next.trace = Some(TraceRef {
        start_ref,
        end_ref: Some(end_ref.to_string()),
        trace_id: Some(record.id.clone()),
    });
    next
}
