use serde::{Deserialize, Serialize};

/// Current schema version for new trajectories.
pub const SCHEMA_VERSION: u32 = 1;

/// Maximum length of a task title, in characters.
pub const MAX_TITLE_CHARS: usize = 500;

/// Title given to the chapter synthesized when an event arrives before any chapter.
pub const DEFAULT_CHAPTER_TITLE: &str = "Work";

/// Agent name used for the synthesized default chapter.
pub const DEFAULT_AGENT_NAME: &str = "default";

/// Trajectory ID format: `traj_<12 base-36 chars>`
pub type TrajectoryId = String;

// ── Status enums ──

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum TrajectoryStatus {
    Active,
    Completed,
    Abandoned,
}

impl TrajectoryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, TrajectoryStatus::Active)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            TrajectoryStatus::Active => "active",
            TrajectoryStatus::Completed => "completed",
            TrajectoryStatus::Abandoned => "abandoned",
        }
    }
}

impl std::fmt::Display for TrajectoryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for TrajectoryStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(TrajectoryStatus::Active),
            "completed" => Ok(TrajectoryStatus::Completed),
            "abandoned" => Ok(TrajectoryStatus::Abandoned),
            other => Err(format!("unknown status: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    Prompt,
    Thinking,
    ToolCall,
    ToolResult,
    MessageSent,
    MessageReceived,
    Decision,
    Finding,
    Note,
    Error,
}

impl EventType {
    pub fn as_str(self) -> &'static str {
        match self {
            EventType::Prompt => "prompt",
            EventType::Thinking => "thinking",
            EventType::ToolCall => "tool_call",
            EventType::ToolResult => "tool_result",
            EventType::MessageSent => "message_sent",
            EventType::MessageReceived => "message_received",
            EventType::Decision => "decision",
            EventType::Finding => "finding",
            EventType::Note => "note",
            EventType::Error => "error",
        }
    }
}

impl std::str::FromStr for EventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("unknown event type: {s}"))
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Significance {
    Low,
    Medium,
    High,
    Critical,
}

impl std::str::FromStr for Significance {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "low" => Ok(Significance::Low),
            "medium" => Ok(Significance::Medium),
            "high" => Ok(Significance::High),
            "critical" => Ok(Significance::Critical),
            other => Err(format!("unknown significance: {other}")),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AgentRole {
    Lead,
    Contributor,
    Reviewer,
}

// ── Aggregate ──

/// Link from a task to an issue tracker or other external system.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TaskSource {
    pub system: String,
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<TaskSource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AgentParticipant {
    pub name: String,
    pub role: AgentRole,
    pub joined_at: String,
}

/// A `raw` key that is present, `null` included, reads as `Some`.
fn present_value<'de, D>(d: D) -> Result<Option<serde_json::Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    serde_json::Value::deserialize(d).map(Some)
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryEvent {
    pub ts: String,
    #[serde(rename = "type")]
    pub event_type: EventType,
    pub content: String,
    #[serde(
        default,
        deserialize_with = "present_value",
        skip_serializing_if = "Option::is_none"
    )]
    pub raw: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub significance: Option<Significance>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub id: String,
    pub title: String,
    pub agent_name: String,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<String>,
    #[serde(default)]
    pub events: Vec<TrajectoryEvent>,
}

impl Chapter {
    pub fn is_open(&self) -> bool {
        self.ended_at.is_none()
    }
}

/// A rejected option. Older files store bare strings; both shapes
/// deserialize into this one struct.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(from = "AlternativeRepr")]
pub struct Alternative {
    pub option: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum AlternativeRepr {
    Plain(String),
    Detailed {
        option: String,
        #[serde(default)]
        reason: Option<String>,
    },
}

impl From<AlternativeRepr> for Alternative {
    fn from(repr: AlternativeRepr) -> Self {
        match repr {
            AlternativeRepr::Plain(option) => Alternative {
                option,
                reason: None,
            },
            AlternativeRepr::Detailed { option, reason } => Alternative { option, reason },
        }
    }
}

impl Alternative {
    /// A blank `reason` is dropped.
    pub fn new(option: impl Into<String>, reason: Option<String>) -> Self {
        Alternative {
            option: option.into(),
            reason: reason.filter(|r| !r.trim().is_empty()),
        }
    }
}

impl From<&str> for Alternative {
    fn from(option: &str) -> Self {
        Alternative {
            option: option.to_string(),
            reason: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Decision {
    pub question: String,
    pub chosen: String,
    #[serde(default)]
    pub alternatives: Vec<Alternative>,
    pub reasoning: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Retrospective {
    pub summary: String,
    pub approach: String,
    pub confidence: f64,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub decisions: Vec<Decision>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub challenges: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub learnings: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_spent: Option<String>,
}

/// Link from a trajectory to its generated trace record.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TraceRef {
    pub start_ref: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_ref: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Trajectory {
    pub id: TrajectoryId,
    pub version: u32,
    pub task: Task,
    pub status: TrajectoryStatus,
    pub started_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<String>,
    #[serde(default)]
    pub agents: Vec<AgentParticipant>,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retrospective: Option<Retrospective>,
    #[serde(default)]
    pub commits: Vec<String>,
    #[serde(default)]
    pub files_changed: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "_trace", default, skip_serializing_if = "Option::is_none")]
    pub trace: Option<TraceRef>,
}

impl Trajectory {
    pub fn current_chapter(&self) -> Option<&Chapter> {
        self.chapters.last()
    }

    pub fn events(&self) -> impl Iterator<Item = &TrajectoryEvent> {
        self.chapters.iter().flat_map(|c| c.events.iter())
    }

    /// Decision events across all chapters.
    pub fn decision_events(&self) -> impl Iterator<Item = &TrajectoryEvent> {
        self.events()
            .filter(|e| e.event_type == EventType::Decision)
    }

    pub fn decision_count(&self) -> usize {
        self.decision_events().count()
    }
}
