//! Contributor model resolution.

/// Checked in order; the first non-empty value wins.
pub const MODEL_ENV_VARS: &[&str] = &[
    "TRAJECTORIES_MODEL",
    "CLAUDE_MODEL",
    "ANTHROPIC_MODEL",
    "OPENAI_MODEL",
];

pub const UNKNOWN_MODEL: &str = "unknown";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TraceConfig {
    pub model: Option<String>,
}

impl TraceConfig {
    pub fn with_model(model: impl Into<String>) -> Self {
        TraceConfig {
            model: Some(model.into()),
        }
    }

    /// Resolve against an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let model = MODEL_ENV_VARS
            .iter()
            .filter_map(|name| lookup(name))
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
        TraceConfig { model }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn model_label(&self) -> &str {
        self.model.as_deref().unwrap_or(UNKNOWN_MODEL)
    }
}
