use anyhow::Context;
use traj_core::trajectory::{add_chapter, add_decision, add_event, AddChapterInput, AddEventInput};
use traj_core::{Alternative, Decision, EventType, Significance};
use traj_store::FileStorage;

use crate::require_active;

pub fn chapter(store: &FileStorage, title: &str, agent: &str) -> anyhow::Result<()> {
    let t = require_active(store)?;
    let t = add_chapter(&t, AddChapterInput::new(title, agent))?;
    store.save(&t)?;
    println!("Chapter {} \"{title}\" ({agent})", t.chapters.len());
    Ok(())
}

pub fn event(
    store: &FileStorage,
    content: &str,
    event_type: &str,
    significance: Option<&str>,
    tags: Vec<String>,
) -> anyhow::Result<()> {
    let event_type: EventType = event_type.parse().map_err(anyhow::Error::msg)?;
    let significance = significance
        .map(|s| s.parse::<Significance>())
        .transpose()
        .map_err(anyhow::Error::msg)?;

    let t = require_active(store)?;
    let mut input = AddEventInput::new(event_type, content);
    input.significance = significance;
    input.tags = tags;
    let t = add_event(&t, input)?;
    store.save(&t)?;
    println!("Recorded {} on {}", event_type.as_str(), t.id);
    Ok(())
}

pub struct DecideParams {
    pub question: String,
    pub chosen: String,
    pub reasoning: String,
    pub alternatives: Vec<String>,
    pub confidence: Option<f64>,
}

/// `option` or `option:reason`.
fn parse_alternative(arg: &str) -> Alternative {
    match arg.split_once(':') {
        Some((option, reason)) => Alternative::new(option.trim(), Some(reason.trim().to_string())),
        None => Alternative::from(arg.trim()),
    }
}

pub fn decide(store: &FileStorage, params: DecideParams) -> anyhow::Result<()> {
    let t = require_active(store)?;
    let decision = Decision {
        question: params.question,
        chosen: params.chosen,
        alternatives: params.alternatives.iter().map(|a| parse_alternative(a)).collect(),
        reasoning: params.reasoning,
        confidence: params.confidence,
    };
    let t = add_decision(&t, decision).context("invalid decision")?;
    store.save(&t)?;
    println!("Decision recorded ({} total)", t.decision_count());
    Ok(())
}
