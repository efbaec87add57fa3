//! Text renderings of a trajectory. `markdown` is the default renderer for
//! the `.md` sidecar written next to terminal trajectories.

use traj_core::{Decision, EventType, Significance, Trajectory, TrajectoryEvent};

fn or_dash(s: Option<&str>) -> &str {
    s.filter(|v| !v.is_empty()).unwrap_or("-")
}

fn decision_of(event: &TrajectoryEvent) -> Option<Decision> {
    event
        .raw
        .as_ref()
        .and_then(|raw| serde_json::from_value(raw.clone()).ok())
}

fn push_list(out: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    out.push_str(&format!("## {heading}\n\n"));
    for item in items {
        out.push_str(&format!("- {item}\n"));
    }
    out.push('\n');
}

/// Render a trajectory as a markdown summary.
pub fn markdown(t: &Trajectory) -> String {
    let mut out = String::new();
    out.push_str(&format!("# {}\n\n", t.task.title));

    out.push_str(&format!("- **ID:** {}\n", t.id));
    out.push_str(&format!("- **Status:** {}\n", t.status));
    out.push_str(&format!("- **Started:** {}\n", t.started_at));
    out.push_str(&format!(
        "- **Completed:** {}\n",
        or_dash(t.completed_at.as_deref())
    ));
    if let Some(source) = &t.task.source {
        match &source.url {
            Some(url) => out.push_str(&format!(
                "- **Source:** [{} {}]({url})\n",
                source.system, source.id
            )),
            None => out.push_str(&format!("- **Source:** {} {}\n", source.system, source.id)),
        }
    }
    if !t.agents.is_empty() {
        let names: Vec<&str> = t.agents.iter().map(|a| a.name.as_str()).collect();
        out.push_str(&format!("- **Agents:** {}\n", names.join(", ")));
    }
    if !t.tags.is_empty() {
        out.push_str(&format!("- **Tags:** {}\n", t.tags.join(", ")));
    }
    out.push('\n');

    if let Some(desc) = &t.task.description {
        out.push_str(&format!("{desc}\n\n"));
    }

    if let Some(r) = &t.retrospective {
        out.push_str("## Summary\n\n");
        out.push_str(&format!("{}\n\n", r.summary));
        out.push_str(&format!("**Approach:** {}\n\n", r.approach));
        out.push_str(&format!(
            "**Confidence:** {:.0}%\n\n",
            r.confidence * 100.0
        ));
        if let Some(spent) = &r.time_spent {
            out.push_str(&format!("**Time spent:** {spent}\n\n"));
        }
    }

    let decisions: Vec<Decision> = t.decision_events().filter_map(decision_of).collect();
    if !decisions.is_empty() {
        out.push_str("## Key Decisions\n\n");
        for d in &decisions {
            out.push_str(&format!("### {}\n\n", d.question));
            out.push_str(&format!("- **Chosen:** {}\n", d.chosen));
            out.push_str(&format!("- **Reasoning:** {}\n", d.reasoning));
            for alt in &d.alternatives {
                match &alt.reason {
                    Some(reason) => {
                        out.push_str(&format!("- **Rejected:** {} ({reason})\n", alt.option))
                    }
                    None => out.push_str(&format!("- **Rejected:** {}\n", alt.option)),
                }
            }
            out.push('\n');
        }
    }

    if !t.chapters.is_empty() {
        out.push_str("## Chapters\n\n");
        for (i, ch) in t.chapters.iter().enumerate() {
            out.push_str(&format!(
                "### {}. {} ({})\n\n",
                i + 1,
                ch.title,
                ch.agent_name
            ));
            let notable: Vec<&TrajectoryEvent> = ch
                .events
                .iter()
                .filter(|e| {
                    e.event_type != EventType::Decision
                        && e.significance.is_some_and(|s| s >= Significance::Medium)
                })
                .collect();
            if notable.is_empty() {
                out.push_str(&format!("{} events\n\n", ch.events.len()));
            } else {
                for e in notable {
                    out.push_str(&format!("- [{}] {}\n", e.event_type.as_str(), e.content));
                }
                out.push('\n');
            }
        }
    }

    if let Some(r) = &t.retrospective {
        push_list(&mut out, "Challenges", &r.challenges);
        push_list(&mut out, "Learnings", &r.learnings);
        push_list(&mut out, "Suggestions", &r.suggestions);
    }
    push_list(&mut out, "Files Changed", &t.files_changed);
    push_list(&mut out, "Commits", &t.commits);

    if let Some(trace) = &t.trace {
        out.push_str("## Trace\n\n");
        out.push_str(&format!(
            "- {} → {}\n",
            trace.start_ref,
            or_dash(trace.end_ref.as_deref())
        ));
        if let Some(id) = &trace.trace_id {
            out.push_str(&format!("- {id}\n"));
        }
        out.push('\n');
    }

    out
}

/// One line per chapter and event, in recorded order.
pub fn timeline(t: &Trajectory) -> String {
    let mut out = format!("{} [{}] {}\n", t.started_at, t.status, t.task.title);
    for ch in &t.chapters {
        out.push_str(&format!(
            "{}  ── {} ({})\n",
            ch.started_at, ch.title, ch.agent_name
        ));
        for e in &ch.events {
            let marker = match e.significance {
                Some(Significance::Critical) => "!!",
                Some(Significance::High) => "! ",
                _ => "  ",
            };
            out.push_str(&format!(
                "{}  {marker}{:<16} {}\n",
                e.ts,
                e.event_type.as_str(),
                e.content
            ));
        }
    }
    if let Some(done) = &t.completed_at {
        out.push_str(&format!("{done}  ── {}\n", t.status));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use traj_core::trajectory::*;
    use traj_core::Alternative;

    fn finished() -> Trajectory {
        let t = create(CreateInput::new("Implement authentication")).unwrap();
        let t = add_chapter(&t, AddChapterInput::new("Research", "claude")).unwrap();
        let t = add_decision(
            &t,
            Decision {
                question: "Token format".into(),
                chosen: "JWT".into(),
                alternatives: vec![Alternative::from("sessions")],
                reasoning: "stateless".into(),
                confidence: None,
            },
        )
        .unwrap();
        let mut finding = AddEventInput::new(EventType::Finding, "login has no rate limit");
        finding.significance = Some(Significance::High);
        let t = add_event(&t, finding).unwrap();
        let mut input = CompleteInput::new("Added JWT auth", "incremental", 0.85);
        input.learnings = vec!["check rate limits early".into()];
        complete(&t, input).unwrap()
    }

    #[test]
    fn markdown_includes_retrospective_and_decisions() {
        let md = markdown(&finished());
        assert!(md.starts_with("# Implement authentication"));
        assert!(md.contains("**Confidence:** 85%"));
        assert!(md.contains("### Token format"));
        assert!(md.contains("**Rejected:** sessions"));
        assert!(md.contains("[finding] login has no rate limit"));
        assert!(md.contains("## Learnings"));
    }

    #[test]
    fn timeline_lists_every_event() {
        let t = finished();
        let text = timeline(&t);
        assert!(text.contains("── Research (claude)"));
        assert!(text.contains("Token format: JWT"));
        assert!(text.lines().last().unwrap().contains("completed"));
    }
}
