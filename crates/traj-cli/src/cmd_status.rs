use std::fmt::Write as _;

use traj_store::FileStorage;

pub fn execute(store: &FileStorage) -> anyhow::Result<()> {
    print!("{}", describe(store)?);
    Ok(())
}

/// Status text for the active trajectory.
pub(crate) fn describe(store: &FileStorage) -> anyhow::Result<String> {
    let Some(t) = store.get_active()? else {
        return Ok("No active trajectory\n".to_string());
    };

    let mut out = String::new();
    writeln!(out, "Active: {} \"{}\"", t.id, t.task.title)?;
    writeln!(out, "Started: {}", t.started_at)?;
    match t.current_chapter() {
        Some(ch) => writeln!(
            out,
            "Chapter {}: {} ({}, {} events)",
            t.chapters.len(),
            ch.title,
            ch.agent_name,
            ch.events.len()
        )?,
        None => writeln!(out, "Chapter: (none)")?,
    }
    writeln!(out, "Events: {}", t.events().count())?;
    writeln!(out, "Decisions: {}", t.decision_count())?;
    if let Some(trace) = &t.trace {
        writeln!(out, "Tracing from: {}", trace.start_ref)?;
    }
    Ok(out)
}
