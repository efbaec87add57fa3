use anyhow::bail;
use traj_store::{render, FileStorage};

pub fn show(store: &FileStorage, id: &str, format: &str, trace: bool) -> anyhow::Result<()> {
    if trace {
        let Some(record) = store.get_trace(id)? else {
            bail!("no trace recorded for {id}");
        };
        println!("{}", serde_json::to_string_pretty(&record)?);
        return Ok(());
    }

    let t = store.load(id)?;
    let text = match format {
        "json" => serde_json::to_string_pretty(&t)?,
        "markdown" | "md" => render::markdown(&t),
        "timeline" => render::timeline(&t),
        other => bail!("unknown format: {other} (expected json, markdown, or timeline)"),
    };
    print!("{text}");
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

pub fn delete(store: &FileStorage, id: &str) -> anyhow::Result<()> {
    store.delete(id)?;
    println!("Deleted {id}");
    Ok(())
}
