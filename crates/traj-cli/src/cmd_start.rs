use traj_core::trajectory::{begin_trace, create, CreateInput};
use traj_core::{TaskSource, Trajectory};
use traj_store::FileStorage;
use traj_trace::{TraceGenerator, Vcs};

pub struct StartParams {
    pub title: String,
    pub description: Option<String>,
    pub agent: Option<String>,
    pub source_system: Option<String>,
    pub source_id: Option<String>,
    pub source_url: Option<String>,
    pub project: Option<String>,
    pub tags: Vec<String>,
}

pub fn execute<V: Vcs>(
    store: &FileStorage,
    tracer: &TraceGenerator<V>,
    params: StartParams,
) -> anyhow::Result<()> {
    let t = start(store, tracer, params)?;
    println!("Started {} \"{}\"", t.id, t.task.title);
    if let Some(trace) = &t.trace {
        println!("Tracing changes from {}", trace.start_ref);
    }
    Ok(())
}

pub(crate) fn start<V: Vcs>(
    store: &FileStorage,
    tracer: &TraceGenerator<V>,
    params: StartParams,
) -> anyhow::Result<Trajectory> {
    if let Some(active) = store.get_active()? {
        anyhow::bail!(
            "trajectory {} is already active: \"{}\" (complete or abandon it first)",
            active.id,
            active.task.title
        );
    }

    let source = match (params.source_system, params.source_id) {
        (Some(system), Some(id)) => Some(TaskSource {
            system,
            id,
            url: params.source_url,
        }),
        _ => None,
    };
    let mut t = create(CreateInput {
        title: params.title,
        description: params.description,
        source,
        project_id: params.project,
        tags: params.tags,
        agent: params.agent,
    })?;

    match tracer.capture_reference() {
        Some(head) => t = begin_trace(&t, &head)?,
        None => tracing::debug!("no version control head, trace disabled"),
    }

    store.save(&t)?;
    Ok(t)
}
