use traj_core::trajectory::{
    abandon as abandon_trajectory, attach_trace, complete as complete_trajectory,
    record_files_changed, CompleteInput,
};
use traj_core::{TraceRecord, Trajectory};
use traj_store::FileStorage;
use traj_trace::{TraceGenerator, Vcs};

use crate::require_active;

pub fn complete<V: Vcs>(
    store: &FileStorage,
    tracer: &TraceGenerator<V>,
    input: CompleteInput,
) -> anyhow::Result<()> {
    let (done, record) = finish(store, tracer, input)?;
    println!("Completed {} \"{}\"", done.id, done.task.title);
    if !done.files_changed.is_empty() {
        println!("Files changed: {}", done.files_changed.len());
    }
    if let Some(record) = record {
        println!(
            "Trace {}: {} ranges across {} files",
            record.id,
            record.range_count(),
            record.files.len()
        );
    }
    Ok(())
}

/// Complete the active trajectory and attach a trace when the VCS allows one.
pub(crate) fn finish<V: Vcs>(
    store: &FileStorage,
    tracer: &TraceGenerator<V>,
    input: CompleteInput,
) -> anyhow::Result<(Trajectory, Option<TraceRecord>)> {
    let active = require_active(store)?;
    let mut done = complete_trajectory(&active, input)?;

    let mut record = None;
    let start_ref = active.trace.as_ref().map(|r| r.start_ref.clone());
    if let (Some(start_ref), Some(end_ref)) = (start_ref, tracer.capture_reference()) {
        done = record_files_changed(&done, &tracer.changed_files(&start_ref, &end_ref));
        if let Some(r) = tracer.trace_between(&done, &start_ref, &end_ref) {
            done = attach_trace(&done, &r, &start_ref, &end_ref);
            record = Some(r);
        }
    }

    store.save(&done)?;
    if let Some(r) = &record {
        let path = store.save_trace(&done, r)?;
        tracing::debug!(path = %path.display(), "wrote trace");
    }
    Ok((done, record))
}

pub fn abandon(store: &FileStorage, reason: Option<&str>) -> anyhow::Result<()> {
    let active = require_active(store)?;
    let t = abandon_trajectory(&active, reason)?;
    store.save(&t)?;
    println!("Abandoned {} \"{}\"", t.id, t.task.title);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cmd_start::start;
    use crate::cmd_start::tests::{fixture, params};
    use traj_core::TrajectoryStatus;

    #[test]
    fn complete_files_trajectory_out_of_active() {
        let (_tmp, store, tracer) = fixture();
        let t = start(&store, &tracer, params("Implement auth")).unwrap();

        let (done, record) =
            finish(&store, &tracer, CompleteInput::new("done", "tdd", 0.9)).unwrap();
        assert!(record.is_none());
        assert_eq!(done.status, TrajectoryStatus::Completed);
        assert!(store.get_active().unwrap().is_none());

        let stored = store.load(&t.id).unwrap();
        assert_eq!(stored.retrospective.unwrap().summary, "done");
        assert!(store.placement(&done).with_extension("md").exists());
    }

    fn git(dir: &std::path::Path, args: &[&str]) -> bool {
        std::process::Command::new("git")
            .args(["-c", "user.email=test@test.com", "-c", "user.name=Test"])
            .args(["-c", "commit.gpgsign=false"])
            .args(args)
            .current_dir(dir)
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn complete_in_repository_writes_trace_sidecar() {
        let (tmp, store, tracer) = fixture();
        let dir = tmp.path();
        if !git(dir, &["init", "-q"]) {
            eprintln!("git unavailable, skipping");
            return;
        }
        std::fs::write(dir.join("README.md"), "hello\n").unwrap();
        assert!(git(dir, &["add", "README.md"]) && git(dir, &["commit", "-q", "-m", "init"]));

        let t = start(&store, &tracer, params("Add lib")).unwrap();
        assert!(t.trace.is_some());

        std::fs::create_dir_all(dir.join("src")).unwrap();
        std::fs::write(dir.join("src/lib.rs"), "pub fn a() {}\npub fn b() {}\n").unwrap();
        assert!(git(dir, &["add", "src/lib.rs"]) && git(dir, &["commit", "-q", "-m", "lib"]));

        let (done, record) =
            finish(&store, &tracer, CompleteInput::new("done", "direct", 0.8)).unwrap();
        let record = record.expect("trace record");
        let trace_ref = done.trace.as_ref().unwrap();
        assert_eq!(trace_ref.trace_id.as_deref(), Some(record.id.as_str()));
        assert!(trace_ref.end_ref.is_some());
        assert_eq!(done.files_changed, vec!["src/lib.rs".to_string()]);

        let bucket = traj_core::month_bucket(done.completed_at.as_deref().unwrap()).unwrap();
        let sidecar = store
            .paths()
            .month_dir(&bucket)
            .join(format!("{}.trace.json", done.id));
        assert!(sidecar.exists());
        assert_eq!(store.get_trace(&done.id).unwrap(), Some(record));
        assert_eq!(store.load(&done.id).unwrap(), done);
    }

    #[test]
    fn invalid_retrospective_leaves_trajectory_active() {
        let (_tmp, store, tracer) = fixture();
        start(&store, &tracer, params("t")).unwrap();
        assert!(finish(&store, &tracer, CompleteInput::new("", "tdd", 2.0)).is_err());
        assert!(store.get_active().unwrap().is_some());
    }

    #[test]
    fn abandon_records_reason() {
        let (_tmp, store, tracer) = fixture();
        let t = start(&store, &tracer, params("t")).unwrap();
        abandon(&store, Some("requirements changed")).unwrap();
        let stored = store.load(&t.id).unwrap();
        assert_eq!(stored.status, TrajectoryStatus::Abandoned);
        assert!(abandon(&store, None).is_err());
    }
}
