use std::path::Path;
use std::process::Command;

use traj_core::trajectory::{create, CreateInput};
use traj_trace::{GitCli, TraceConfig, TraceGenerator, Vcs};

fn git(dir: &Path, args: &[&str]) -> bool {
    Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

fn commit_all(dir: &Path, msg: &str) -> bool {
    git(dir, &["add", "."])
        && git(
            dir,
            &[
                "-c",
                "user.email=test@test.com",
                "-c",
                "user.name=Test",
                "-c",
                "commit.gpgsign=false",
                "commit",
                "-q",
                "-m",
                msg,
            ],
        )
}

#[test]
fn traces_lines_added_between_commits() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    if !git(dir, &["init", "-q"]) {
        eprintln!("git unavailable, skipping");
        return;
    }
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    assert!(commit_all(dir, "init"));

    let gen = TraceGenerator::new(GitCli::new(dir), TraceConfig::with_model("test-model"));
    let start = gen.capture_reference().expect("head after first commit");

    std::fs::create_dir_all(dir.join("src")).unwrap();
    let body: String = (1..=10).map(|i| format!("line {i}\n")).collect();
    std::fs::write(dir.join("src/test.ts"), body).unwrap();
    std::fs::write(dir.join("README.md"), "hello\nworld\n").unwrap();
    assert!(commit_all(dir, "add module"));

    let t = create(CreateInput::new("Add module")).unwrap();
    let record = gen.generate_trace(&t, &start).expect("trace");
    let end = gen.vcs().head_ref().unwrap();

    let module = record
        .files
        .iter()
        .find(|f| f.path == "src/test.ts")
        .expect("new file traced");
    let range = &module.conversations[0].ranges[0];
    assert_eq!((range.start_line, range.end_line), (1, 10));
    assert_eq!(range.revision.as_deref(), Some(end.as_str()));

    let readme = record.files.iter().find(|f| f.path == "README.md").unwrap();
    let range = &readme.conversations[0].ranges[0];
    assert_eq!((range.start_line, range.end_line), (2, 2));

    let mut changed = gen.changed_files(&start, &end);
    changed.sort();
    assert_eq!(changed, vec!["README.md", "src/test.ts"]);
}

#[test]
fn noprefix_config_does_not_hide_changes() {
    let tmp = tempfile::tempdir().unwrap();
    let dir = tmp.path();
    if !git(dir, &["init", "-q"]) {
        eprintln!("git unavailable, skipping");
        return;
    }
    assert!(git(dir, &["config", "diff.noprefix", "true"]));
    assert!(git(dir, &["config", "diff.mnemonicPrefix", "true"]));
    std::fs::write(dir.join("README.md"), "hello\n").unwrap();
    assert!(commit_all(dir, "init"));

    let gen = TraceGenerator::new(GitCli::new(dir), TraceConfig::with_model("test-model"));
    let start = gen.capture_reference().expect("head after first commit");
    std::fs::write(dir.join("notes.txt"), "a\nb\n").unwrap();
    assert!(commit_all(dir, "notes"));

    let t = create(CreateInput::new("Notes")).unwrap();
    let record = gen.generate_trace(&t, &start).expect("trace");
    assert_eq!(record.files.len(), 1);
    assert_eq!(record.files[0].path, "notes.txt");
    let range = &record.files[0].conversations[0].ranges[0];
    assert_eq!((range.start_line, range.end_line), (1, 2));
}
