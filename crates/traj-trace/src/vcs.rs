//! Version-control queries the trace generator depends on.

use std::path::PathBuf;
use std::process::Command;

/// The four query shapes trace generation needs from a VCS.
pub trait Vcs {
    fn is_repository(&self) -> bool;
    /// Current head reference, `None` when it cannot be resolved.
    fn head_ref(&self) -> Option<String>;
    /// Unified diff text between two references.
    fn diff(&self, start: &str, end: &str) -> Option<String>;
    fn changed_files(&self, start: &str, end: &str) -> Vec<String>;
}

/// `git` on PATH, run in a fixed working directory.
#[derive(Debug, Clone)]
pub struct GitCli {
    cwd: PathBuf,
}

impl GitCli {
    pub fn new(cwd: impl Into<PathBuf>) -> Self {
        GitCli { cwd: cwd.into() }
    }

    fn run(&self, args: &[&str]) -> Option<String> {
        let output = match Command::new("git")
            .args(args)
            .current_dir(&self.cwd)
            .output()
        {
            Ok(output) => output,
            Err(e) => {
                tracing::debug!(error = %e, "git not runnable");
                return None;
            }
        };
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::debug!(?args, stderr = %stderr.trim(), "git command failed");
            return None;
        }
        Some(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl Vcs for GitCli {
    fn is_repository(&self) -> bool {
        self.run(&["rev-parse", "--is-inside-work-tree"])
            .is_some_and(|out| out.trim() == "true")
    }

    fn head_ref(&self) -> Option<String> {
        self.run(&["rev-parse", "HEAD"])
            .map(|out| out.trim().to_string())
            .filter(|r| !r.is_empty())
    }

    fn diff(&self, start: &str, end: &str) -> Option<String> {
        self.run(&[
            "diff",
            "--no-color",
            "--no-ext-diff",
            "--unified=0",
            "--src-prefix=a/",
            "--dst-prefix=b/",
            start,
            end,
        ])
    }

    fn changed_files(&self, start: &str, end: &str) -> Vec<String> {
        self.run(&["diff", "--name-only", start, end])
            .map(|out| {
                out.lines()
                    .map(str::trim)
                    .filter(|l| !l.is_empty())
                    .map(String::from)
                    .collect()
            })
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_directory_is_not_a_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let git = GitCli::new(tmp.path());
        assert!(!git.is_repository());
        assert!(git.head_ref().is_none());
        assert!(git.changed_files("HEAD~1", "HEAD").is_empty());
    }
}
