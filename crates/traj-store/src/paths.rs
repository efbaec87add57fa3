use std::path::{Path, PathBuf};

/// All well-known paths under a trajectory store root.
#[derive(Debug, Clone)]
pub struct StorePaths {
    pub root: PathBuf,
    pub index_json: PathBuf,
    pub active_dir: PathBuf,
    pub completed_dir: PathBuf,
    pub lock_file: PathBuf,
}

impl StorePaths {
    /// Derive all paths from a store root. Pure computation, no I/O.
    pub fn discover(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            index_json: root.join("index.json"),
            active_dir: root.join("active"),
            completed_dir: root.join("completed"),
            lock_file: root.join(".lock"),
            root,
        }
    }

    /// Create all required directories. Idempotent.
    pub fn ensure_layout(&self) -> std::io::Result<()> {
        for dir in [&self.root, &self.active_dir, &self.completed_dir] {
            std::fs::create_dir_all(dir)?;
        }
        Ok(())
    }

    pub fn is_initialized(&self) -> bool {
        self.active_dir.is_dir() && self.completed_dir.is_dir()
    }

    pub fn active_file(&self, id: &str) -> PathBuf {
        self.active_dir.join(format!("{id}.json"))
    }

    /// `completed/<YYYY-MM>/`
    pub fn month_dir(&self, bucket: &str) -> PathBuf {
        self.completed_dir.join(bucket)
    }

    pub fn completed_file(&self, bucket: &str, id: &str) -> PathBuf {
        self.month_dir(bucket).join(format!("{id}.json"))
    }

    /// Path relative to the root with forward slashes, as stored in the index.
    pub fn relative(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }

    pub fn resolve(&self, relative: &str) -> PathBuf {
        relative
            .split('/')
            .filter(|part| !part.is_empty())
            .fold(self.root.clone(), |acc, part| acc.join(part))
    }
}

/// `<dir>/<id>.md` next to a trajectory's JSON.
pub fn markdown_sibling(json_path: &Path) -> PathBuf {
    json_path.with_extension("md")
}

/// `<dir>/<id>.trace.json` next to a trajectory's JSON.
pub fn trace_sibling(json_path: &Path) -> PathBuf {
    json_path.with_extension("trace.json")
}
