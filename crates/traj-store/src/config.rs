use std::path::{Path, PathBuf};

/// Environment override for the store root.
pub const DATA_DIR_ENV: &str = "TRAJECTORIES_DATA_DIR";

/// Directory name used under the working directory when nothing else is configured.
pub const DEFAULT_DIR_NAME: &str = ".trajectories";

/// Where the store lives. Resolved once at startup and passed to [`crate::FileStorage`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreConfig {
    pub root: PathBuf,
}

impl StoreConfig {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Precedence: explicit argument > override from `lookup(DATA_DIR_ENV)` > `<cwd>/.trajectories`.
    pub fn resolve<F>(explicit: Option<&Path>, lookup: F, cwd: &Path) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(root) = explicit {
            return Self::new(absolutize(root, cwd));
        }
        if let Some(dir) = lookup(DATA_DIR_ENV).filter(|v| !v.trim().is_empty()) {
            return Self::new(absolutize(Path::new(&dir), cwd));
        }
        Self::new(cwd.join(DEFAULT_DIR_NAME))
    }

    /// [`StoreConfig::resolve`] against the process environment.
    pub fn from_env(explicit: Option<&Path>, cwd: &Path) -> Self {
        Self::resolve(explicit, |key| std::env::var(key).ok(), cwd)
    }
}

fn absolutize(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}
