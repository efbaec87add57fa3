use crate::paths::StorePaths;
use fs2::FileExt;
use std::fs::{File, OpenOptions};

/// Advisory exclusive lock backed by `<root>/.lock`.
/// Serializes write sequences across processes; released on drop.
pub struct StoreLock {
    _file: File,
}

fn open_lock_file(paths: &StorePaths) -> std::io::Result<File> {
    std::fs::create_dir_all(&paths.root)?;
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(&paths.lock_file)
}

impl StoreLock {
    /// Block until the lock is available.
    pub fn acquire(paths: &StorePaths) -> std::io::Result<Self> {
        let file = open_lock_file(paths)?;
        file.lock_exclusive()?;
        Ok(Self { _file: file })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_drop() {
        let tmp = tempfile::tempdir().unwrap();
        let p = StorePaths::discover(tmp.path());

        let lock = StoreLock::acquire(&p).unwrap();
        assert!(p.lock_file.exists());
        let other = open_lock_file(&p).unwrap();
        assert!(other.try_lock_exclusive().is_err());
        drop(lock);
        other.try_lock_exclusive().unwrap();
        other.unlock().unwrap();
        let _again = StoreLock::acquire(&p).unwrap();
    }
}
