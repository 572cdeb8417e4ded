use crate::error::StoreError;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Advisory cross-process lock. Cross-process writers are not supported per
/// the spec; this merely detects them so a second process refuses to start
/// rather than corrupting state silently.
pub struct LockGuard {
    path: PathBuf,
}

impl LockGuard {
    /// Acquire the lock at `workspace_dir/.lock`, failing with
    /// `AlreadyLocked` if another process already holds it.
    pub fn acquire(workspace_dir: &Path) -> Result<Self, StoreError> {
        let path = workspace_dir.join(".lock");
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&path)
            .map_err(|_| StoreError::AlreadyLocked(path.display().to_string()))?;
        let _ = write!(file, "{}", std::process::id());
        Ok(Self { path })
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        let _ = std::fs::remove_file(&self.path);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_fails_while_first_held() {
        let dir = tempfile::tempdir().unwrap();
        let first = LockGuard::acquire(dir.path()).unwrap();
        let second = LockGuard::acquire(dir.path());
        assert!(second.is_err());
        drop(first);
        assert!(LockGuard::acquire(dir.path()).is_ok());
    }
}
