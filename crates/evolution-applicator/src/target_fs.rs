use crate::error::ApplicatorError;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

/// Capability the Applicator reaches targets through. Targets are named
/// strings scoped to a workspace directory; the trait hides whether that
/// means a real file, an entry in an in-memory map (tests), or eventually
/// some other collaborator.
#[async_trait]
pub trait TargetFs: Send + Sync {
    async fn read(&self, target: &str) -> Result<Option<String>, ApplicatorError>;
    async fn write(&self, target: &str, content: &str) -> Result<(), ApplicatorError>;
    async fn remove(&self, target: &str) -> Result<(), ApplicatorError>;
    async fn exists(&self, target: &str) -> Result<bool, ApplicatorError>;
}

/// In-memory `TargetFs` for tests.
#[derive(Default)]
pub struct InMemoryTargetFs {
    files: RwLock<HashMap<String, String>>,
}

impl InMemoryTargetFs {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seeded(entries: impl IntoIterator<Item = (&'static str, &'static str)>) -> Self {
        let files = entries
            .into_iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self {
            files: RwLock::new(files),
        }
    }

    pub fn get(&self, target: &str) -> Option<String> {
        self.files.read().unwrap().get(target).cloned()
    }
}

#[async_trait]
impl TargetFs for InMemoryTargetFs {
    async fn read(&self, target: &str) -> Result<Option<String>, ApplicatorError> {
        Ok(self.files.read().unwrap().get(target).cloned())
    }

    async fn write(&self, target: &str, content: &str) -> Result<(), ApplicatorError> {
        self.files
            .write()
            .unwrap()
            .insert(target.to_string(), content.to_string());
        Ok(())
    }

    async fn remove(&self, target: &str) -> Result<(), ApplicatorError> {
        self.files.write().unwrap().remove(target);
        Ok(())
    }

    async fn exists(&self, target: &str) -> Result<bool, ApplicatorError> {
        Ok(self.files.read().unwrap().contains_key(target))
    }
}

/// Filesystem-backed `TargetFs` rooted at a workspace directory. Every
/// target is resolved relative to `root` and parent directories are created
/// on write.
pub struct WorkspaceTargetFs {
    root: PathBuf,
}

impl WorkspaceTargetFs {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn resolve(&self, target: &str) -> PathBuf {
        self.root.join(target)
    }
}

#[async_trait]
impl TargetFs for WorkspaceTargetFs {
    async fn read(&self, target: &str) -> Result<Option<String>, ApplicatorError> {
        let path = self.resolve(target);
        match tokio::fs::read_to_string(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(ApplicatorError::TargetMissing(format!("{}: {e}", path.display()))),
        }
    }

    async fn write(&self, target: &str, content: &str) -> Result<(), ApplicatorError> {
        let path = self.resolve(target);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| ApplicatorError::TargetMissing(format!("{}: {e}", parent.display())))?;
        }
        tokio::fs::write(&path, content)
            .await
            .map_err(|e| ApplicatorError::TargetMissing(format!("{}: {e}", path.display())))
    }

    async fn remove(&self, target: &str) -> Result<(), ApplicatorError> {
        let path = self.resolve(target);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(ApplicatorError::TargetMissing(format!("{}: {e}", path.display()))),
        }
    }

    async fn exists(&self, target: &str) -> Result<bool, ApplicatorError> {
        Ok(self.resolve(target).exists())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn in_memory_read_write_round_trips() {
        let fs = InMemoryTargetFs::new();
        fs.write("a.txt", "hello").await.unwrap();
        assert_eq!(fs.read("a.txt").await.unwrap(), Some("hello".to_string()));
    }

    #[tokio::test]
    async fn missing_target_reads_as_none() {
        let fs = InMemoryTargetFs::new();
        assert_eq!(fs.read("missing.txt").await.unwrap(), None);
    }

    #[tokio::test]
    async fn remove_clears_target() {
        let fs = InMemoryTargetFs::new();
        fs.write("a.txt", "hello").await.unwrap();
        fs.remove("a.txt").await.unwrap();
        assert!(!fs.exists("a.txt").await.unwrap());
    }

    #[tokio::test]
    async fn workspace_fs_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let fs = WorkspaceTargetFs::new(dir.path());
        fs.write("nested/dir/file.txt", "content").await.unwrap();
        assert_eq!(fs.read("nested/dir/file.txt").await.unwrap(), Some("content".to_string()));
    }
}
