use crate::error::ApplicatorError;
use crate::target_fs::TargetFs;
use std::sync::RwLock;

/// Snapshots a fixed set of targets into a timestamped subdirectory before
/// the first mutation of a batch, pruning the oldest backup once more than
/// `max_backups` have accumulated. One backup is a named group of target
/// paths written under `backups/<label>/`.
pub struct BackupManager {
    max_backups: usize,
    backups: RwLock<Vec<Vec<String>>>,
}

impl BackupManager {
    pub fn new(max_backups: usize) -> Self {
        Self {
            max_backups,
            backups: RwLock::new(Vec::new()),
        }
    }

    /// Copies each `(target, content)` pair into a backup directory named
    /// `label`, pruning the oldest stored backup if the new one exceeds
    /// `max_backups`.
    pub async fn take_backup(
        &self,
        fs: &dyn TargetFs,
        label: &str,
        targets: &[(String, String)],
    ) -> Result<(), ApplicatorError> {
        if self.max_backups == 0 {
            return Ok(());
        }
        let mut written = Vec::with_capacity(targets.len());
        for (target, content) in targets {
            let backup_path = format!("backups/{label}/{target}");
            fs.write(&backup_path, content).await?;
            written.push(backup_path);
        }

        let pruned = {
            let mut backups = self.backups.write().unwrap();
            backups.push(written);
            if backups.len() > self.max_backups {
                Some(backups.remove(0))
            } else {
                None
            }
        };

        if let Some(stale) = pruned {
            for path in stale {
                fs.remove(&path).await?;
            }
        }
        Ok(())
    }

    pub fn backup_count(&self) -> usize {
        self.backups.read().unwrap().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target_fs::InMemoryTargetFs;

    #[tokio::test]
    async fn backup_writes_under_label() {
        let fs = InMemoryTargetFs::new();
        let mgr = BackupManager::new(3);
        mgr.take_backup(&fs, "t1", &[("rules.md".into(), "old content".into())])
            .await
            .unwrap();
        assert_eq!(fs.get("backups/t1/rules.md"), Some("old content".to_string()));
        assert_eq!(mgr.backup_count(), 1);
    }

    #[tokio::test]
    async fn oldest_backup_pruned_past_max() {
        let fs = InMemoryTargetFs::new();
        let mgr = BackupManager::new(2);
        mgr.take_backup(&fs, "t1", &[("a.md".into(), "1".into())]).await.unwrap();
        mgr.take_backup(&fs, "t2", &[("a.md".into(), "2".into())]).await.unwrap();
        mgr.take_backup(&fs, "t3", &[("a.md".into(), "3".into())]).await.unwrap();
        assert_eq!(mgr.backup_count(), 2);
        assert_eq!(fs.get("backups/t1/a.md"), None);
        assert_eq!(fs.get("backups/t3/a.md"), Some("3".to_string()));
    }

    #[tokio::test]
    async fn zero_max_backups_is_a_no_op() {
        let fs = InMemoryTargetFs::new();
        let mgr = BackupManager::new(0);
        mgr.take_backup(&fs, "t1", &[("a.md".into(), "1".into())]).await.unwrap();
        assert_eq!(mgr.backup_count(), 0);
        assert_eq!(fs.get("backups/t1/a.md"), None);
    }
}
