use std::path::{Path, PathBuf};

/// Paths reported by `evolution:open`. Existence of the pointed-to file or
/// directory is not guaranteed — a fresh workspace reports `None` for
/// anything that hasn't happened yet.
#[derive(Clone, Debug)]
pub struct EnginePaths {
    pub application_log: PathBuf,
    pub rollback_log: PathBuf,
    pub latest_backup: Option<PathBuf>,
}

impl EnginePaths {
    pub fn new(workspace: &Path) -> Self {
        let root = workspace.join(".evolution");
        Self {
            application_log: root.join("applications").join("log.jsonl"),
            rollback_log: root.join("rollback-log.jsonl"),
            latest_backup: latest_backup_dir(&root.join("backups")),
        }
    }
}

fn latest_backup_dir(backups_dir: &Path) -> Option<PathBuf> {
    let entries = std::fs::read_dir(backups_dir).ok()?;
    entries
        .filter_map(|e| e.ok())
        .filter(|e| e.path().is_dir())
        .max_by_key(|e| e.file_name())
        .map(|e| e.path())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_workspace_reports_no_backup() {
        let dir = tempfile::tempdir().unwrap();
        let paths = EnginePaths::new(dir.path());
        assert!(paths.latest_backup.is_none());
        assert_eq!(paths.application_log, dir.path().join(".evolution/applications/log.jsonl"));
    }

    #[test]
    fn picks_the_lexicographically_latest_backup_directory() {
        let dir = tempfile::tempdir().unwrap();
        let backups = dir.path().join(".evolution").join("backups");
        std::fs::create_dir_all(backups.join("backup-2024-01-01T00-00-00Z")).unwrap();
        std::fs::create_dir_all(backups.join("backup-2024-06-01T00-00-00Z")).unwrap();

        let paths = EnginePaths::new(dir.path());
        assert_eq!(
            paths.latest_backup.unwrap().file_name().unwrap().to_str().unwrap(),
            "backup-2024-06-01T00-00-00Z"
        );
    }
}
