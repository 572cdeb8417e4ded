//! Tracks the process running `evolution start` so a separate `evolution
//! stop` invocation can find and signal it. There is no daemon process to
//! dial over a network the way `maple-cli` dials `palmd` — this is a
//! single-binary control loop — so the handoff between `start` and `stop`
//! goes through a pid file the same way `maple-cli` falls back to one when
//! the daemon's HTTP shutdown endpoint is unreachable.

use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;

#[derive(Debug, Serialize, Deserialize)]
pub struct RunningProcess {
    pub pid: u32,
    pub started_at_epoch_secs: u64,
}

fn pid_file_path(workspace: &Path) -> PathBuf {
    workspace.join(".evolution").join("evolution.pid")
}

pub fn write(workspace: &Path) -> std::io::Result<()> {
    let path = pid_file_path(workspace);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let payload = RunningProcess {
        pid: std::process::id(),
        started_at_epoch_secs: std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
    };
    let json = serde_json::to_string_pretty(&payload)?;
    let mut file = fs::OpenOptions::new().create(true).truncate(true).write(true).open(&path)?;
    file.write_all(json.as_bytes())
}

pub fn read(workspace: &Path) -> std::io::Result<Option<RunningProcess>> {
    let path = pid_file_path(workspace);
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(&path)?;
    Ok(serde_json::from_str(&content).ok())
}

pub fn remove(workspace: &Path) {
    let _ = fs::remove_file(pid_file_path(workspace));
}

pub fn is_alive(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Command::new("kill").arg("-0").arg(pid.to_string()).status().map(|s| s.success()).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}

pub fn terminate(pid: u32) -> bool {
    #[cfg(unix)]
    {
        Command::new("kill").arg("-TERM").arg(pid.to_string()).status().map(|s| s.success()).unwrap_or(false)
    }
    #[cfg(not(unix))]
    {
        let _ = pid;
        false
    }
}
