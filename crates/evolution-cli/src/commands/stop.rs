//! `evolution stop` — signals the process recorded by a prior `evolution
//! start` via its pid file. There is no running-process registry beyond
//! that file, matching the single-binary (no daemon) architecture.

use super::pidfile;
use crate::error::{CliError, CliResult};
use crate::output::print_success;
use std::path::Path;

pub fn execute(workspace: &Path) -> CliResult<()> {
    let running = pidfile::read(workspace).ok().flatten().ok_or(CliError::NoManagedProcess)?;

    if !pidfile::is_alive(running.pid) {
        pidfile::remove(workspace);
        return Err(CliError::NoManagedProcess);
    }

    if pidfile::terminate(running.pid) {
        print_success(&format!("sent termination signal to evolution process {}", running.pid));
        Ok(())
    } else {
        Err(CliError::InvalidArgument(format!("failed to signal process {}", running.pid)))
    }
}
