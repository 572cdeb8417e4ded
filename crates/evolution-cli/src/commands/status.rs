//! `evolution status` — current scheduler state, counters, next tick.

use super::pidfile;
use crate::error::CliResult;
use crate::output::{print_status, OutputFormat};
use evolution_engine::EvolutionEngine;
use evolution_executor::StaticMetricsSource;
use std::path::Path;
use std::sync::Arc;

pub async fn execute(workspace: &Path, format: OutputFormat) -> CliResult<()> {
    let engine = EvolutionEngine::open(workspace, None, Arc::new(StaticMetricsSource::neutral())).await?;
    let status = engine.status().await?;
    print_status(&status, format);

    if let Some(running) = pidfile::read(workspace).ok().flatten() {
        if pidfile::is_alive(running.pid) {
            println!("managed process: running (pid={})", running.pid);
        } else {
            println!("managed process: pid file present but process {} is not running", running.pid);
        }
    } else {
        println!("managed process: none (no `evolution start` foreground process tracked)");
    }

    Ok(())
}
