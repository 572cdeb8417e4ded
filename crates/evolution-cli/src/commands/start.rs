//! `evolution start` — builds the engine, starts the Scheduler, and blocks
//! in the foreground until Ctrl-C or SIGTERM (typically sent by a sibling
//! `evolution stop` invocation via the pid file) asks it to wind down.

use super::pidfile;
use crate::error::CliResult;
use crate::output::print_success;
use evolution_engine::EvolutionEngine;
use evolution_executor::StaticMetricsSource;
use std::path::Path;
use std::sync::Arc;

pub async fn execute(workspace: &Path) -> CliResult<()> {
    let engine = EvolutionEngine::open(workspace, None, Arc::new(StaticMetricsSource::neutral())).await?;
    engine.start().await;
    pidfile::write(workspace).ok();

    print_success(&format!("evolution engine started (pid={})", std::process::id()));
    wait_for_shutdown_signal().await;

    engine.stop().await;
    pidfile::remove(workspace);
    print_success("evolution engine stopped");
    Ok(())
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let mut term = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = term.recv() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
