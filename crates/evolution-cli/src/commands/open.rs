//! `evolution open` — paths to the latest application-event record,
//! rollback-log entry, and backup directory.

use crate::error::CliResult;
use crate::output::{print_paths, OutputFormat};
use evolution_engine::EvolutionEngine;
use evolution_executor::StaticMetricsSource;
use std::path::Path;
use std::sync::Arc;

pub async fn execute(workspace: &Path, format: OutputFormat) -> CliResult<()> {
    let engine = EvolutionEngine::open(workspace, None, Arc::new(StaticMetricsSource::neutral())).await?;
    print_paths(&engine.paths(), format);
    Ok(())
}
