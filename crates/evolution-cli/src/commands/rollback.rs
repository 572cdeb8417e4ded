//! `evolution rollback <applicationId> [--auto|--manual] [--reason ...]` —
//! requests a rollback through the Self-Healing Monitor without waiting for
//! a periodic evaluation to notice degradation.

use crate::error::{CliError, CliResult};
use crate::output::{print_error, print_monitor_outcome};
use dialoguer::Confirm;
use evolution_engine::EvolutionEngine;
use evolution_executor::StaticMetricsSource;
use evolution_types::ApplicationId;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub async fn execute(
    workspace: &Path,
    application_id: &str,
    manual: bool,
    reason: Option<&str>,
    assume_yes: bool,
) -> CliResult<()> {
    let id = ApplicationId::from_str(application_id)
        .map_err(|e| CliError::InvalidArgument(format!("not a valid application id: {e}")))?;

    if let Some(reason) = reason {
        tracing::info!(reason, "rollback requested");
    }

    if manual && !assume_yes {
        let confirmed = Confirm::new()
            .with_prompt(format!("roll back application {id} manually? this bypasses the daily rollback cap"))
            .default(false)
            .interact()
            .unwrap_or(false);
        if !confirmed {
            print_error("rollback cancelled");
            return Ok(());
        }
    }

    let engine = EvolutionEngine::open(workspace, None, Arc::new(StaticMetricsSource::neutral())).await?;
    let outcome = engine.rollback(id, manual, reason.map(str::to_string)).await?;
    print_monitor_outcome(&outcome);
    Ok(())
}
