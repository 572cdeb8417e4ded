//! `evolution apply <id>` — force a single-proposal run outside the
//! Scheduler's own cadence, equivalent to one Executor entry.

use crate::error::{CliError, CliResult};
use crate::output::print_execution_outcome;
use evolution_engine::EvolutionEngine;
use evolution_executor::StaticMetricsSource;
use evolution_types::ProposalId;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;

pub async fn execute(workspace: &Path, proposal_id: &str) -> CliResult<()> {
    let id = ProposalId::from_str(proposal_id)
        .map_err(|e| CliError::InvalidArgument(format!("not a valid proposal id: {e}")))?;

    let engine = EvolutionEngine::open(workspace, None, Arc::new(StaticMetricsSource::neutral())).await?;
    let outcome = engine.apply_one(id).await?;
    print_execution_outcome(&outcome);
    Ok(())
}
