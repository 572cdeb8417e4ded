//! CLI-level error type. Every variant carries its own process exit code
//! (§6's table: 0 success, 1 recoverable failure, 2 invalid argument,
//! 3 rate-limited, 4 corrupted state) so `main` never has to re-derive one
//! from a message string.

use evolution_engine::EngineError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    InvalidArgument(String),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no managed process found for this workspace")]
    NoManagedProcess,
}

impl CliError {
    pub fn exit_code(&self) -> i32 {
        match self {
            CliError::InvalidArgument(_) => 2,
            CliError::NoManagedProcess => 1,
            CliError::Engine(e) => engine_error_exit_code(e),
        }
    }
}

fn engine_error_exit_code(e: &EngineError) -> i32 {
    use evolution_applicator::ApplicatorError;
    use evolution_healing::MonitorError;
    use evolution_store::StoreError;

    match e {
        EngineError::Config(_) | EngineError::ConfigLoad(_) => 2,
        EngineError::ProposalNotFound(_) | EngineError::ApplicationNotFound(_) => 2,
        EngineError::RateLimited => 3,
        EngineError::Monitor(MonitorError::ApplicationNotFound(_) | MonitorError::RollbackRecordNotFound(_)) => 2,
        EngineError::Monitor(MonitorError::RateLimited) => 3,
        EngineError::Store(StoreError::Corrupted(_)) => 4,
        EngineError::Applicator(ApplicatorError::Corrupted(_)) => 4,
        EngineError::Store(_) | EngineError::Applicator(_) | EngineError::Executor(_) | EngineError::Monitor(_) => 1,
    }
}

pub type CliResult<T> = Result<T, CliError>;
