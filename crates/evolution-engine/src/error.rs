use evolution_types::{ApplicationId, ConfigError, ProposalId};
use thiserror::Error;

/// Aggregates every component error at the one boundary a host actually
/// calls through, the same way `aas-service`'s `AasError` wraps its
/// sub-crates' errors with `#[from]` so `?` composes end to end.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("configuration invalid: {0}")]
    Config(#[from] ConfigError),

    #[error("config file could not be read or parsed: {0}")]
    ConfigLoad(String),

    #[error(transparent)]
    Store(#[from] evolution_store::StoreError),

    #[error(transparent)]
    Applicator(#[from] evolution_applicator::ApplicatorError),

    #[error(transparent)]
    Executor(#[from] evolution_executor::ExecutorError),

    #[error(transparent)]
    Monitor(#[from] evolution_healing::MonitorError),

    #[error("proposal not found: {0}")]
    ProposalNotFound(ProposalId),

    #[error("application event not found: {0}")]
    ApplicationNotFound(ApplicationId),

    #[error("daily budget or rollback cap exhausted")]
    RateLimited,
}
