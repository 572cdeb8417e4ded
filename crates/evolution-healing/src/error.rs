use evolution_types::ApplicationId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("application event not found: {0}")]
    ApplicationNotFound(ApplicationId),

    #[error("rollback record not found for application {0}")]
    RollbackRecordNotFound(ApplicationId),

    #[error("post-application metrics not yet recorded for {0}")]
    NoPostMetrics(ApplicationId),

    #[error("automatic rollback rate-limited: daily cap reached")]
    RateLimited,

    #[error(transparent)]
    Store(#[from] evolution_store::StoreError),

    #[error(transparent)]
    Applicator(#[from] evolution_applicator::ApplicatorError),
}
