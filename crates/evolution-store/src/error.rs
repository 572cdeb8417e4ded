use evolution_types::ProposalId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("proposal not found: {0}")]
    NotFound(ProposalId),

    #[error("on-disk record could not be parsed: {0}")]
    Corrupted(String),

    #[error("backing directory could not be created or written: {0}")]
    Unavailable(String),

    #[error("workspace already locked by another process (lockfile at {0})")]
    AlreadyLocked(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
