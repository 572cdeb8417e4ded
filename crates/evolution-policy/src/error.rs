use thiserror::Error;

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("council oracle unreachable: {0}")]
    CouncilUnavailable(String),
}
