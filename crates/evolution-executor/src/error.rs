use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error(transparent)]
    Store(#[from] evolution_store::StoreError),

    #[error(transparent)]
    Applicator(#[from] evolution_applicator::ApplicatorError),
}
