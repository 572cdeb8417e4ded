use thiserror::Error;

/// Errors from the Change Applicator.
#[derive(Debug, Error)]
pub enum ApplicatorError {
    #[error("target missing or unreachable: {0}")]
    TargetMissing(String),

    #[error("target content is corrupted: {0}")]
    Corrupted(String),

    #[error("application timed out after {0}ms")]
    Timeout(u64),

    #[error("rollback record not found for application {0}")]
    RollbackRecordNotFound(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let e = ApplicatorError::TargetMissing("rules.md".into());
        assert!(format!("{e}").contains("rules.md"));
    }

    #[test]
    fn timeout_display() {
        let e = ApplicatorError::Timeout(5000);
        assert!(format!("{e}").contains("5000"));
    }
}
