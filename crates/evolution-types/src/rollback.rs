use crate::ids::{ApplicationId, ProposalId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A single reversible mutation: enough to undo one forward write the
/// Applicator performed against `target`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct InverseOperation {
    pub target: String,
    pub previous_content: Option<String>,
    pub applied_content: String,
}

/// Produced by the Applicator after a successful or partial application.
/// Every target named here is guaranteed (by the invariant in §8) to still
/// exist at the time the record is consulted.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RollbackRecord {
    pub schema_version: u32,
    pub application_id: ApplicationId,
    pub inverse_operations: Vec<InverseOperation>,
    pub created_at: DateTime<Utc>,
}

impl RollbackRecord {
    pub fn new(application_id: ApplicationId, inverse_operations: Vec<InverseOperation>) -> Self {
        Self {
            schema_version: crate::ids::SCHEMA_VERSION,
            application_id,
            inverse_operations,
            created_at: Utc::now(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.inverse_operations.is_empty()
    }
}

/// One line of the rollback audit trail: both auto-heal and manual rollbacks
/// append an entry here, independent of and in addition to the ephemeral
/// `RollbackStarted`/`RollbackCompleted` events the bus emits.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RollbackAuditEntry {
    pub schema_version: u32,
    pub application_id: ApplicationId,
    pub proposal_id: ProposalId,
    /// "auto-heal" or "manual".
    pub reason: String,
    /// Degradation factors for an auto-heal rollback, or the operator's
    /// free-text `--reason` for a manual one.
    pub detail: String,
    pub rolled_back_at: DateTime<Utc>,
}

impl RollbackAuditEntry {
    pub fn new(application_id: ApplicationId, proposal_id: ProposalId, reason: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            schema_version: crate::ids::SCHEMA_VERSION,
            application_id,
            proposal_id,
            reason: reason.into(),
            detail: detail.into(),
            rolled_back_at: Utc::now(),
        }
    }
}
