use crate::error::PolicyError;
use async_trait::async_trait;
use evolution_types::Proposal;

/// External reviewer consulted for high-risk (or council-required
/// medium-risk) proposals. Mirrors the donor's `ApprovalManager` shape:
/// an injectable async capability with no production default wired in —
/// callers pass `None` unless they have a real council to ask.
#[async_trait]
pub trait CouncilOracle: Send + Sync {
    /// `Ok(true)` approves, `Ok(false)` rejects. Errors are caught by the
    /// caller and downgraded to `escalated`, never fatal.
    async fn consult(&self, proposal: &Proposal) -> Result<bool, PolicyError>;
}

/// Fixed-answer oracle for tests.
pub struct SimulatedCouncilOracle {
    approve: bool,
}

impl SimulatedCouncilOracle {
    pub fn always_approve() -> Self {
        Self { approve: true }
    }

    pub fn always_reject() -> Self {
        Self { approve: false }
    }
}

#[async_trait]
impl CouncilOracle for SimulatedCouncilOracle {
    async fn consult(&self, _proposal: &Proposal) -> Result<bool, PolicyError> {
        Ok(self.approve)
    }
}

/// An oracle that always fails, for exercising the escalation-on-error path.
pub struct UnavailableCouncilOracle;

#[async_trait]
impl CouncilOracle for UnavailableCouncilOracle {
    async fn consult(&self, _proposal: &Proposal) -> Result<bool, PolicyError> {
        Err(PolicyError::CouncilUnavailable("simulated outage".into()))
    }
}
