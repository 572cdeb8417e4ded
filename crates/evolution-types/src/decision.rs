use crate::ids::ProposalId;
use crate::proposal::RiskLevel;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionOutcome {
    Approved,
    Deferred,
    Rejected,
    Escalated,
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecisionOutcome::Approved => write!(f, "approved"),
            DecisionOutcome::Deferred => write!(f, "deferred"),
            DecisionOutcome::Rejected => write!(f, "rejected"),
            DecisionOutcome::Escalated => write!(f, "escalated"),
        }
    }
}

/// Output of the Decision Policy. Immutable; produced fresh for every
/// evaluation, never persisted independently of the proposal it concerns.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub proposal_id: ProposalId,
    pub outcome: DecisionOutcome,
    pub reason: String,
    pub automatic: bool,
    pub risk_level: RiskLevel,
    pub confidence: f64,
    pub matched_rule_id: Option<String>,
}

impl Decision {
    pub fn new(proposal_id: ProposalId, outcome: DecisionOutcome, reason: impl Into<String>, automatic: bool, risk_level: RiskLevel, confidence: f64) -> Self {
        Self {
            proposal_id,
            outcome,
            reason: reason.into(),
            automatic,
            risk_level,
            confidence,
            matched_rule_id: None,
        }
    }

    pub fn with_rule(mut self, rule_id: impl Into<String>) -> Self {
        self.matched_rule_id = Some(rule_id.into());
        self
    }
}
