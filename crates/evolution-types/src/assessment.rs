use crate::ids::ProposalId;
use crate::proposal::RiskLevel;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One named input to a risk score: its configured weight, the normalized
/// value in `[0,1]` observed for this proposal, and a short human-readable
/// explanation surfaced to reviewers.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Factor {
    pub name: String,
    pub weight: f64,
    pub value: f64,
    pub explanation: String,
}

/// Output of the Risk Scorer. Immutable once produced and never persisted —
/// it is always regenerated from history at the point of use.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Assessment {
    pub proposal_id: ProposalId,
    pub risk_level: RiskLevel,
    pub risk_score: f64,
    pub confidence: f64,
    pub factors: Vec<Factor>,
    pub recommendations: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

impl Assessment {
    pub fn factor(&self, name: &str) -> Option<&Factor> {
        self.factors.iter().find(|f| f.name == name)
    }
}
