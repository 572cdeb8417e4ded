use crate::ids::{ApplicationId, ProposalId, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A point-in-time snapshot of assistant performance, taken once right before
/// an application and again (later, possibly by another subsystem) after it.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    pub success_rate: f64,
    pub average_cost: f64,
    pub average_duration_ms: f64,
    pub task_count: u64,
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApplicationStatus {
    Monitoring,
    Degraded,
    RolledBack,
    Retained,
}

/// Produced by the Executor on each application attempt. Persisted as one
/// line of `applications/log.jsonl`.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ApplicationEvent {
    pub schema_version: u32,
    pub id: ApplicationId,
    pub proposal_id: ProposalId,
    pub affected_targets: Vec<String>,
    pub pre_metrics: MetricsSnapshot,
    pub post_metrics: Option<MetricsSnapshot>,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl ApplicationEvent {
    pub fn new(proposal_id: ProposalId, affected_targets: Vec<String>, pre_metrics: MetricsSnapshot) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            id: ApplicationId::generate(),
            proposal_id,
            affected_targets,
            pre_metrics,
            post_metrics: None,
            status: ApplicationStatus::Monitoring,
            created_at: Utc::now(),
        }
    }
}
