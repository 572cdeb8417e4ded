use crate::ids::{ProposalId, SCHEMA_VERSION};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The five remediation categories the Applicator knows how to translate.
///
/// Re-architected from the source's dynamic "any record" payload into a
/// tagged variant: the Applicator dispatches on this tag and unknown tags
/// deterministically fail rather than silently deferring (see `ProposalPayload`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalCategory {
    RuleAdd,
    ModeInstruction,
    SkillCreation,
    ConfigUpdate,
    PromptRefinement,
}

impl ProposalCategory {
    pub fn all() -> [ProposalCategory; 5] {
        [
            ProposalCategory::RuleAdd,
            ProposalCategory::ModeInstruction,
            ProposalCategory::SkillCreation,
            ProposalCategory::ConfigUpdate,
            ProposalCategory::PromptRefinement,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ProposalCategory::RuleAdd => "rule-add",
            ProposalCategory::ModeInstruction => "mode-instruction",
            ProposalCategory::SkillCreation => "skill-creation",
            ProposalCategory::ConfigUpdate => "config-update",
            ProposalCategory::PromptRefinement => "prompt-refinement",
        }
    }
}

impl std::fmt::Display for ProposalCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl std::fmt::Display for RiskLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RiskLevel::Low => write!(f, "low"),
            RiskLevel::Medium => write!(f, "medium"),
            RiskLevel::High => write!(f, "high"),
        }
    }
}

/// Whether a proposal's targets live inside the current project or affect the
/// operator's global configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scope {
    Project,
    Global,
}

/// The tagged payload a proposal carries. Only the Applicator interprets the
/// contents; every other component treats it as opaque aside from the
/// `scope`/`affected_targets` views below.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "kebab-case")]
pub enum ProposalPayload {
    RuleAdd {
        target: String,
        rule_text: String,
        scope: Scope,
    },
    ModeInstruction {
        mode_slug: String,
        target: String,
        instructions_text: String,
        scope: Scope,
    },
    SkillCreation {
        scope_dir: String,
        metadata: String,
        implementation: String,
        scope: Scope,
    },
    ConfigUpdate {
        key: String,
        value: String,
        scope: Scope,
    },
    PromptRefinement {
        mode_slug: String,
        target: String,
        refinement_text: String,
        scope: Scope,
    },
}

impl ProposalPayload {
    pub fn category(&self) -> ProposalCategory {
        match self {
            ProposalPayload::RuleAdd { .. } => ProposalCategory::RuleAdd,
            ProposalPayload::ModeInstruction { .. } => ProposalCategory::ModeInstruction,
            ProposalPayload::SkillCreation { .. } => ProposalCategory::SkillCreation,
            ProposalPayload::ConfigUpdate { .. } => ProposalCategory::ConfigUpdate,
            ProposalPayload::PromptRefinement { .. } => ProposalCategory::PromptRefinement,
        }
    }

    pub fn scope(&self) -> Scope {
        match self {
            ProposalPayload::RuleAdd { scope, .. }
            | ProposalPayload::ModeInstruction { scope, .. }
            | ProposalPayload::SkillCreation { scope, .. }
            | ProposalPayload::ConfigUpdate { scope, .. }
            | ProposalPayload::PromptRefinement { scope, .. } => *scope,
        }
    }

    /// Target identifiers this payload would mutate. `skill-creation` writes
    /// two artifacts; every other category writes (or records) exactly one.
    pub fn affected_targets(&self) -> Vec<String> {
        match self {
            ProposalPayload::RuleAdd { target, .. } => vec![target.clone()],
            ProposalPayload::ModeInstruction { target, .. } => vec![target.clone()],
            ProposalPayload::SkillCreation { scope_dir, .. } => vec![
                format!("{scope_dir}/metadata.json"),
                format!("{scope_dir}/implementation"),
            ],
            ProposalPayload::ConfigUpdate { key, .. } => vec![format!("config:{key}")],
            ProposalPayload::PromptRefinement { target, .. } => vec![target.clone()],
        }
    }
}

/// Status of a proposal. `rejected`, `failed`, and `rolled-back` are terminal;
/// `escalated` and `deferred` fold back into `pending` (see the state machine
/// in the Applicator's documentation) since the scheduler retries them.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Applied,
    Failed,
    Rejected,
    RolledBack,
}

impl ProposalStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            ProposalStatus::Rejected | ProposalStatus::Failed | ProposalStatus::RolledBack
        )
    }

    /// Whether `self -> next` is a legal edge in the proposal state machine.
    pub fn can_transition_to(&self, next: ProposalStatus) -> bool {
        use ProposalStatus::*;
        matches!(
            (self, next),
            (Pending, Approved)
                | (Pending, Rejected)
                | (Pending, Pending) // escalated / deferred re-annotate, status unchanged
                | (Pending, Applied) // executor approves and applies within one call, no persisted "approved" stop
                | (Pending, Failed)
                | (Approved, Applied)
                | (Approved, Failed)
                | (Applied, RolledBack)
                | (Applied, Applied) // monitor-ok: re-confirmed, terminal from monitor's view
        )
    }
}

#[derive(Debug, thiserror::Error)]
#[error("invalid proposal transition: {from:?} -> {to:?}")]
pub struct InvalidTransition {
    pub from: ProposalStatus,
    pub to: ProposalStatus,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ProposalReview {
    pub reviewer: String,
    pub notes: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Proposal {
    pub schema_version: u32,
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub declared_risk: RiskLevel,
    pub payload: ProposalPayload,
    pub source_signal_id: Option<crate::ids::SignalId>,
    pub status: ProposalStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub review: Option<ProposalReview>,
    pub rollback_record_id: Option<ApplicationId>,
}

use crate::ids::ApplicationId;

impl Proposal {
    pub fn new(title: impl Into<String>, description: impl Into<String>, declared_risk: RiskLevel, payload: ProposalPayload) -> Self {
        let now = Utc::now();
        Self {
            schema_version: SCHEMA_VERSION,
            id: ProposalId::generate(),
            title: title.into(),
            description: description.into(),
            declared_risk,
            payload,
            source_signal_id: None,
            status: ProposalStatus::Pending,
            created_at: now,
            updated_at: now,
            review: None,
            rollback_record_id: None,
        }
    }

    pub fn category(&self) -> ProposalCategory {
        self.payload.category()
    }

    /// Apply a status transition, validating it against the state machine.
    /// `applied` is refused unless the caller already attached a rollback
    /// record id, matching the invariant that `applied` implies a non-empty
    /// rollback record.
    pub fn transition(&mut self, next: ProposalStatus) -> Result<(), InvalidTransition> {
        if !self.status.can_transition_to(next) {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        if next == ProposalStatus::Applied && self.rollback_record_id.is_none() {
            return Err(InvalidTransition {
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Proposal {
        Proposal::new(
            "add a lint rule",
            "append a rule",
            RiskLevel::Low,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "always use snake_case".into(),
                scope: Scope::Project,
            },
        )
    }

    #[test]
    fn pending_to_approved_is_legal() {
        let mut p = sample();
        assert!(p.transition(ProposalStatus::Approved).is_ok());
        assert_eq!(p.status, ProposalStatus::Approved);
    }

    #[test]
    fn applied_requires_rollback_record() {
        let mut p = sample();
        p.transition(ProposalStatus::Approved).unwrap();
        assert!(p.transition(ProposalStatus::Applied).is_err());
        p.rollback_record_id = Some(ApplicationId::generate());
        assert!(p.transition(ProposalStatus::Applied).is_ok());
    }

    #[test]
    fn terminal_states_reject_further_transitions() {
        let mut p = sample();
        p.transition(ProposalStatus::Rejected).unwrap();
        assert!(p.status.is_terminal());
        assert!(p.transition(ProposalStatus::Approved).is_err());
    }

    #[test]
    fn rolled_back_only_from_applied() {
        let mut p = sample();
        assert!(!p.status.can_transition_to(ProposalStatus::RolledBack));
        p.transition(ProposalStatus::Approved).unwrap();
        p.rollback_record_id = Some(ApplicationId::generate());
        p.transition(ProposalStatus::Applied).unwrap();
        assert!(p.transition(ProposalStatus::RolledBack).is_ok());
    }

    #[test]
    fn affected_targets_skill_creation_has_two() {
        let payload = ProposalPayload::SkillCreation {
            scope_dir: "skills/foo".into(),
            metadata: "{}".into(),
            implementation: "fn run() {}".into(),
            scope: Scope::Project,
        };
        assert_eq!(payload.affected_targets().len(), 2);
    }
}
