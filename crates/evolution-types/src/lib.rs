//! Shared data model for the Evolution Engine.
//!
//! Every persisted entity the engine works with — proposals, assessments,
//! decisions, rollback records, application events, signals, counters, and
//! the validated engine configuration — lives here so every other crate in
//! the workspace depends on one definition of each.

pub mod application;
pub mod assessment;
pub mod config;
pub mod counters;
pub mod decision;
pub mod ids;
pub mod proposal;
pub mod rollback;
pub mod signal;

pub use application::{ApplicationEvent, ApplicationStatus, MetricsSnapshot};
pub use assessment::{Assessment, Factor};
pub use config::{
    AutonomyLevel, ConfigError, CustomRule, EngineConfig, PriorityOrder, QuietHours, RuleAction,
    RuleCondition, SelfHealConfig,
};
pub use counters::{Counters, HealthStatus};
pub use decision::{Decision, DecisionOutcome};
pub use ids::{ApplicationId, ProposalId, SignalId, SCHEMA_VERSION};
pub use proposal::{
    InvalidTransition, Proposal, ProposalCategory, ProposalPayload, ProposalReview,
    ProposalStatus, RiskLevel, Scope,
};
pub use rollback::{InverseOperation, RollbackAuditEntry, RollbackRecord};
pub use signal::Signal;
