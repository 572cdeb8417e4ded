use crate::proposal::{ProposalCategory, RiskLevel, Scope};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AutonomyLevel {
    Manual = 0,
    Assisted = 1,
    Auto = 2,
}

impl AutonomyLevel {
    pub fn from_u8(v: u8) -> Option<Self> {
        match v {
            0 => Some(AutonomyLevel::Manual),
            1 => Some(AutonomyLevel::Assisted),
            2 => Some(AutonomyLevel::Auto),
            _ => None,
        }
    }

    /// Highest risk level this autonomy level may auto-approve, if any.
    pub fn max_auto_risk(&self) -> Option<RiskLevel> {
        match self {
            AutonomyLevel::Manual => None,
            AutonomyLevel::Assisted => Some(RiskLevel::Low),
            AutonomyLevel::Auto => Some(RiskLevel::Medium),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityOrder {
    Age,
    Impact,
    Risk,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct QuietHours {
    pub enabled: bool,
    pub start_hour: u8,
    pub end_hour: u8,
}

impl QuietHours {
    /// Whether `hour` (0-23, local time) falls inside the configured window.
    /// `start > end` wraps across midnight; only the hour component matters.
    pub fn contains(&self, hour: u8) -> bool {
        if !self.enabled {
            return false;
        }
        if self.start_hour <= self.end_hour {
            hour >= self.start_hour && hour < self.end_hour
        } else {
            hour >= self.start_hour || hour < self.end_hour
        }
    }
}

impl Default for QuietHours {
    fn default() -> Self {
        Self {
            enabled: false,
            start_hour: 22,
            end_hour: 6,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleAction {
    Approve,
    Defer,
    Reject,
    Escalate,
}

/// A predicate over a proposal + assessment. Every `Some` field must match
/// for the rule to fire; `None` means "don't care".
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RuleCondition {
    pub categories: Option<Vec<ProposalCategory>>,
    pub max_risk_level: Option<RiskLevel>,
    pub min_confidence: Option<f64>,
    pub max_affected_targets: Option<usize>,
    pub scope: Option<Scope>,
}

/// Operator-supplied predicate/action that short-circuits the default
/// decision path. Lower `priority` is evaluated earlier.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct CustomRule {
    pub id: String,
    pub priority: i32,
    pub condition: RuleCondition,
    pub action: RuleAction,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SelfHealConfig {
    pub success_rate_drop_pct: f64,
    pub cost_increase_pct: f64,
    pub duration_increase_pct: f64,
    pub min_tasks_for_evaluation: u64,
    pub monitoring_period_ms: u64,
    pub max_daily_rollbacks: u64,
}

impl Default for SelfHealConfig {
    fn default() -> Self {
        Self {
            success_rate_drop_pct: 15.0,
            cost_increase_pct: 50.0,
            duration_increase_pct: 50.0,
            min_tasks_for_evaluation: 5,
            monitoring_period_ms: 30 * 60 * 1000,
            max_daily_rollbacks: 3,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub enabled: bool,
    pub dry_run: bool,
    pub autonomy_level: u8,
    pub min_confidence: f64,
    pub require_council_for_medium: bool,
    pub daily_limit: u64,
    pub max_per_cycle: usize,
    pub interval_ms: u64,
    pub batch_size: usize,
    pub priority_order: PriorityOrder,
    pub quiet_hours: QuietHours,
    pub max_age_ms: i64,
    pub create_backups: bool,
    pub backup_dir: String,
    pub max_backups: usize,
    pub rollback_on_failure: bool,
    pub per_application_timeout_ms: u64,
    pub self_heal: SelfHealConfig,
    pub custom_rules: Vec<CustomRule>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            dry_run: false,
            autonomy_level: 1,
            min_confidence: 0.6,
            require_council_for_medium: false,
            daily_limit: 20,
            max_per_cycle: 5,
            interval_ms: 60_000,
            batch_size: 5,
            priority_order: PriorityOrder::Age,
            quiet_hours: QuietHours::default(),
            max_age_ms: 7 * 24 * 60 * 60 * 1000,
            create_backups: true,
            backup_dir: "backups".to_string(),
            max_backups: 20,
            rollback_on_failure: true,
            per_application_timeout_ms: 30_000,
            self_heal: SelfHealConfig::default(),
            custom_rules: Vec::new(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("interval_ms must be greater than zero")]
    ZeroInterval,
    #[error("batch_size must be greater than zero")]
    ZeroBatchSize,
    #[error("autonomy_level must be 0, 1, or 2, got {0}")]
    InvalidAutonomyLevel(u8),
    #[error("quiet_hours.{field} must be in 0..=23, got {value}")]
    InvalidQuietHour { field: &'static str, value: u8 },
    #[error("min_confidence must be in [0,1], got {0}")]
    InvalidMinConfidence(f64),
    #[error("custom rule '{0}' has an empty id")]
    EmptyRuleId(String),
}

impl EngineConfig {
    /// Validate at load time; refuse to start on any contradiction rather
    /// than silently falling back to a default.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.interval_ms == 0 {
            return Err(ConfigError::ZeroInterval);
        }
        if self.batch_size == 0 {
            return Err(ConfigError::ZeroBatchSize);
        }
        if AutonomyLevel::from_u8(self.autonomy_level).is_none() {
            return Err(ConfigError::InvalidAutonomyLevel(self.autonomy_level));
        }
        if self.quiet_hours.start_hour > 23 {
            return Err(ConfigError::InvalidQuietHour {
                field: "startHour",
                value: self.quiet_hours.start_hour,
            });
        }
        if self.quiet_hours.end_hour > 23 {
            return Err(ConfigError::InvalidQuietHour {
                field: "endHour",
                value: self.quiet_hours.end_hour,
            });
        }
        if !(0.0..=1.0).contains(&self.min_confidence) {
            return Err(ConfigError::InvalidMinConfidence(self.min_confidence));
        }
        for rule in &self.custom_rules {
            if rule.id.trim().is_empty() {
                return Err(ConfigError::EmptyRuleId(rule.id.clone()));
            }
        }
        Ok(())
    }

    pub fn autonomy_level(&self) -> AutonomyLevel {
        AutonomyLevel::from_u8(self.autonomy_level).unwrap_or(AutonomyLevel::Manual)
    }
}
