//! Pure risk scoring: (proposal, historical context) -> Assessment.
//!
//! No I/O, no async. Callers gather the `HistoryView` from the State Store
//! once per tick and pass it in; the scorer itself never fails.

use chrono::Utc;
use evolution_types::{Assessment, Factor, Proposal, ProposalCategory, RiskLevel, Scope};

/// Historical context for one category, read-only and snapshotted by the
/// caller at call time (the Scheduler's tick owns consistency, not this
/// crate).
#[derive(Clone, Copy, Debug, Default)]
pub struct CategoryHistory {
    pub sample_count: u64,
    pub success_rate: f64,
    pub override_sample_count: u64,
    pub override_rate: f64,
}

/// Tunables the engine config exposes; everything else in the weight table
/// is a fixed constant, matching the donor's `GovernanceTierEngine`
/// (stepwise cascade, no per-call configuration of the cascade itself).
#[derive(Clone, Copy, Debug)]
pub struct RiskScorerConfig {
    pub max_safe_file_count: usize,
    pub min_confidence_floor: f64,
}

impl Default for RiskScorerConfig {
    fn default() -> Self {
        Self {
            max_safe_file_count: 3,
            min_confidence_floor: 0.5,
        }
    }
}

const WEIGHT_CATEGORY: f64 = 0.30;
const WEIGHT_SCOPE: f64 = 0.20;
const WEIGHT_TARGET_COUNT: f64 = 0.20;
const WEIGHT_HISTORICAL_SUCCESS: f64 = 0.15;
const WEIGHT_OVERRIDE_RATE: f64 = 0.15;

fn category_base(category: ProposalCategory) -> f64 {
    match category {
        ProposalCategory::RuleAdd => 0.25,
        ProposalCategory::PromptRefinement => 0.25,
        ProposalCategory::ModeInstruction => 0.50,
        ProposalCategory::ConfigUpdate => 0.50,
        ProposalCategory::SkillCreation => 0.85,
    }
}

fn scope_value(scope: Scope) -> f64 {
    match scope {
        Scope::Project => 0.2,
        Scope::Global => 0.8,
    }
}

fn scope_label(scope: Scope) -> &'static str {
    match scope {
        Scope::Project => "project",
        Scope::Global => "global",
    }
}

/// Stepwise, not linear: crossing `max_safe_file_count` jumps the value up a
/// full band rather than creeping proportionally with count.
fn target_count_value(count: usize, max_safe: usize) -> f64 {
    let max_safe = max_safe.max(1);
    if count <= 1 {
        0.2
    } else if count < max_safe {
        0.3
    } else if count == max_safe {
        0.4
    } else if count <= max_safe * 2 {
        0.7
    } else {
        1.0
    }
}

fn historical_success_value(history: CategoryHistory) -> f64 {
    if history.sample_count < 3 {
        0.5
    } else {
        1.0 - history.success_rate
    }
}

fn override_rate_value(history: CategoryHistory) -> f64 {
    if history.override_sample_count == 0 {
        0.5
    } else {
        history.override_rate
    }
}

fn risk_level_for(score: f64) -> RiskLevel {
    if score <= 0.33 {
        RiskLevel::Low
    } else if score <= 0.66 {
        RiskLevel::Medium
    } else {
        RiskLevel::High
    }
}

fn variance(values: &[f64]) -> f64 {
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / values.len() as f64
}

fn confidence_for(history: CategoryHistory, factor_values: &[f64], floor: f64) -> f64 {
    let mut confidence = 0.7;
    confidence += match history.sample_count {
        n if n >= 10 => 0.15,
        n if n >= 5 => 0.10,
        n if n >= 3 => 0.05,
        _ => 0.0,
    };
    let v = variance(factor_values);
    confidence += if v < 0.05 {
        0.10
    } else if v < 0.15 {
        0.05
    } else {
        0.0
    };
    confidence.min(0.95).max(floor)
}

/// Score `proposal` against `history`, producing an `Assessment`. Never
/// fails: unrecognized history is treated as "no history" via the neutral
/// defaults baked into each factor.
pub fn assess(proposal: &Proposal, history: CategoryHistory, config: RiskScorerConfig) -> Assessment {
    let category = proposal.category();
    let scope = proposal.payload.scope();
    let target_count = proposal.payload.affected_targets().len();

    let category_v = category_base(category);
    let scope_v = scope_value(scope);
    let targets_v = target_count_value(target_count, config.max_safe_file_count);
    let history_v = historical_success_value(history);
    let override_v = override_rate_value(history);

    let weighted_sum = category_v * WEIGHT_CATEGORY
        + scope_v * WEIGHT_SCOPE
        + targets_v * WEIGHT_TARGET_COUNT
        + history_v * WEIGHT_HISTORICAL_SUCCESS
        + override_v * WEIGHT_OVERRIDE_RATE;
    let total_weight = WEIGHT_CATEGORY + WEIGHT_SCOPE + WEIGHT_TARGET_COUNT + WEIGHT_HISTORICAL_SUCCESS + WEIGHT_OVERRIDE_RATE;
    let score = weighted_sum / total_weight;

    let factor_values = [category_v, scope_v, targets_v, history_v, override_v];
    let confidence = confidence_for(history, &factor_values, config.min_confidence_floor);

    let factors = vec![
        Factor {
            name: "category".into(),
            weight: WEIGHT_CATEGORY,
            value: category_v,
            explanation: format!("{category} carries a baseline risk of {category_v:.2}"),
        },
        Factor {
            name: "scope".into(),
            weight: WEIGHT_SCOPE,
            value: scope_v,
            explanation: format!("{} scope", scope_label(scope)),
        },
        Factor {
            name: "affected_target_count".into(),
            weight: WEIGHT_TARGET_COUNT,
            value: targets_v,
            explanation: format!(
                "{target_count} affected target(s) against a safe count of {}",
                config.max_safe_file_count
            ),
        },
        Factor {
            name: "historical_success_rate".into(),
            weight: WEIGHT_HISTORICAL_SUCCESS,
            value: history_v,
            explanation: if history.sample_count < 3 {
                format!("only {} historical sample(s), treated as neutral", history.sample_count)
            } else {
                format!("{:.0}% historical success over {} samples", history.success_rate * 100.0, history.sample_count)
            },
        },
        Factor {
            name: "override_rate".into(),
            weight: WEIGHT_OVERRIDE_RATE,
            value: override_v,
            explanation: if history.override_sample_count == 0 {
                "no override history, treated as neutral".to_string()
            } else {
                format!("{:.0}% override rate over last 30 days", history.override_rate * 100.0)
            },
        },
    ];

    let mut recommendations = Vec::new();
    if targets_v > 0.6 {
        recommendations.push("consider splitting this proposal into smaller batches".to_string());
    }
    if history_v > 0.5 && history.sample_count >= 3 {
        recommendations.push(format!("{category} has underperformed historically; review before approving"));
    }
    if override_v > 0.5 {
        recommendations.push("users have frequently overridden this category recently".to_string());
    }

    Assessment {
        proposal_id: proposal.id,
        risk_level: risk_level_for(score),
        risk_score: score,
        confidence,
        factors,
        recommendations,
        timestamp: Utc::now(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolution_types::{ProposalPayload, RiskLevel as RL};

    fn rule_add(target_count: usize) -> Proposal {
        let targets = (0..target_count.max(1)).map(|i| format!("rule-{i}.md")).collect::<Vec<_>>();
        // RuleAdd always reports exactly one affected target regardless of
        // the loop above; construct SkillCreation-style payloads instead
        // when more than one target is needed.
        let _ = targets;
        Proposal::new(
            "t",
            "d",
            RL::Low,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Project,
            },
        )
    }

    fn skill_creation() -> Proposal {
        Proposal::new(
            "t",
            "d",
            RL::Medium,
            ProposalPayload::SkillCreation {
                scope_dir: "skills/new-skill".into(),
                metadata: "{}".into(),
                implementation: "fn run() {}".into(),
                scope: Scope::Global,
            },
        )
    }

    #[test]
    fn low_risk_rule_add_with_no_history() {
        let proposal = rule_add(1);
        let assessment = assess(&proposal, CategoryHistory::default(), RiskScorerConfig::default());
        assert_eq!(assessment.risk_level, RiskLevel::Low);
        assert!(assessment.confidence >= 0.7 && assessment.confidence <= 0.95);
    }

    #[test]
    fn target_count_exactly_at_safe_threshold_is_medium_not_high() {
        let proposal = skill_creation(); // reports exactly 2 affected targets
        let config = RiskScorerConfig { max_safe_file_count: 2, ..Default::default() };
        let assessment = assess(&proposal, CategoryHistory::default(), config);
        assert_eq!(assessment.risk_level, RiskLevel::Medium);
    }

    #[test]
    fn fewer_than_three_samples_uses_neutral_historical_value() {
        let proposal = rule_add(1);
        let history = CategoryHistory {
            sample_count: 2,
            success_rate: 1.0,
            ..Default::default()
        };
        let assessment = assess(&proposal, history, RiskScorerConfig::default());
        let factor = assessment.factors.iter().find(|f| f.name == "historical_success_rate").unwrap();
        assert_eq!(factor.value, 0.5);
    }

    #[test]
    fn global_scope_scores_higher_than_project_scope() {
        let project = rule_add(1);
        let global = Proposal::new(
            "t",
            "d",
            RL::Low,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Global,
            },
        );
        let a = assess(&project, CategoryHistory::default(), RiskScorerConfig::default());
        let b = assess(&global, CategoryHistory::default(), RiskScorerConfig::default());
        assert!(b.risk_score > a.risk_score);
    }

    #[test]
    fn many_historical_samples_raise_confidence_ceiling() {
        let proposal = rule_add(1);
        let history = CategoryHistory {
            sample_count: 10,
            success_rate: 0.95,
            override_sample_count: 10,
            override_rate: 0.0,
        };
        let assessment = assess(&proposal, history, RiskScorerConfig::default());
        assert!(assessment.confidence <= 0.95);
        assert!(assessment.confidence > 0.7);
    }

    #[test]
    fn confidence_never_drops_below_configured_floor() {
        let proposal = rule_add(1);
        let config = RiskScorerConfig { min_confidence_floor: 0.9, ..Default::default() };
        let assessment = assess(&proposal, CategoryHistory::default(), config);
        assert!(assessment.confidence >= 0.9);
    }
}
