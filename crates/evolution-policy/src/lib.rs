//! Decision policy: maps a proposal + assessment + configuration to a
//! `Decision`. Pure aside from the optional council consult, which is the
//! only fallible, async step.

mod error;
mod oracle;

pub use error::PolicyError;
pub use oracle::{CouncilOracle, SimulatedCouncilOracle, UnavailableCouncilOracle};

use evolution_types::{
    Assessment, CustomRule, Decision, DecisionOutcome, EngineConfig, Proposal, RiskLevel,
    RuleAction, RuleCondition,
};
use std::sync::Arc;

fn matches(condition: &RuleCondition, proposal: &Proposal, assessment: &Assessment) -> bool {
    if let Some(categories) = &condition.categories {
        if !categories.contains(&proposal.category()) {
            return false;
        }
    }
    if let Some(max_risk) = condition.max_risk_level {
        if assessment.risk_level > max_risk {
            return false;
        }
    }
    if let Some(min_confidence) = condition.min_confidence {
        if assessment.confidence < min_confidence {
            return false;
        }
    }
    if let Some(max_targets) = condition.max_affected_targets {
        if proposal.payload.affected_targets().len() > max_targets {
            return false;
        }
    }
    if let Some(scope) = condition.scope {
        if proposal.payload.scope() != scope {
            return false;
        }
    }
    true
}

fn decision_for_rule(rule: &CustomRule, proposal: &Proposal, assessment: &Assessment) -> Decision {
    let outcome = match rule.action {
        RuleAction::Approve => DecisionOutcome::Approved,
        RuleAction::Defer => DecisionOutcome::Deferred,
        RuleAction::Reject => DecisionOutcome::Rejected,
        RuleAction::Escalate => DecisionOutcome::Escalated,
    };
    Decision::new(
        proposal.id,
        outcome,
        format!("matched custom rule '{}'", rule.id),
        false,
        assessment.risk_level,
        assessment.confidence,
    )
    .with_rule(rule.id.clone())
}

/// Evaluate the decision-policy cascade in §4.3 order: disabled -> dry-run ->
/// custom rules -> autonomy check -> confidence floor -> approved.
pub async fn decide(
    proposal: &Proposal,
    assessment: &Assessment,
    config: &EngineConfig,
    council: Option<Arc<dyn CouncilOracle>>,
) -> Decision {
    if !config.enabled {
        return Decision::new(proposal.id, DecisionOutcome::Deferred, "disabled", false, assessment.risk_level, assessment.confidence);
    }
    if config.dry_run {
        return Decision::new(proposal.id, DecisionOutcome::Deferred, "dry-run", false, assessment.risk_level, assessment.confidence);
    }

    let mut custom_rules: Vec<&CustomRule> = config.custom_rules.iter().collect();
    custom_rules.sort_by_key(|r| r.priority);
    for rule in custom_rules {
        if matches(&rule.condition, proposal, assessment) {
            return decision_for_rule(rule, proposal, assessment);
        }
    }

    let autonomy = config.autonomy_level();
    let max_auto_risk = autonomy.max_auto_risk();
    let exceeds_tolerance = match max_auto_risk {
        None => true,
        Some(max) => assessment.risk_level > max,
    };

    if exceeds_tolerance {
        let needs_council = assessment.risk_level == RiskLevel::High
            || (assessment.risk_level == RiskLevel::Medium && config.require_council_for_medium);

        if needs_council {
            return match council {
                Some(oracle) => match oracle.consult(proposal).await {
                    Ok(true) => Decision::new(
                        proposal.id,
                        DecisionOutcome::Approved,
                        "approved by council",
                        false,
                        assessment.risk_level,
                        assessment.confidence,
                    ),
                    Ok(false) => Decision::new(
                        proposal.id,
                        DecisionOutcome::Rejected,
                        "rejected by council",
                        false,
                        assessment.risk_level,
                        assessment.confidence,
                    ),
                    Err(e) => {
                        tracing::warn!(error = %e, "council oracle failed, escalating");
                        Decision::new(
                            proposal.id,
                            DecisionOutcome::Escalated,
                            format!("council unreachable: {e}"),
                            false,
                            assessment.risk_level,
                            assessment.confidence,
                        )
                    }
                },
                None => Decision::new(
                    proposal.id,
                    DecisionOutcome::Escalated,
                    "no council configured for a decision requiring one",
                    false,
                    assessment.risk_level,
                    assessment.confidence,
                ),
            };
        }

        return Decision::new(
            proposal.id,
            DecisionOutcome::Deferred,
            format!(
                "{} risk exceeds autonomy level {:?}'s tolerance",
                assessment.risk_level, autonomy
            ),
            false,
            assessment.risk_level,
            assessment.confidence,
        );
    }

    if assessment.confidence < config.min_confidence {
        return Decision::new(
            proposal.id,
            DecisionOutcome::Deferred,
            format!("confidence {:.2} below floor {:.2}", assessment.confidence, config.min_confidence),
            false,
            assessment.risk_level,
            assessment.confidence,
        );
    }

    Decision::new(
        proposal.id,
        DecisionOutcome::Approved,
        "within autonomy envelope",
        true,
        assessment.risk_level,
        assessment.confidence,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evolution_types::{Factor, ProposalPayload, Scope};

    fn proposal(category_payload: ProposalPayload, declared_risk: RiskLevel) -> Proposal {
        Proposal::new("t", "d", declared_risk, category_payload)
    }

    fn assessment(proposal: &Proposal, risk: RiskLevel, confidence: f64) -> Assessment {
        Assessment {
            proposal_id: proposal.id,
            risk_level: risk,
            risk_score: 0.5,
            confidence,
            factors: vec![Factor {
                name: "test".into(),
                weight: 1.0,
                value: 0.5,
                explanation: "test".into(),
            }],
            recommendations: vec![],
            timestamp: Utc::now(),
        }
    }

    fn rule_add_proposal(risk: RiskLevel) -> Proposal {
        proposal(
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Project,
            },
            risk,
        )
    }

    #[tokio::test]
    async fn disabled_engine_defers_everything() {
        let p = rule_add_proposal(RiskLevel::Low);
        let a = assessment(&p, RiskLevel::Low, 0.9);
        let mut config = EngineConfig::default();
        config.enabled = false;
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Deferred);
        assert_eq!(decision.reason, "disabled");
    }

    #[tokio::test]
    async fn dry_run_defers_even_low_risk() {
        let p = rule_add_proposal(RiskLevel::Low);
        let a = assessment(&p, RiskLevel::Low, 0.9);
        let mut config = EngineConfig::default();
        config.dry_run = true;
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Deferred);
        assert_eq!(decision.reason, "dry-run");
    }

    #[tokio::test]
    async fn low_risk_at_assisted_autonomy_is_approved() {
        let p = rule_add_proposal(RiskLevel::Low);
        let a = assessment(&p, RiskLevel::Low, 0.7);
        let config = EngineConfig { autonomy_level: 1, min_confidence: 0.5, ..Default::default() };
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Approved);
        assert!(decision.automatic);
    }

    #[tokio::test]
    async fn medium_risk_at_assisted_autonomy_defers() {
        let p = rule_add_proposal(RiskLevel::Medium);
        let a = assessment(&p, RiskLevel::Medium, 0.9);
        let config = EngineConfig { autonomy_level: 1, require_council_for_medium: false, ..Default::default() };
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Deferred);
    }

    #[tokio::test]
    async fn high_risk_without_council_escalates() {
        let p = rule_add_proposal(RiskLevel::High);
        let a = assessment(&p, RiskLevel::High, 0.9);
        let config = EngineConfig::default();
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Escalated);
    }

    #[tokio::test]
    async fn high_risk_with_approving_council_is_approved() {
        let p = rule_add_proposal(RiskLevel::High);
        let a = assessment(&p, RiskLevel::High, 0.9);
        let config = EngineConfig::default();
        let oracle: Arc<dyn CouncilOracle> = Arc::new(SimulatedCouncilOracle::always_approve());
        let decision = decide(&p, &a, &config, Some(oracle)).await;
        assert_eq!(decision.outcome, DecisionOutcome::Approved);
        assert!(!decision.automatic);
    }

    #[tokio::test]
    async fn unreachable_council_escalates_never_approves() {
        let p = rule_add_proposal(RiskLevel::High);
        let a = assessment(&p, RiskLevel::High, 0.9);
        let config = EngineConfig::default();
        let oracle: Arc<dyn CouncilOracle> = Arc::new(UnavailableCouncilOracle);
        let decision = decide(&p, &a, &config, Some(oracle)).await;
        assert_eq!(decision.outcome, DecisionOutcome::Escalated);
    }

    #[tokio::test]
    async fn low_confidence_defers_even_when_risk_eligible() {
        let p = rule_add_proposal(RiskLevel::Low);
        let a = assessment(&p, RiskLevel::Low, 0.1);
        let config = EngineConfig { autonomy_level: 1, min_confidence: 0.5, ..Default::default() };
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Deferred);
    }

    #[tokio::test]
    async fn matching_custom_rule_short_circuits_autonomy_check() {
        let p = rule_add_proposal(RiskLevel::High);
        let a = assessment(&p, RiskLevel::High, 0.9);
        let mut config = EngineConfig::default();
        config.custom_rules.push(CustomRule {
            id: "always-reject-rule-add".into(),
            priority: 0,
            condition: RuleCondition {
                categories: Some(vec![p.category()]),
                max_risk_level: None,
                min_confidence: None,
                max_affected_targets: None,
                scope: None,
            },
            action: RuleAction::Reject,
        });
        let decision = decide(&p, &a, &config, None).await;
        assert_eq!(decision.outcome, DecisionOutcome::Rejected);
        assert_eq!(decision.matched_rule_id.as_deref(), Some("always-reject-rule-add"));
    }
}
