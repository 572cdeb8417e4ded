//! Ordering pending proposals before they are sliced into a batch.
//!
//! `age` orders oldest-first (FIFO). `impact` favors low-risk, easy wins
//! first; `risk` favors high-risk proposals first so they reach a human
//! reviewer sooner.
//!
//! Every ordering breaks ties by creation time (oldest first) so that
//! proposals of equal priority are still served in a stable, predictable
//! sequence across ticks.

use evolution_types::{PriorityOrder, Proposal};

pub fn order_proposals(mut proposals: Vec<Proposal>, order: PriorityOrder) -> Vec<Proposal> {
    match order {
        PriorityOrder::Age => {
            proposals.sort_by_key(|p| p.created_at);
        }
        PriorityOrder::Impact => {
            proposals.sort_by(|a, b| {
                a.declared_risk
                    .cmp(&b.declared_risk)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
        }
        PriorityOrder::Risk => {
            proposals.sort_by(|a, b| {
                b.declared_risk
                    .cmp(&a.declared_risk)
                    .then_with(|| a.created_at.cmp(&b.created_at))
            });
        }
    }
    proposals
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolution_types::{ProposalPayload, RiskLevel, Scope};

    fn proposal_with(risk: RiskLevel, created_at: chrono::DateTime<chrono::Utc>) -> Proposal {
        let mut p = Proposal::new(
            "t",
            "d",
            risk,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Project,
            },
        );
        p.created_at = created_at;
        p
    }

    #[test]
    fn age_order_is_oldest_first() {
        let now = chrono::Utc::now();
        let older = proposal_with(RiskLevel::Low, now - chrono::Duration::seconds(10));
        let newer = proposal_with(RiskLevel::Low, now);
        let ordered = order_proposals(vec![newer.clone(), older.clone()], PriorityOrder::Age);
        assert_eq!(ordered[0].id, older.id);
        assert_eq!(ordered[1].id, newer.id);
    }

    #[test]
    fn impact_order_is_lowest_declared_risk_first() {
        let now = chrono::Utc::now();
        let low = proposal_with(RiskLevel::Low, now);
        let high = proposal_with(RiskLevel::High, now);
        let ordered = order_proposals(vec![high.clone(), low.clone()], PriorityOrder::Impact);
        assert_eq!(ordered[0].id, low.id);
        assert_eq!(ordered[1].id, high.id);
    }

    #[test]
    fn risk_order_is_highest_declared_risk_first() {
        let now = chrono::Utc::now();
        let low = proposal_with(RiskLevel::Low, now);
        let high = proposal_with(RiskLevel::High, now);
        let ordered = order_proposals(vec![low.clone(), high.clone()], PriorityOrder::Risk);
        assert_eq!(ordered[0].id, high.id);
        assert_eq!(ordered[1].id, low.id);
    }

    #[test]
    fn equal_risk_breaks_ties_by_age() {
        let now = chrono::Utc::now();
        let older = proposal_with(RiskLevel::Medium, now - chrono::Duration::seconds(5));
        let newer = proposal_with(RiskLevel::Medium, now);
        let ordered = order_proposals(vec![newer.clone(), older.clone()], PriorityOrder::Impact);
        assert_eq!(ordered[0].id, older.id);
        assert_eq!(ordered[1].id, newer.id);
    }
}
