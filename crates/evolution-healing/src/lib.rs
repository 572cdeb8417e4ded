//! Self-Healing Monitor: watches every `applied` proposal's post-application
//! metrics and, on sustained degradation, requests a rollback through the
//! Applicator. Automatic rollbacks are rate-limited; manual ones bypass the
//! cap but are audit-logged the same way.

#![deny(unsafe_code)]

mod detector;
mod error;

pub use detector::{evaluate, DegradationFactor, RollbackRecommendation, Verdict};
pub use error::MonitorError;

use evolution_applicator::Applicator;
use evolution_events::{EventBus, EventKind};
use evolution_store::StateStore;
use evolution_types::{ApplicationId, ApplicationStatus, ProposalStatus, SelfHealConfig};
use std::sync::Arc;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RollbackReason {
    Auto,
    Manual,
}

impl RollbackReason {
    fn tag(self) -> &'static str {
        match self {
            RollbackReason::Auto => "auto-heal",
            RollbackReason::Manual => "manual",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum MonitorOutcome {
    /// Not enough post-application data yet to evaluate.
    InsufficientData,
    /// Evaluated, within tolerance; the proposal stays `applied`.
    Retained,
    /// Evaluated, degradation detected but a rollback attempt was rate
    /// limited or otherwise withheld; the proposal stays `applied`.
    DegradedWithoutRollback(Verdict),
    /// Rollback executed; the proposal is now `rolled-back`.
    RolledBack(Verdict),
    /// Rollback executed on an explicit operator request, bypassing
    /// degradation evaluation entirely.
    ForcedRollback,
}

pub struct Monitor {
    store: Arc<dyn StateStore>,
    applicator: Arc<Applicator>,
    events: Arc<EventBus>,
    config: SelfHealConfig,
}

impl Monitor {
    pub fn new(store: Arc<dyn StateStore>, applicator: Arc<Applicator>, events: Arc<EventBus>, config: SelfHealConfig) -> Self {
        Self { store, applicator, events, config }
    }

    /// Evaluates one application and, if warranted, rolls it back.
    /// `reason` determines whether the daily automatic-rollback cap applies.
    pub async fn evaluate_application(&self, application_id: ApplicationId, reason: RollbackReason) -> Result<MonitorOutcome, MonitorError> {
        let mut event = self
            .store
            .get_application_event(application_id)
            .await?
            .ok_or(MonitorError::ApplicationNotFound(application_id))?;

        let post_metrics = match event.post_metrics {
            Some(m) if m.task_count >= self.config.min_tasks_for_evaluation => m,
            _ => return Ok(MonitorOutcome::InsufficientData),
        };

        let verdict = evaluate(&event.pre_metrics, &post_metrics, &self.config);

        match verdict.recommendation {
            RollbackRecommendation::Ignore => {
                event.status = ApplicationStatus::Retained;
                self.store.update_application_event(event).await?;
                Ok(MonitorOutcome::Retained)
            }
            RollbackRecommendation::Rollback => {
                if reason == RollbackReason::Auto {
                    let counters = self.store.load_counters().await?;
                    if !evolution_governor::can_auto_rollback(&counters, self.config.max_daily_rollbacks) {
                        event.status = ApplicationStatus::Degraded;
                        self.store.update_application_event(event).await?;
                        return Ok(MonitorOutcome::DegradedWithoutRollback(verdict));
                    }
                }

                self.perform_rollback(application_id, event, reason, describe(&verdict)).await?;
                Ok(MonitorOutcome::RolledBack(verdict))
            }
        }
    }

    /// Rolls back an application on an explicit operator request, without
    /// consulting `detector::evaluate` first. Automatic requests still
    /// honor the daily cap; manual requests bypass it, per §4.7. `reason_text`
    /// is the operator's free-text explanation, carried into the audit
    /// record; `None` falls back to a generic note.
    pub async fn force_rollback(
        &self,
        application_id: ApplicationId,
        reason: RollbackReason,
        reason_text: Option<String>,
    ) -> Result<MonitorOutcome, MonitorError> {
        let event = self
            .store
            .get_application_event(application_id)
            .await?
            .ok_or(MonitorError::ApplicationNotFound(application_id))?;

        if reason == RollbackReason::Auto {
            let counters = self.store.load_counters().await?;
            if !evolution_governor::can_auto_rollback(&counters, self.config.max_daily_rollbacks) {
                return Err(MonitorError::RateLimited);
            }
        }

        let detail = reason_text.unwrap_or_else(|| "operator requested".to_string());
        self.perform_rollback(application_id, event, reason, detail).await?;
        Ok(MonitorOutcome::ForcedRollback)
    }

    async fn perform_rollback(
        &self,
        application_id: ApplicationId,
        mut event: evolution_types::ApplicationEvent,
        reason: RollbackReason,
        detail: String,
    ) -> Result<(), MonitorError> {
        self.events.emit(EventKind::RollbackStarted {
            application_id,
            reason: format!("{} ({})", reason.tag(), detail),
        });

        let record = self
            .store
            .get_rollback_record(application_id)
            .await?
            .ok_or(MonitorError::RollbackRecordNotFound(application_id))?;
        self.applicator.rollback(&record).await?;

        event.status = ApplicationStatus::RolledBack;
        self.store.update_application_event(event.clone()).await?;

        if let Some(proposal) = self.store.get_proposal(event.proposal_id).await? {
            if proposal.status == ProposalStatus::Applied {
                self.store
                    .update_proposal_status(proposal.id, ProposalStatus::RolledBack, proposal.rollback_record_id)
                    .await?;
            }
        }

        let mut counters = self.store.load_counters().await?;
        counters.record_rollback();
        self.store.save_counters(counters).await?;

        self.store
            .record_rollback_audit(evolution_types::RollbackAuditEntry::new(
                application_id,
                event.proposal_id,
                reason.tag(),
                detail,
            ))
            .await?;

        self.events.emit(EventKind::RollbackCompleted { application_id });
        Ok(())
    }
}

fn describe(verdict: &Verdict) -> String {
    verdict
        .factors
        .iter()
        .map(|f| format!("{} moved {:.1}pp past its {:.1}pp threshold", f.metric, f.magnitude_pct, f.threshold_pct))
        .collect::<Vec<_>>()
        .join("; ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use evolution_applicator::{ApplicatorConfig, InMemoryTargetFs};
    use evolution_store::InMemoryStateStore;
    use evolution_types::{ApplicationEvent, MetricsSnapshot, Proposal, ProposalPayload, RiskLevel, Scope};

    fn snapshot(success_rate: f64, task_count: u64) -> MetricsSnapshot {
        MetricsSnapshot {
            success_rate,
            average_cost: 1.0,
            average_duration_ms: 100.0,
            task_count,
            timestamp: Utc::now(),
        }
    }

    async fn seeded_monitor() -> (Monitor, Arc<InMemoryStateStore>, ApplicationId) {
        let store = Arc::new(InMemoryStateStore::new(20));
        let fs = Arc::new(InMemoryTargetFs::new());
        let applicator = Arc::new(Applicator::new(fs, ApplicatorConfig::default()));
        let events = Arc::new(EventBus::default());

        let mut proposal = Proposal::new(
            "t",
            "d",
            RiskLevel::Low,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Project,
            },
        );

        let event = ApplicationEvent::new(proposal.id, vec!["rules.md".into()], snapshot(0.95, 10));
        let application_id = event.id;

        let record = evolution_types::RollbackRecord::new(
            application_id,
            vec![evolution_types::InverseOperation {
                target: "rules.md".into(),
                previous_content: None,
                applied_content: "x".into(),
            }],
        );
        store.save_rollback_record(record).await.unwrap();
        proposal.rollback_record_id = Some(application_id);
        proposal.status = ProposalStatus::Approved;
        proposal.transition(ProposalStatus::Applied).unwrap();
        store.put_proposal(proposal).await.unwrap();

        store.record_application_event(event).await.unwrap();

        let monitor = Monitor::new(store.clone(), applicator, events, SelfHealConfig::default());
        (monitor, store, application_id)
    }

    #[tokio::test]
    async fn insufficient_post_metrics_returns_insufficient_data() {
        let (monitor, _store, application_id) = seeded_monitor().await;
        let outcome = monitor.evaluate_application(application_id, RollbackReason::Auto).await.unwrap();
        assert_eq!(outcome, MonitorOutcome::InsufficientData);
    }

    #[tokio::test]
    async fn stable_post_metrics_retains_the_application() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.94, 10));
        store.update_application_event(event).await.unwrap();

        let outcome = monitor.evaluate_application(application_id, RollbackReason::Auto).await.unwrap();
        assert_eq!(outcome, MonitorOutcome::Retained);
    }

    #[tokio::test]
    async fn degraded_post_metrics_triggers_automatic_rollback() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.2, 10));
        store.update_application_event(event).await.unwrap();

        let outcome = monitor.evaluate_application(application_id, RollbackReason::Auto).await.unwrap();
        assert!(matches!(outcome, MonitorOutcome::RolledBack(_)));

        let updated = store.get_application_event(application_id).await.unwrap().unwrap();
        assert_eq!(updated.status, ApplicationStatus::RolledBack);
    }

    #[tokio::test]
    async fn automatic_rollback_is_rate_limited() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.2, 10));
        store.update_application_event(event).await.unwrap();

        let mut counters = store.load_counters().await.unwrap();
        for _ in 0..3 {
            counters.record_rollback();
        }
        store.save_counters(counters).await.unwrap();

        let outcome = monitor.evaluate_application(application_id, RollbackReason::Auto).await.unwrap();
        assert!(matches!(outcome, MonitorOutcome::DegradedWithoutRollback(_)));
    }

    #[tokio::test]
    async fn manual_rollback_bypasses_the_rate_limit() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.2, 10));
        store.update_application_event(event).await.unwrap();

        let mut counters = store.load_counters().await.unwrap();
        for _ in 0..10 {
            counters.record_rollback();
        }
        store.save_counters(counters).await.unwrap();

        let outcome = monitor.evaluate_application(application_id, RollbackReason::Manual).await.unwrap();
        assert!(matches!(outcome, MonitorOutcome::RolledBack(_)));
    }

    #[tokio::test]
    async fn forced_rollback_bypasses_degradation_evaluation() {
        let (monitor, store, application_id) = seeded_monitor().await;
        // post_metrics intentionally left at a healthy snapshot; a forced
        // rollback does not consult the detector at all.
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.95, 10));
        store.update_application_event(event).await.unwrap();

        let outcome = monitor
            .force_rollback(application_id, RollbackReason::Manual, Some("bad prompt regression".to_string()))
            .await
            .unwrap();
        assert_eq!(outcome, MonitorOutcome::ForcedRollback);

        let updated = store.get_application_event(application_id).await.unwrap().unwrap();
        assert_eq!(updated.status, ApplicationStatus::RolledBack);
    }

    #[tokio::test]
    async fn degraded_post_metrics_writes_a_rollback_audit_entry() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.2, 10));
        store.update_application_event(event).await.unwrap();

        monitor.evaluate_application(application_id, RollbackReason::Auto).await.unwrap();

        let entries = store.rollback_audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].application_id, application_id);
        assert_eq!(entries[0].reason, "auto-heal");
    }

    #[tokio::test]
    async fn manual_rollback_audit_entry_carries_the_operator_reason() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut event = store.get_application_event(application_id).await.unwrap().unwrap();
        event.post_metrics = Some(snapshot(0.95, 10));
        store.update_application_event(event).await.unwrap();

        monitor
            .force_rollback(application_id, RollbackReason::Manual, Some("bad prompt regression".to_string()))
            .await
            .unwrap();

        let entries = store.rollback_audit_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].reason, "manual");
        assert_eq!(entries[0].detail, "bad prompt regression");
    }

    #[tokio::test]
    async fn forced_automatic_rollback_still_honors_the_daily_cap() {
        let (monitor, store, application_id) = seeded_monitor().await;
        let mut counters = store.load_counters().await.unwrap();
        for _ in 0..3 {
            counters.record_rollback();
        }
        store.save_counters(counters).await.unwrap();

        let result = monitor.force_rollback(application_id, RollbackReason::Auto, None).await;
        assert!(matches!(result, Err(MonitorError::RateLimited)));
    }
}
