//! Autonomous Executor: the single-proposal entry point used by the
//! Scheduler and by direct operator invocation. Runs the score → decide →
//! apply → record → emit pipeline described for each proposal and keeps the
//! daily counters that feed the Rate Governor.

#![deny(unsafe_code)]

mod error;
mod metrics;

pub use error::ExecutorError;
pub use metrics::{MetricsSource, StaticMetricsSource};

use async_trait::async_trait;
use chrono::Utc;
use evolution_applicator::Applicator;
use evolution_events::{EventBus, EventKind};
use evolution_policy::CouncilOracle;
use evolution_risk::{CategoryHistory, RiskScorerConfig};
use evolution_scheduler::{BatchOutcome, ProposalExecutor};
use evolution_store::{StateStore, StoreSnapshot};
use evolution_types::{
    ApplicationEvent, ApplicationId, ApplicationStatus, DecisionOutcome, EngineConfig,
    HealthStatus, Proposal, ProposalCategory, ProposalStatus,
};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;

/// Outcome of one `execute_one` call, for callers that want more detail than
/// the batch summary.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecutionOutcome {
    Approved,
    Deferred,
    Rejected,
    Escalated,
    BudgetExhausted,
}

/// Scans a full state snapshot for a category's recent track record. The
/// Risk Scorer needs this once per proposal; `snapshot_all` already exists
/// for the store's own round-trip property, so it is reused here rather
/// than adding a dedicated query.
fn category_history(snapshot: &StoreSnapshot, category: ProposalCategory) -> CategoryHistory {
    let category_proposal_ids: std::collections::HashSet<_> = snapshot
        .proposals
        .iter()
        .filter(|p| p.category() == category)
        .map(|p| p.id)
        .collect();

    let relevant_events: Vec<_> = snapshot
        .application_events
        .iter()
        .filter(|e| category_proposal_ids.contains(&e.proposal_id))
        .collect();

    let sample_count = relevant_events.len() as u64;
    let successes = relevant_events
        .iter()
        .filter(|e| e.status == ApplicationStatus::Retained)
        .count() as u64;
    let success_rate = if sample_count == 0 {
        0.0
    } else {
        successes as f64 / sample_count as f64
    };

    let override_sample_count = snapshot
        .proposals
        .iter()
        .filter(|p| p.category() == category && p.status.is_terminal())
        .count() as u64;
    let overridden = snapshot
        .proposals
        .iter()
        .filter(|p| p.category() == category && p.status.is_terminal() && p.review.is_some())
        .count() as u64;
    let override_rate = if override_sample_count == 0 {
        0.0
    } else {
        overridden as f64 / override_sample_count as f64
    };

    CategoryHistory {
        sample_count,
        success_rate,
        override_sample_count,
        override_rate,
    }
}

pub struct Executor {
    store: Arc<dyn StateStore>,
    applicator: Arc<Applicator>,
    council: Option<Arc<dyn CouncilOracle>>,
    metrics: Arc<dyn MetricsSource>,
    events: Arc<EventBus>,
    config: Arc<RwLock<EngineConfig>>,
    risk_config: RiskScorerConfig,
    processing: AtomicBool,
    last_health: std::sync::Mutex<HealthStatus>,
}

impl Executor {
    pub fn new(
        store: Arc<dyn StateStore>,
        applicator: Arc<Applicator>,
        council: Option<Arc<dyn CouncilOracle>>,
        metrics: Arc<dyn MetricsSource>,
        events: Arc<EventBus>,
        config: Arc<RwLock<EngineConfig>>,
        risk_config: RiskScorerConfig,
    ) -> Self {
        Self {
            store,
            applicator,
            council,
            metrics,
            events,
            config,
            risk_config,
            processing: AtomicBool::new(false),
            last_health: std::sync::Mutex::new(HealthStatus::Healthy),
        }
    }

    /// Runs the full per-proposal lifecycle. Never returns an error for a
    /// proposal-level failure (those become a `failed` status transition and
    /// an `execution-failed` event); only a state-store I/O error surfaces.
    pub async fn execute_one(&self, proposal: Proposal) -> Result<ExecutionOutcome, ExecutorError> {
        let started = Instant::now();
        let mut counters = self.store.load_counters().await?;
        counters.reset_if_new_day(Utc::now());

        if !evolution_governor::can_execute(&counters) {
            self.store.save_counters(counters).await?;
            self.events.emit(EventKind::SchedulerTick {
                proposals_considered: 0,
                skipped_reason: Some("daily-budget-exhausted".to_string()),
            });
            return Ok(ExecutionOutcome::BudgetExhausted);
        }

        self.events.emit(EventKind::ExecutionStarted {
            proposal_id: proposal.id,
        });

        let snapshot = self.store.snapshot_all().await?;
        let history = category_history(&snapshot, proposal.category());
        let assessment = evolution_risk::assess(&proposal, history, self.risk_config);

        let config = self.config.read().await.clone();
        let decision = evolution_policy::decide(&proposal, &assessment, &config, self.council.clone()).await;

        let mut proposal = proposal;
        let outcome = match decision.outcome {
            DecisionOutcome::Approved => {
                let application_id = ApplicationId::generate();
                let pre_metrics = self.metrics.current_metrics().await;
                let apply_result = self.applicator.apply_proposal(&proposal, application_id).await;

                match apply_result {
                    Ok(apply_outcome) if apply_outcome.failed_count == 0 && apply_outcome.rollback_record.is_some() => {
                        let record = apply_outcome.rollback_record.clone().unwrap_or_else(|| {
                            evolution_types::RollbackRecord::new(application_id, Vec::new())
                        });
                        self.store.save_rollback_record(record).await?;
                        proposal = self
                            .store
                            .update_proposal_status(proposal.id, ProposalStatus::Applied, Some(application_id))
                            .await?;
                        let event = ApplicationEvent::new(proposal.id, apply_outcome.applied_changes.clone(), pre_metrics);
                        self.store.record_application_event(event).await?;
                        counters.record_success(started.elapsed().as_millis() as u64);
                        self.events.emit(EventKind::ExecutionCompleted { proposal_id: proposal.id });
                        ExecutionOutcome::Approved
                    }
                    Ok(apply_outcome) => {
                        if let Some(record) = &apply_outcome.rollback_record {
                            self.store.save_rollback_record(record.clone()).await?;
                        }
                        proposal = self
                            .store
                            .update_proposal_status(proposal.id, ProposalStatus::Failed, None)
                            .await?;
                        counters.record_failure(started.elapsed().as_millis() as u64);
                        self.events.emit(EventKind::ExecutionFailed {
                            proposal_id: proposal.id,
                            reason: format!("{} of {} mutations failed", apply_outcome.failed_count, apply_outcome.applied_count + apply_outcome.failed_count),
                        });
                        ExecutionOutcome::Rejected
                    }
                    Err(e) => {
                        proposal = self
                            .store
                            .update_proposal_status(proposal.id, ProposalStatus::Failed, None)
                            .await?;
                        counters.record_failure(started.elapsed().as_millis() as u64);
                        self.events.emit(EventKind::ExecutionFailed {
                            proposal_id: proposal.id,
                            reason: e.to_string(),
                        });
                        ExecutionOutcome::Rejected
                    }
                }
            }
            DecisionOutcome::Escalated | DecisionOutcome::Deferred => {
                self.events.emit(EventKind::ApprovalRequired {
                    proposal_id: proposal.id,
                    reason: decision.reason.clone(),
                });
                if decision.outcome == DecisionOutcome::Escalated {
                    ExecutionOutcome::Escalated
                } else {
                    ExecutionOutcome::Deferred
                }
            }
            DecisionOutcome::Rejected => {
                proposal = self
                    .store
                    .update_proposal_status(proposal.id, ProposalStatus::Rejected, None)
                    .await?;
                counters.record_rejection();
                ExecutionOutcome::Rejected
            }
        };

        self.store.save_counters(counters.clone()).await?;
        *self.last_health.lock().unwrap() = counters.health();

        Ok(outcome)
    }

    /// Thin loop around `execute_one`: stops early on budget exhaustion,
    /// returns the aggregate summary the Scheduler reports on.
    pub async fn execute_batch_inner(&self, proposals: Vec<Proposal>) -> BatchOutcome {
        self.processing.store(true, Ordering::SeqCst);
        let started = Instant::now();
        let mut outcome = BatchOutcome::default();

        for proposal in proposals {
            match self.execute_one(proposal).await {
                Ok(ExecutionOutcome::BudgetExhausted) => break,
                Ok(ExecutionOutcome::Approved) => outcome.success_count += 1,
                Ok(ExecutionOutcome::Escalated) => outcome.escalated_count += 1,
                Ok(ExecutionOutcome::Rejected) => outcome.failure_count += 1,
                Ok(ExecutionOutcome::Deferred) => {}
                Err(e) => {
                    tracing::error!(error = %e, "state store error during batch execution");
                    outcome.failure_count += 1;
                }
            }
        }

        outcome.total_time_ms = started.elapsed().as_millis() as u64;
        self.processing.store(false, Ordering::SeqCst);
        outcome
    }
}

#[async_trait]
impl ProposalExecutor for Executor {
    async fn execute_batch(&self, proposals: Vec<Proposal>) -> BatchOutcome {
        self.execute_batch_inner(proposals).await
    }

    fn is_processing(&self) -> bool {
        self.processing.load(Ordering::SeqCst)
    }

    fn health_status(&self) -> HealthStatus {
        *self.last_health.lock().unwrap()
    }
}
