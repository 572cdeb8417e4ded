//! Scheduler: a periodic tick that queries the State Store for pending
//! proposals, orders them, slices a batch, and hands it to whatever
//! implements `ProposalExecutor`. The Scheduler knows nothing about the
//! Executor beyond this trait; the Executor has no reference back.

#![deny(unsafe_code)]

mod priority;

pub use priority::order_proposals;

use async_trait::async_trait;
use evolution_events::{EventBus, EventKind};
use evolution_governor::in_quiet_hours;
use evolution_store::StateStore;
use evolution_types::{EngineConfig, HealthStatus, Proposal};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tokio::time::{interval, Duration};

/// Result of one Executor batch run. Mirrors the Autonomous Executor's
/// batch entry point contract.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    pub success_count: usize,
    pub failure_count: usize,
    pub escalated_count: usize,
    pub total_time_ms: u64,
}

/// The seam the Scheduler dispatches a batch through. Implemented by the
/// Autonomous Executor; the Scheduler depends only on this trait.
#[async_trait]
pub trait ProposalExecutor: Send + Sync {
    async fn execute_batch(&self, proposals: Vec<Proposal>) -> BatchOutcome;
    fn is_processing(&self) -> bool;
    fn health_status(&self) -> HealthStatus;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SchedulerState {
    Stopped,
    Running,
    Paused,
    QuietHours,
}

pub struct Scheduler {
    config: Arc<RwLock<EngineConfig>>,
    store: Arc<dyn StateStore>,
    executor: Arc<dyn ProposalExecutor>,
    events: Arc<EventBus>,
    state: Arc<RwLock<SchedulerState>>,
    stop_tx: mpsc::Sender<()>,
    stop_rx: tokio::sync::Mutex<Option<mpsc::Receiver<()>>>,
    started: AtomicBool,
}

impl Scheduler {
    pub fn new(
        config: Arc<RwLock<EngineConfig>>,
        store: Arc<dyn StateStore>,
        executor: Arc<dyn ProposalExecutor>,
        events: Arc<EventBus>,
    ) -> Arc<Self> {
        let (stop_tx, stop_rx) = mpsc::channel(1);
        Arc::new(Self {
            config,
            store,
            executor,
            events,
            state: Arc::new(RwLock::new(SchedulerState::Stopped)),
            stop_tx,
            stop_rx: tokio::sync::Mutex::new(Some(stop_rx)),
            started: AtomicBool::new(false),
        })
    }

    pub async fn state(&self) -> SchedulerState {
        *self.state.read().await
    }

    /// Starts the tick loop as a background task. Idempotent: a second call
    /// while already started is a no-op rather than a second spawned loop.
    pub async fn start(self: &Arc<Self>) {
        if self.started.swap(true, Ordering::SeqCst) {
            return;
        }
        *self.state.write().await = SchedulerState::Running;

        let mut stop_rx = match self.stop_rx.lock().await.take() {
            Some(rx) => rx,
            None => return,
        };
        let scheduler = self.clone();
        tokio::spawn(async move {
            let interval_ms = scheduler.config.read().await.interval_ms;
            let mut ticker = interval(Duration::from_millis(interval_ms));
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        scheduler.tick(false).await;
                    }
                    _ = stop_rx.recv() => {
                        break;
                    }
                }
                if scheduler.state().await == SchedulerState::Stopped {
                    break;
                }
            }
        });
    }

    pub async fn stop(&self) {
        *self.state.write().await = SchedulerState::Stopped;
        self.started.store(false, Ordering::SeqCst);
        let _ = self.stop_tx.send(()).await;
    }

    pub async fn pause(&self) {
        let mut state = self.state.write().await;
        if *state == SchedulerState::Running || *state == SchedulerState::QuietHours {
            *state = SchedulerState::Paused;
        }
    }

    pub async fn resume(&self) {
        let mut state = self.state.write().await;
        if *state == SchedulerState::Paused {
            *state = SchedulerState::Running;
        }
    }

    /// Manual entry point that bypasses the stopped/paused gate (temporarily
    /// forcing running) but still honors quiet hours and the executor-busy
    /// check. Used for operator-triggered or test-triggered runs.
    pub async fn force_tick(&self) -> BatchOutcome {
        self.tick(true).await
    }

    async fn tick(&self, forced: bool) -> BatchOutcome {
        let current_state = self.state().await;
        if !forced && current_state != SchedulerState::Running && current_state != SchedulerState::QuietHours {
            self.events.emit(EventKind::SchedulerTick {
                proposals_considered: 0,
                skipped_reason: Some(format!("{current_state:?}").to_lowercase()),
            });
            return BatchOutcome::default();
        }

        let config = self.config.read().await.clone();
        if in_quiet_hours(&config.quiet_hours, chrono::Utc::now()) {
            if !forced {
                *self.state.write().await = SchedulerState::QuietHours;
            }
            self.events.emit(EventKind::SchedulerTick {
                proposals_considered: 0,
                skipped_reason: Some("quiet-hours".to_string()),
            });
            return BatchOutcome::default();
        }
        if !forced && current_state == SchedulerState::QuietHours {
            *self.state.write().await = SchedulerState::Running;
        }

        if self.executor.is_processing() {
            self.events.emit(EventKind::SchedulerTick {
                proposals_considered: 0,
                skipped_reason: Some("busy".to_string()),
            });
            return BatchOutcome::default();
        }

        let pending = match self.store.list_pending().await {
            Ok(pending) => pending,
            Err(e) => {
                tracing::error!(error = %e, "failed to list pending proposals");
                return BatchOutcome::default();
            }
        };

        let now = chrono::Utc::now();
        for proposal in &pending {
            let age_ms = (now - proposal.created_at).num_milliseconds();
            if age_ms > config.max_age_ms {
                self.events.emit(EventKind::ProposalEscalated {
                    proposal_id: proposal.id,
                    reason: format!("pending for {age_ms}ms, exceeding maxAgeMs {}", config.max_age_ms),
                });
            }
        }

        let ordered = order_proposals(pending, config.priority_order);
        let batch: Vec<Proposal> = ordered.into_iter().take(config.batch_size).collect();
        let considered = batch.len();

        self.events.emit(EventKind::SchedulerTick {
            proposals_considered: considered,
            skipped_reason: None,
        });

        let outcome = self.executor.execute_batch(batch).await;

        if self.executor.health_status() == HealthStatus::Unhealthy {
            self.pause().await;
            self.events.emit(EventKind::HealthCheck {
                status: HealthStatus::Unhealthy,
                reason: "executor unhealthy; scheduler auto-paused, manual resume required".to_string(),
            });
        }

        outcome
    }
}
