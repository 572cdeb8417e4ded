//! Composes the State Store, Risk Scorer, Decision Policy, Change
//! Applicator, Scheduler, Autonomous Executor, Self-Healing Monitor, and
//! Event Bus into one engine a host can start, stop, and query. Mirrors
//! `aas-service`'s constructor-injected composition: every component handle
//! is built once in [`EvolutionEngine::open`] and shared by `Arc`.

#![deny(unsafe_code)]

mod error;
mod paths;

pub use error::EngineError;
pub use paths::EnginePaths;

use evolution_applicator::{Applicator, ApplicatorConfig, WorkspaceTargetFs};
use evolution_events::EventBus;
use evolution_executor::{ExecutionOutcome, Executor, MetricsSource};
use evolution_healing::{Monitor, MonitorOutcome, RollbackReason};
use evolution_policy::CouncilOracle;
use evolution_risk::RiskScorerConfig;
use evolution_scheduler::{BatchOutcome, Scheduler, SchedulerState};
use evolution_store::{FsStateStore, StateStore};
use evolution_types::{ApplicationId, Counters, EngineConfig, Proposal, ProposalId};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::RwLock;

const DEFAULT_DAILY_LIMIT: u64 = 20;
const CONFIG_FILE: &str = "config.toml";

fn load_config(workspace: &Path) -> Result<EngineConfig, EngineError> {
    let path = workspace.join(".evolution").join(CONFIG_FILE);
    let config = match std::fs::read_to_string(&path) {
        Ok(raw) => toml::from_str(&raw).map_err(|e| EngineError::ConfigLoad(e.to_string()))?,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => EngineConfig::default(),
        Err(e) => return Err(EngineError::ConfigLoad(e.to_string())),
    };
    Ok(config)
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct EngineStatus {
    pub scheduler_state: SchedulerState,
    pub counters: Counters,
    pub next_tick_in_ms: u64,
}

/// One process's worth of evolution-engine state, rooted at a workspace
/// directory containing (or about to contain) `.evolution/`.
pub struct EvolutionEngine {
    workspace: PathBuf,
    config: Arc<RwLock<EngineConfig>>,
    store: Arc<dyn StateStore>,
    applicator: Arc<Applicator>,
    executor: Arc<Executor>,
    scheduler: Arc<Scheduler>,
    monitor: Arc<Monitor>,
    events: Arc<EventBus>,
}

impl EvolutionEngine {
    /// Opens (creating if absent) the workspace at `workspace_dir`, loading
    /// `.evolution/config.toml` and validating it before any component is
    /// constructed. `council` and `metrics` are host-supplied capabilities;
    /// pass `None` / a neutral `MetricsSource` when the host has nothing
    /// real to offer yet.
    pub async fn open(
        workspace_dir: impl Into<PathBuf>,
        council: Option<Arc<dyn CouncilOracle>>,
        metrics: Arc<dyn MetricsSource>,
    ) -> Result<Self, EngineError> {
        let workspace = workspace_dir.into();
        let config = load_config(&workspace)?;
        config.validate()?;
        let daily_limit = if config.daily_limit == 0 { DEFAULT_DAILY_LIMIT } else { config.daily_limit };

        let store: Arc<dyn StateStore> = FsStateStore::open(&workspace, daily_limit).await?;
        let target_fs = Arc::new(WorkspaceTargetFs::new(&workspace));

        Ok(Self::compose(workspace, config, store, target_fs, council, metrics).await)
    }

    /// Builds an engine from already-constructed store and filesystem
    /// capabilities. `open` uses this for the production filesystem-backed
    /// wiring; integration tests use it with in-memory doubles the same way
    /// `aas-service`'s own test module wires its components directly rather
    /// than going through a disk-backed constructor.
    pub async fn compose(
        workspace: PathBuf,
        config: EngineConfig,
        store: Arc<dyn StateStore>,
        target_fs: Arc<dyn evolution_applicator::TargetFs>,
        council: Option<Arc<dyn CouncilOracle>>,
        metrics: Arc<dyn MetricsSource>,
    ) -> Self {
        let applicator_config = ApplicatorConfig {
            create_backups: config.create_backups,
            max_backups: config.max_backups,
            rollback_on_failure: config.rollback_on_failure,
            per_application_timeout: std::time::Duration::from_millis(config.per_application_timeout_ms),
        };
        let self_heal_config = config.self_heal.clone();
        let config = Arc::new(RwLock::new(config));
        let events = Arc::new(EventBus::default());

        let applicator = Arc::new(Applicator::new(target_fs, applicator_config));

        let executor = Arc::new(Executor::new(
            store.clone(),
            applicator.clone(),
            council,
            metrics,
            events.clone(),
            config.clone(),
            RiskScorerConfig::default(),
        ));

        let scheduler = Scheduler::new(config.clone(), store.clone(), executor.clone(), events.clone());
        let monitor = Arc::new(Monitor::new(store.clone(), applicator.clone(), events.clone(), self_heal_config));

        Self { workspace, config, store, applicator, executor, scheduler, monitor, events }
    }

    pub async fn start(&self) {
        self.scheduler.start().await;
    }

    pub async fn stop(&self) {
        self.scheduler.stop().await;
    }

    pub async fn status(&self) -> Result<EngineStatus, EngineError> {
        let counters = self.store.load_counters().await?;
        let config = self.config.read().await;
        Ok(EngineStatus {
            scheduler_state: self.scheduler.state().await,
            counters,
            next_tick_in_ms: config.interval_ms,
        })
    }

    /// `evolution:apply <id>` — force a single-proposal run outside the
    /// Scheduler's own cadence.
    pub async fn apply_one(&self, proposal_id: ProposalId) -> Result<ExecutionOutcome, EngineError> {
        let proposal = self.store.get_proposal(proposal_id).await?.ok_or(EngineError::ProposalNotFound(proposal_id))?;
        Ok(self.executor.execute_one(proposal).await?)
    }

    /// `evolution:rollback <applicationId> [--auto|--manual] [--reason]` —
    /// forces a rollback through the Monitor without waiting for a periodic
    /// evaluation to notice degradation. `reason_text` is carried into the
    /// rollback audit log.
    pub async fn rollback(
        &self,
        application_id: ApplicationId,
        manual: bool,
        reason_text: Option<String>,
    ) -> Result<MonitorOutcome, EngineError> {
        let reason = if manual { RollbackReason::Manual } else { RollbackReason::Auto };
        match self.monitor.force_rollback(application_id, reason, reason_text).await {
            Ok(outcome) => Ok(outcome),
            Err(evolution_healing::MonitorError::RateLimited) => Err(EngineError::RateLimited),
            Err(e) => Err(e.into()),
        }
    }

    /// `evolution:open` — paths to the latest application-event record,
    /// rollback-log entry, and backup directory.
    pub fn paths(&self) -> EnginePaths {
        EnginePaths::new(&self.workspace)
    }

    pub fn store(&self) -> Arc<dyn StateStore> {
        self.store.clone()
    }

    pub fn events(&self) -> Arc<EventBus> {
        self.events.clone()
    }

    pub fn applicator(&self) -> Arc<Applicator> {
        self.applicator.clone()
    }

    pub fn monitor(&self) -> Arc<Monitor> {
        self.monitor.clone()
    }

    /// Processes one batch outside the Scheduler's own loop, bypassing its
    /// state/quiet-hours gate. Used by integration tests and by hosts that
    /// drive ticks themselves.
    pub async fn force_tick(&self) -> BatchOutcome {
        self.scheduler.force_tick().await
    }

    pub async fn submit(&self, proposal: Proposal) -> Result<(), EngineError> {
        self.store.put_proposal(proposal).await?;
        Ok(())
    }
}
