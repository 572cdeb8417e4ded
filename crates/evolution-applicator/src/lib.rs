//! Change Applicator: translates an approved proposal's payload into
//! filesystem mutations, applying them against an injectable `TargetFs`
//! capability so tests never touch a real disk.

#![deny(unsafe_code)]

mod backup;
mod error;
mod target_fs;
mod translate;

pub use backup::BackupManager;
pub use error::ApplicatorError;
pub use target_fs::{InMemoryTargetFs, TargetFs, WorkspaceTargetFs};
pub use translate::{plan_mutations, Mutation, MutationKind};

use evolution_types::{ApplicationId, InverseOperation, Proposal, RollbackRecord};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Result of one `apply_proposal` call. Mirrors the Applicator's batch
/// contract: every attempted mutation is accounted for, successful or not.
#[derive(Debug, Default)]
pub struct ApplyOutcome {
    pub applied_count: usize,
    pub failed_count: usize,
    pub applied_changes: Vec<String>,
    pub failed_changes: Vec<(String, String)>,
    pub rollback_record: Option<RollbackRecord>,
}

#[derive(Clone, Debug)]
pub struct ApplicatorConfig {
    pub create_backups: bool,
    pub max_backups: usize,
    pub rollback_on_failure: bool,
    pub per_application_timeout: Duration,
}

impl Default for ApplicatorConfig {
    fn default() -> Self {
        Self {
            create_backups: true,
            max_backups: 10,
            rollback_on_failure: true,
            per_application_timeout: Duration::from_secs(30),
        }
    }
}

pub struct Applicator {
    fs: Arc<dyn TargetFs>,
    backups: BackupManager,
    config: ApplicatorConfig,
}

impl Applicator {
    pub fn new(fs: Arc<dyn TargetFs>, config: ApplicatorConfig) -> Self {
        let backups = BackupManager::new(config.max_backups);
        Self { fs, backups, config }
    }

    /// Translates `proposal`'s payload into mutations and applies them in
    /// order, within `per_application_timeout`. When `rollback_on_failure`
    /// is set, the first failure reverts every mutation already applied in
    /// this batch and nothing remains in effect; otherwise every mutation is
    /// attempted independently and partial success is reported.
    pub async fn apply_proposal(
        &self,
        proposal: &Proposal,
        application_id: ApplicationId,
    ) -> Result<ApplyOutcome, ApplicatorError> {
        let timeout_ms = self.config.per_application_timeout.as_millis() as u64;
        match tokio::time::timeout(
            self.config.per_application_timeout,
            self.apply_proposal_inner(proposal, application_id),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(ApplicatorError::Timeout(timeout_ms)),
        }
    }

    async fn apply_proposal_inner(
        &self,
        proposal: &Proposal,
        application_id: ApplicationId,
    ) -> Result<ApplyOutcome, ApplicatorError> {
        let targets = proposal.payload.affected_targets();
        let mut current = HashMap::with_capacity(targets.len());
        for target in &targets {
            current.insert(target.clone(), self.fs.read(target).await?);
        }

        let mutations =
            translate::plan_mutations(&proposal.payload, |t| current.get(t).cloned().flatten());

        if self.config.create_backups {
            let backup_targets: Vec<(String, String)> = mutations
                .iter()
                .filter_map(|m| m.previous_content.clone().map(|c| (m.target.clone(), c)))
                .collect();
            if !backup_targets.is_empty() {
                self.backups
                    .take_backup(self.fs.as_ref(), &application_id.to_string(), &backup_targets)
                    .await?;
            }
        }

        let mut outcome = ApplyOutcome::default();
        let mut inverse_ops = Vec::new();

        for mutation in &mutations {
            match self.apply_one(mutation).await {
                Ok(()) => {
                    outcome.applied_count += 1;
                    outcome.applied_changes.push(mutation.target.clone());
                    inverse_ops.push(InverseOperation {
                        target: mutation.target.clone(),
                        previous_content: mutation.previous_content.clone(),
                        applied_content: mutation.new_content.clone(),
                    });
                }
                Err(e) => {
                    outcome.failed_count += 1;
                    outcome.failed_changes.push((mutation.target.clone(), e.to_string()));
                    if self.config.rollback_on_failure {
                        self.revert(&inverse_ops).await?;
                        return Ok(outcome);
                    }
                }
            }
        }

        if !inverse_ops.is_empty() {
            outcome.rollback_record = Some(RollbackRecord::new(application_id, inverse_ops));
        }
        Ok(outcome)
    }

    async fn apply_one(&self, mutation: &Mutation) -> Result<(), ApplicatorError> {
        if mutation.target.ends_with(".json") {
            serde_json::from_str::<serde_json::Value>(&mutation.new_content)
                .map_err(|e| ApplicatorError::Corrupted(format!("{}: {e}", mutation.target)))?;
        }
        match mutation.kind {
            MutationKind::Write => self.fs.write(&mutation.target, &mutation.new_content).await,
            MutationKind::RecordOnly => Ok(()),
        }
    }

    async fn revert(&self, inverse_ops: &[InverseOperation]) -> Result<(), ApplicatorError> {
        for op in inverse_ops.iter().rev() {
            match &op.previous_content {
                Some(content) => self.fs.write(&op.target, content).await?,
                None => self.fs.remove(&op.target).await?,
            }
        }
        Ok(())
    }

    /// Restores every target named in `record` to its pre-application
    /// content, independent of and outside any `apply_proposal` call.
    pub async fn rollback(&self, record: &RollbackRecord) -> Result<(), ApplicatorError> {
        self.revert(&record.inverse_operations).await
    }
}
