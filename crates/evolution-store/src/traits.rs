use crate::error::StoreError;
use async_trait::async_trait;
use evolution_types::{
    ApplicationEvent, ApplicationId, Counters, Proposal, ProposalId, ProposalStatus,
    RollbackAuditEntry, RollbackRecord, Signal,
};

/// A snapshot of everything the store owns, for the round-trip property in
/// §8 (`snapshot_all` -> `restore_all` -> `snapshot_all` is byte-identical
/// modulo timestamps the snapshotter itself writes).
#[derive(Clone, Debug, serde::Serialize, serde::Deserialize)]
pub struct StoreSnapshot {
    pub proposals: Vec<Proposal>,
    pub signals: Vec<Signal>,
    pub application_events: Vec<ApplicationEvent>,
    pub counters: Counters,
}

/// Durable single-writer key-value store over local disk. Implementations
/// must serialize concurrent in-process writers behind a mutex and detect
/// concurrent cross-process writers via a lockfile.
#[async_trait]
pub trait StateStore: Send + Sync {
    async fn put_proposal(&self, proposal: Proposal) -> Result<(), StoreError>;

    /// Atomic read-modify-write: transition `id` to `next`, attaching a
    /// rollback record id when the transition is to `Applied`. Flushes
    /// synchronously before returning for user-visible terminal statuses
    /// (`Applied`, `Rejected`, `Failed`, `RolledBack`) per the durability
    /// contract in §4.1.
    async fn update_proposal_status(
        &self,
        id: ProposalId,
        next: ProposalStatus,
        rollback_record_id: Option<ApplicationId>,
    ) -> Result<Proposal, StoreError>;

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError>;

    /// Snapshot of currently pending proposals, insertion order preserved.
    async fn list_pending(&self) -> Result<Vec<Proposal>, StoreError>;

    async fn add_signal(&self, signal: Signal) -> Result<(), StoreError>;

    /// Most recent `window` signals, newest last.
    async fn recent_signals(&self, window: usize) -> Result<Vec<Signal>, StoreError>;

    async fn record_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError>;

    async fn get_application_event(
        &self,
        id: ApplicationId,
    ) -> Result<Option<ApplicationEvent>, StoreError>;

    async fn update_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError>;

    async fn list_recent_application_events(
        &self,
        n: usize,
    ) -> Result<Vec<ApplicationEvent>, StoreError>;

    async fn save_rollback_record(&self, record: RollbackRecord) -> Result<(), StoreError>;

    async fn get_rollback_record(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<RollbackRecord>, StoreError>;

    /// Appends one line to the rollback audit trail. Never mutates or
    /// replaces prior entries.
    async fn record_rollback_audit(&self, entry: RollbackAuditEntry) -> Result<(), StoreError>;

    async fn load_counters(&self) -> Result<Counters, StoreError>;

    async fn save_counters(&self, counters: Counters) -> Result<(), StoreError>;

    async fn snapshot_all(&self) -> Result<StoreSnapshot, StoreError>;

    async fn restore_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError>;

    /// Default convenience built atop `get_proposal`.
    async fn proposal_exists(&self, id: ProposalId) -> Result<bool, StoreError> {
        Ok(self.get_proposal(id).await?.is_some())
    }

    /// Default convenience built atop `list_pending`.
    async fn pending_count(&self) -> Result<usize, StoreError> {
        Ok(self.list_pending().await?.len())
    }
}
