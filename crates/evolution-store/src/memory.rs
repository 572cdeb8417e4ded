use crate::error::StoreError;
use crate::traits::{StateStore, StoreSnapshot};
use async_trait::async_trait;
use evolution_types::{
    ApplicationEvent, ApplicationId, Counters, Proposal, ProposalId, ProposalStatus,
    RollbackAuditEntry, RollbackRecord, Signal,
};
use std::collections::HashMap;
use std::sync::RwLock;

/// In-memory `StateStore` used by component tests and by the CLI's
/// `--dry-run`-style exploration. Mirrors the donor's
/// `AccountabilityLedger`: a handful of `RwLock<HashMap<..>>` indices, no
/// disk I/O.
pub struct InMemoryStateStore {
    proposals: RwLock<HashMap<ProposalId, Proposal>>,
    pending_order: RwLock<Vec<ProposalId>>,
    signals: RwLock<Vec<Signal>>,
    application_events: RwLock<HashMap<ApplicationId, ApplicationEvent>>,
    application_order: RwLock<Vec<ApplicationId>>,
    rollback_records: RwLock<HashMap<ApplicationId, RollbackRecord>>,
    rollback_audit_log: RwLock<Vec<RollbackAuditEntry>>,
    counters: RwLock<Counters>,
    max_signals: usize,
}

impl InMemoryStateStore {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            proposals: RwLock::new(HashMap::new()),
            pending_order: RwLock::new(Vec::new()),
            signals: RwLock::new(Vec::new()),
            application_events: RwLock::new(HashMap::new()),
            application_order: RwLock::new(Vec::new()),
            rollback_records: RwLock::new(HashMap::new()),
            rollback_audit_log: RwLock::new(Vec::new()),
            counters: RwLock::new(Counters::new(daily_limit)),
            max_signals: 1000,
        }
    }
}

impl InMemoryStateStore {
    /// Test/inspection hook mirroring what a host would get by reading
    /// `rollback-log.jsonl` back off disk.
    pub fn rollback_audit_entries(&self) -> Vec<RollbackAuditEntry> {
        self.rollback_audit_log.read().unwrap().clone()
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new(20)
    }
}

#[async_trait]
impl StateStore for InMemoryStateStore {
    async fn put_proposal(&self, proposal: Proposal) -> Result<(), StoreError> {
        let id = proposal.id;
        let was_pending = proposal.status == ProposalStatus::Pending;
        self.proposals.write().unwrap().insert(id, proposal);
        if was_pending {
            let mut order = self.pending_order.write().unwrap();
            if !order.contains(&id) {
                order.push(id);
            }
        }
        Ok(())
    }

    async fn update_proposal_status(
        &self,
        id: ProposalId,
        next: ProposalStatus,
        rollback_record_id: Option<ApplicationId>,
    ) -> Result<Proposal, StoreError> {
        let mut proposals = self.proposals.write().unwrap();
        let proposal = proposals.get_mut(&id).ok_or(StoreError::NotFound(id))?;
        if rollback_record_id.is_some() {
            proposal.rollback_record_id = rollback_record_id;
        }
        proposal
            .transition(next)
            .map_err(|e| StoreError::Corrupted(e.to_string()))?;
        let updated = proposal.clone();
        drop(proposals);
        if next != ProposalStatus::Pending {
            let mut order = self.pending_order.write().unwrap();
            order.retain(|p| *p != id);
        }
        Ok(updated)
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError> {
        Ok(self.proposals.read().unwrap().get(&id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<Proposal>, StoreError> {
        let order = self.pending_order.read().unwrap();
        let proposals = self.proposals.read().unwrap();
        Ok(order.iter().filter_map(|id| proposals.get(id).cloned()).collect())
    }

    async fn add_signal(&self, signal: Signal) -> Result<(), StoreError> {
        let mut signals = self.signals.write().unwrap();
        signals.push(signal);
        if signals.len() > self.max_signals {
            signals.remove(0);
        }
        Ok(())
    }

    async fn recent_signals(&self, window: usize) -> Result<Vec<Signal>, StoreError> {
        let signals = self.signals.read().unwrap();
        let start = signals.len().saturating_sub(window);
        Ok(signals[start..].to_vec())
    }

    async fn record_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError> {
        let id = event.id;
        self.application_events.write().unwrap().insert(id, event);
        self.application_order.write().unwrap().push(id);
        Ok(())
    }

    async fn get_application_event(
        &self,
        id: ApplicationId,
    ) -> Result<Option<ApplicationEvent>, StoreError> {
        Ok(self.application_events.read().unwrap().get(&id).cloned())
    }

    async fn update_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError> {
        self.application_events.write().unwrap().insert(event.id, event);
        Ok(())
    }

    async fn list_recent_application_events(
        &self,
        n: usize,
    ) -> Result<Vec<ApplicationEvent>, StoreError> {
        let order = self.application_order.read().unwrap();
        let events = self.application_events.read().unwrap();
        let start = order.len().saturating_sub(n);
        Ok(order[start..]
            .iter()
            .rev()
            .filter_map(|id| events.get(id).cloned())
            .collect())
    }

    async fn save_rollback_record(&self, record: RollbackRecord) -> Result<(), StoreError> {
        self.rollback_records
            .write()
            .unwrap()
            .insert(record.application_id, record);
        Ok(())
    }

    async fn get_rollback_record(
        &self,
        application_id: ApplicationId,
    ) -> Result<Option<RollbackRecord>, StoreError> {
        Ok(self
            .rollback_records
            .read()
            .unwrap()
            .get(&application_id)
            .cloned())
    }

    async fn record_rollback_audit(&self, entry: RollbackAuditEntry) -> Result<(), StoreError> {
        self.rollback_audit_log.write().unwrap().push(entry);
        Ok(())
    }

    async fn load_counters(&self) -> Result<Counters, StoreError> {
        Ok(self.counters.read().unwrap().clone())
    }

    async fn save_counters(&self, counters: Counters) -> Result<(), StoreError> {
        *self.counters.write().unwrap() = counters;
        Ok(())
    }

    async fn snapshot_all(&self) -> Result<StoreSnapshot, StoreError> {
        Ok(StoreSnapshot {
            proposals: self.proposals.read().unwrap().values().cloned().collect(),
            signals: self.signals.read().unwrap().clone(),
            application_events: self
                .application_events
                .read()
                .unwrap()
                .values()
                .cloned()
                .collect(),
            counters: self.counters.read().unwrap().clone(),
        })
    }

    async fn restore_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        let mut proposals = self.proposals.write().unwrap();
        let mut pending_order = self.pending_order.write().unwrap();
        proposals.clear();
        pending_order.clear();
        for p in snapshot.proposals {
            if p.status == ProposalStatus::Pending {
                pending_order.push(p.id);
            }
            proposals.insert(p.id, p);
        }
        drop(proposals);
        drop(pending_order);
        *self.signals.write().unwrap() = snapshot.signals;
        let mut events = self.application_events.write().unwrap();
        let mut order = self.application_order.write().unwrap();
        events.clear();
        order.clear();
        for e in snapshot.application_events {
            order.push(e.id);
            events.insert(e.id, e);
        }
        drop(events);
        drop(order);
        *self.counters.write().unwrap() = snapshot.counters;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use evolution_types::{Proposal, ProposalPayload, RiskLevel, Scope};

    fn sample_proposal() -> Proposal {
        Proposal::new(
            "t",
            "d",
            RiskLevel::Low,
            ProposalPayload::RuleAdd {
                target: "rules.md".into(),
                rule_text: "x".into(),
                scope: Scope::Project,
            },
        )
    }

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryStateStore::default();
        let p = sample_proposal();
        let id = p.id;
        store.put_proposal(p).await.unwrap();
        let fetched = store.get_proposal(id).await.unwrap().unwrap();
        assert_eq!(fetched.id, id);
    }

    #[tokio::test]
    async fn pending_queue_preserves_insertion_order() {
        let store = InMemoryStateStore::default();
        let a = sample_proposal();
        let b = sample_proposal();
        let (id_a, id_b) = (a.id, b.id);
        store.put_proposal(a).await.unwrap();
        store.put_proposal(b).await.unwrap();
        let pending = store.list_pending().await.unwrap();
        assert_eq!(pending[0].id, id_a);
        assert_eq!(pending[1].id, id_b);
    }

    #[tokio::test]
    async fn approving_removes_from_pending() {
        let store = InMemoryStateStore::default();
        let p = sample_proposal();
        let id = p.id;
        store.put_proposal(p).await.unwrap();
        store
            .update_proposal_status(id, ProposalStatus::Approved, None)
            .await
            .unwrap();
        assert!(store.list_pending().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn snapshot_restore_round_trip() {
        let store = InMemoryStateStore::default();
        store.put_proposal(sample_proposal()).await.unwrap();
        let snap = store.snapshot_all().await.unwrap();

        let restored = InMemoryStateStore::default();
        restored.restore_all(snap.clone()).await.unwrap();
        let snap2 = restored.snapshot_all().await.unwrap();
        assert_eq!(snap.proposals.len(), snap2.proposals.len());
    }

    #[tokio::test]
    async fn signal_window_caps_at_requested_size() {
        let store = InMemoryStateStore::default();
        for i in 0..5 {
            store
                .add_signal(Signal::new(format!("sig-{i}")))
                .await
                .unwrap();
        }
        let recent = store.recent_signals(2).await.unwrap();
        assert_eq!(recent.len(), 2);
        assert_eq!(recent[1].signal_type, "sig-4");
    }
}
