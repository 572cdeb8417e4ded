use crate::error::StoreError;
use crate::lockfile::LockGuard;
use crate::traits::{StateStore, StoreSnapshot};
use async_trait::async_trait;
use evolution_types::{
    ApplicationEvent, ApplicationId, Counters, Proposal, ProposalId, ProposalStatus,
    RollbackAuditEntry, RollbackRecord, Signal,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

const MAX_SIGNALS: usize = 1000;
const FLUSH_INTERVAL: Duration = Duration::from_millis(200);

struct Inner {
    proposals: HashMap<ProposalId, Proposal>,
    pending_order: Vec<ProposalId>,
    signals: Vec<Signal>,
    application_events: HashMap<ApplicationId, ApplicationEvent>,
    application_order: Vec<ApplicationId>,
    rollback_records: HashMap<ApplicationId, RollbackRecord>,
    counters: Counters,
}

/// Filesystem-backed `StateStore` under `<root>/.evolution/`, matching the
/// on-disk layout in the spec's external-interfaces section. Concurrent
/// in-process writers share `inner`'s mutex; concurrent processes are
/// detected via `LockGuard`.
pub struct FsStateStore {
    root: PathBuf,
    _lock: LockGuard,
    inner: Arc<Mutex<Inner>>,
    dirty: Arc<AtomicBool>,
}

fn evolution_dir(root: &Path) -> PathBuf {
    root.join(".evolution")
}

impl FsStateStore {
    /// Open (creating if absent) the store rooted at `workspace_dir`,
    /// reconstructing in-memory indexes from disk. Malformed proposal
    /// records are quarantined under `proposals/quarantine/`, not dropped.
    pub async fn open(workspace_dir: impl AsRef<Path>, daily_limit: u64) -> Result<Arc<Self>, StoreError> {
        let root = workspace_dir.as_ref().to_path_buf();
        let dir = evolution_dir(&root);
        std::fs::create_dir_all(dir.join("proposals").join("quarantine"))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        std::fs::create_dir_all(dir.join("applications"))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        std::fs::create_dir_all(dir.join("backups"))
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;

        let lock = LockGuard::acquire(&dir)?;
        let inner = Self::reconstruct(&dir, daily_limit)?;

        let store = Arc::new(Self {
            root,
            _lock: lock,
            inner: Arc::new(Mutex::new(inner)),
            dirty: Arc::new(AtomicBool::new(false)),
        });

        let inner_handle = store.inner.clone();
        let dirty_handle = store.dirty.clone();
        let dir_handle = dir.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(FLUSH_INTERVAL);
            loop {
                ticker.tick().await;
                if dirty_handle.swap(false, Ordering::SeqCst) {
                    let snapshot = {
                        let guard = inner_handle.lock().unwrap();
                        (guard.counters.clone(), guard.pending_order.clone(), guard.signals.clone())
                    };
                    if let Err(e) = write_state_json(&dir_handle, &snapshot.0, &snapshot.1, &snapshot.2) {
                        tracing::error!(error = %e, "failed to flush evolution state.json");
                    }
                }
            }
        });

        Ok(store)
    }

    fn reconstruct(dir: &Path, daily_limit: u64) -> Result<Inner, StoreError> {
        let mut proposals = HashMap::new();
        let mut pending_order = Vec::new();
        let proposals_dir = dir.join("proposals");
        if proposals_dir.is_dir() {
            for entry in std::fs::read_dir(&proposals_dir).map_err(|e| StoreError::Unavailable(e.to_string()))? {
                let entry = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
                let path = entry.path();
                if path.is_dir() || path.extension().and_then(|e| e.to_str()) != Some("json") {
                    continue;
                }
                let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
                match serde_json::from_str::<Proposal>(&raw) {
                    Ok(p) => {
                        if p.status == ProposalStatus::Pending {
                            pending_order.push(p.id);
                        }
                        proposals.insert(p.id, p);
                    }
                    Err(e) => {
                        tracing::warn!(path = %path.display(), error = %e, "quarantining malformed proposal record");
                        let quarantine = proposals_dir.join("quarantine").join(path.file_name().unwrap());
                        let _ = std::fs::rename(&path, &quarantine);
                    }
                }
            }
        }

        let (counters, saved_pending_order, signals) = read_state_json(dir, daily_limit)?;
        // Prefer the authoritative per-file proposal statuses for ordering,
        // but fall back to the persisted order for any id state.json still
        // remembers as pending and that a proposal file confirms.
        let mut order = saved_pending_order;
        order.retain(|id| pending_order.contains(id));
        for id in pending_order {
            if !order.contains(&id) {
                order.push(id);
            }
        }

        let (application_events, application_order) = read_application_log(dir)?;
        let rollback_records = read_rollback_records(dir)?;

        Ok(Inner {
            proposals,
            pending_order: order,
            signals,
            application_events,
            application_order,
            rollback_records,
            counters,
        })
    }

    fn mark_dirty(&self) {
        self.dirty.store(true, Ordering::SeqCst);
    }

    /// Synchronous flush barrier used before any user-visible terminal
    /// status transition, per the durability contract in §4.1.
    fn flush_now(&self) -> Result<(), StoreError> {
        let guard = self.inner.lock().unwrap();
        write_state_json(&evolution_dir(&self.root), &guard.counters, &guard.pending_order, &guard.signals)?;
        self.dirty.store(false, Ordering::SeqCst);
        Ok(())
    }

    fn write_proposal_file(&self, proposal: &Proposal) -> Result<(), StoreError> {
        let path = evolution_dir(&self.root)
            .join("proposals")
            .join(format!("{}.json", proposal.id));
        let raw = serde_json::to_string_pretty(proposal)?;
        std::fs::write(path, raw).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        Ok(())
    }
}

fn write_state_json(dir: &Path, counters: &Counters, pending_order: &[ProposalId], signals: &[Signal]) -> Result<(), StoreError> {
    #[derive(serde::Serialize)]
    struct StateJson<'a> {
        schema_version: u32,
        counters: &'a Counters,
        pending_order: &'a [ProposalId],
        signals: &'a [Signal],
    }
    let raw = serde_json::to_string_pretty(&StateJson {
        schema_version: evolution_types::SCHEMA_VERSION,
        counters,
        pending_order,
        signals,
    })?;
    std::fs::write(dir.join("state.json"), raw).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(())
}

fn read_state_json(dir: &Path, daily_limit: u64) -> Result<(Counters, Vec<ProposalId>, Vec<Signal>), StoreError> {
    #[derive(serde::Deserialize)]
    struct StateJson {
        #[serde(default)]
        counters: Option<Counters>,
        #[serde(default)]
        pending_order: Vec<ProposalId>,
        #[serde(default)]
        signals: Vec<Signal>,
    }
    let path = dir.join("state.json");
    if !path.exists() {
        return Ok((Counters::new(daily_limit), Vec::new(), Vec::new()));
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    match serde_json::from_str::<StateJson>(&raw) {
        Ok(parsed) => Ok((
            parsed.counters.unwrap_or_else(|| Counters::new(daily_limit)),
            parsed.pending_order,
            parsed.signals,
        )),
        Err(e) => {
            tracing::warn!(error = %e, "quarantining malformed state.json, starting fresh counters");
            let quarantine = dir.join("state.json.quarantined");
            let _ = std::fs::rename(&path, &quarantine);
            Ok((Counters::new(daily_limit), Vec::new(), Vec::new()))
        }
    }
}

fn read_application_log(dir: &Path) -> Result<(HashMap<ApplicationId, ApplicationEvent>, Vec<ApplicationId>), StoreError> {
    let mut events = HashMap::new();
    let mut order = Vec::new();
    let path = dir.join("applications").join("log.jsonl");
    if !path.exists() {
        return Ok((events, order));
    }
    let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    for line in raw.lines() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<ApplicationEvent>(line) {
            Ok(event) => {
                if !events.contains_key(&event.id) {
                    order.push(event.id);
                }
                events.insert(event.id, event);
            }
            Err(e) => {
                tracing::warn!(error = %e, "skipping malformed application-event log line");
            }
        }
    }
    Ok((events, order))
}

fn append_application_log(dir: &Path, event: &ApplicationEvent) -> Result<(), StoreError> {
    use std::io::Write;
    let path = dir.join("applications").join("log.jsonl");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    writeln!(file, "{}", serde_json::to_string(event)?).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(())
}

fn append_rollback_log(dir: &Path, entry: &RollbackAuditEntry) -> Result<(), StoreError> {
    use std::io::Write;
    let path = dir.join("rollback-log.jsonl");
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| StoreError::Unavailable(e.to_string()))?;
    writeln!(file, "{}", serde_json::to_string(entry)?).map_err(|e| StoreError::Unavailable(e.to_string()))?;
    Ok(())
}

fn read_rollback_records(dir: &Path) -> Result<HashMap<ApplicationId, RollbackRecord>, StoreError> {
    let mut records = HashMap::new();
    let apps_dir = dir.join("applications");
    if !apps_dir.is_dir() {
        return Ok(records);
    }
    for entry in std::fs::read_dir(&apps_dir).map_err(|e| StoreError::Unavailable(e.to_string()))? {
        let entry = entry.map_err(|e| StoreError::Unavailable(e.to_string()))?;
        let path = entry.path();
        let Some(name) = path.file_name().and_then(|n| n.to_str()) else { continue };
        if !name.starts_with("rollback-") || !name.ends_with(".json") {
            continue;
        }
        let raw = std::fs::read_to_string(&path).map_err(|e| StoreError::Unavailable(e.to_string()))?;
        if let Ok(record) = serde_json::from_str::<RollbackRecord>(&raw) {
            records.insert(record.application_id, record);
        }
    }
    Ok(records)
}

#[async_trait]
impl StateStore for FsStateStore {
    async fn put_proposal(&self, proposal: Proposal) -> Result<(), StoreError> {
        self.write_proposal_file(&proposal)?;
        let id = proposal.id;
        let is_pending = proposal.status == ProposalStatus::Pending;
        let mut guard = self.inner.lock().unwrap();
        guard.proposals.insert(id, proposal);
        if is_pending && !guard.pending_order.contains(&id) {
            guard.pending_order.push(id);
        }
        drop(guard);
        self.mark_dirty();
        Ok(())
    }

    async fn update_proposal_status(
        &self,
        id: ProposalId,
        next: ProposalStatus,
        rollback_record_id: Option<ApplicationId>,
    ) -> Result<Proposal, StoreError> {
        let updated = {
            let mut guard = self.inner.lock().unwrap();
            let proposal = guard.proposals.get_mut(&id).ok_or(StoreError::NotFound(id))?;
            if rollback_record_id.is_some() {
                proposal.rollback_record_id = rollback_record_id;
            }
            proposal
                .transition(next)
                .map_err(|e| StoreError::Corrupted(e.to_string()))?;
            if next != ProposalStatus::Pending {
                guard.pending_order.retain(|p| *p != id);
            }
            proposal.clone()
        };
        self.write_proposal_file(&updated)?;
        if next.is_terminal() || next == ProposalStatus::Applied {
            self.flush_now()?;
        } else {
            self.mark_dirty();
        }
        Ok(updated)
    }

    async fn get_proposal(&self, id: ProposalId) -> Result<Option<Proposal>, StoreError> {
        Ok(self.inner.lock().unwrap().proposals.get(&id).cloned())
    }

    async fn list_pending(&self) -> Result<Vec<Proposal>, StoreError> {
        let guard = self.inner.lock().unwrap();
        Ok(guard
            .pending_order
            .iter()
            .filter_map(|id| guard.proposals.get(id).cloned())
            .collect())
    }

    async fn add_signal(&self, signal: Signal) -> Result<(), StoreError> {
        let mut guard = self.inner.lock().unwrap();
        guard.signals.push(signal);
        if guard.signals.len() > MAX_SIGNALS {
            guard.signals.remove(0);
        }
        drop(guard);
        self.mark_dirty();
        Ok(())
    }

    async fn recent_signals(&self, window: usize) -> Result<Vec<Signal>, StoreError> {
        let guard = self.inner.lock().unwrap();
        let start = guard.signals.len().saturating_sub(window);
        Ok(guard.signals[start..].to_vec())
    }

    async fn record_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError> {
        append_application_log(&evolution_dir(&self.root), &event)?;
        let mut guard = self.inner.lock().unwrap();
        guard.application_order.push(event.id);
        guard.application_events.insert(event.id, event);
        Ok(())
    }

    async fn get_application_event(&self, id: ApplicationId) -> Result<Option<ApplicationEvent>, StoreError> {
        Ok(self.inner.lock().unwrap().application_events.get(&id).cloned())
    }

    async fn update_application_event(&self, event: ApplicationEvent) -> Result<(), StoreError> {
        append_application_log(&evolution_dir(&self.root), &event)?;
        self.inner.lock().unwrap().application_events.insert(event.id, event);
        Ok(())
    }

    async fn list_recent_application_events(&self, n: usize) -> Result<Vec<ApplicationEvent>, StoreError> {
        let guard = self.inner.lock().unwrap();
        let start = guard.application_order.len().saturating_sub(n);
        Ok(guard.application_order[start..]
            .iter()
            .rev()
            .filter_map(|id| guard.application_events.get(id).cloned())
            .collect())
    }

    async fn save_rollback_record(&self, record: RollbackRecord) -> Result<(), StoreError> {
        let path = evolution_dir(&self.root)
            .join("applications")
            .join(format!("rollback-{}.json", record.application_id));
        std::fs::write(path, serde_json::to_string_pretty(&record)?)
            .map_err(|e| StoreError::Unavailable(e.to_string()))?;
        self.inner.lock().unwrap().rollback_records.insert(record.application_id, record);
        Ok(())
    }

    async fn get_rollback_record(&self, application_id: ApplicationId) -> Result<Option<RollbackRecord>, StoreError> {
        Ok(self.inner.lock().unwrap().rollback_records.get(&application_id).cloned())
    }

    async fn record_rollback_audit(&self, entry: RollbackAuditEntry) -> Result<(), StoreError> {
        append_rollback_log(&evolution_dir(&self.root), &entry)
    }

    async fn load_counters(&self) -> Result<Counters, StoreError> {
        Ok(self.inner.lock().unwrap().counters.clone())
    }

    async fn save_counters(&self, counters: Counters) -> Result<(), StoreError> {
        self.inner.lock().unwrap().counters = counters;
        self.flush_now()
    }

    async fn snapshot_all(&self) -> Result<StoreSnapshot, StoreError> {
        let guard = self.inner.lock().unwrap();
        Ok(StoreSnapshot {
            proposals: guard.proposals.values().cloned().collect(),
            signals: guard.signals.clone(),
            application_events: guard.application_events.values().cloned().collect(),
            counters: guard.counters.clone(),
        })
    }

    async fn restore_all(&self, snapshot: StoreSnapshot) -> Result<(), StoreError> {
        {
            let mut guard = self.inner.lock().unwrap();
            guard.proposals.clear();
            guard.pending_order.clear();
            for p in &snapshot.proposals {
                if p.status == ProposalStatus::Pending {
                    guard.pending_order.push(p.id);
                }
                guard.proposals.insert(p.id, p.clone());
            }
            guard.signals = snapshot.signals.clone();
            guard.application_events.clear();
            guard.application_order.clear();
            for e in &snapshot.application_events {
                guard.application_order.push(e.id);
                guard.application_events.insert(e.id, e.clone());
            }
            guard.counters = snapshot.counters.clone();
        }
        for p in &snapshot.proposals {
            self.write_proposal_file(p)?;
        }
        self.flush_now()
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
    async fn open_creates_evolution_directory_tree() {
        let dir = tempfile::tempdir().unwrap();
        let _store = FsStateStore::open(dir.path(), 20).await.unwrap();
        assert!(dir.path().join(".evolution/proposals").is_dir());
        assert!(dir.path().join(".evolution/applications").is_dir());
        assert!(dir.path().join(".evolution/backups").is_dir());
    }

    #[tokio::test]
    async fn second_open_on_same_workspace_fails_lock() {
        let dir = tempfile::tempdir().unwrap();
        let _first = FsStateStore::open(dir.path(), 20).await.unwrap();
        let second = FsStateStore::open(dir.path(), 20).await;
        assert!(matches!(second, Err(StoreError::AlreadyLocked(_))));
    }

    #[tokio::test]
    async fn proposal_persisted_to_its_own_file() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStateStore::open(dir.path(), 20).await.unwrap();
        let p = sample_proposal();
        let id = p.id;
        store.put_proposal(p).await.unwrap();
        let path = dir.path().join(format!(".evolution/proposals/{id}.json"));
        assert!(path.exists());
    }

    #[tokio::test]
    async fn reopen_reconstructs_pending_proposals() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let store = FsStateStore::open(dir.path(), 20).await.unwrap();
            let p = sample_proposal();
            let id = p.id;
            store.put_proposal(p).await.unwrap();
            id
        };
        let reopened = FsStateStore::open(dir.path(), 20).await.unwrap();
        let pending = reopened.list_pending().await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].id, id);
    }

    #[tokio::test]
    async fn malformed_proposal_file_is_quarantined_not_dropped() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _store = FsStateStore::open(dir.path(), 20).await.unwrap();
        }
        let bad_path = dir.path().join(".evolution/proposals/not-json.json");
        std::fs::write(&bad_path, "{ this is not valid json").unwrap();
        let _store = FsStateStore::open(dir.path(), 20).await.unwrap();
        assert!(!bad_path.exists());
        assert!(dir
            .path()
            .join(".evolution/proposals/quarantine/not-json.json")
            .exists());
    }

    #[tokio::test]
    async fn applied_transition_flushes_synchronously() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStateStore::open(dir.path(), 20).await.unwrap();
        let p = sample_proposal();
        let id = p.id;
        store.put_proposal(p).await.unwrap();
        store
            .update_proposal_status(id, ProposalStatus::Approved, None)
            .await
            .unwrap();
        let app_id = ApplicationId::generate();
        store
            .update_proposal_status(id, ProposalStatus::Applied, Some(app_id))
            .await
            .unwrap();
        assert!(dir.path().join(".evolution/state.json").exists());
    }

    #[tokio::test]
    async fn rollback_audit_entries_append_to_rollback_log_jsonl() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsStateStore::open(dir.path(), 20).await.unwrap();
        let application_id = ApplicationId::generate();
        let proposal_id = ProposalId::generate();
        store
            .record_rollback_audit(evolution_types::RollbackAuditEntry::new(
                application_id,
                proposal_id,
                "auto-heal",
                "success_rate moved 40.0pp past its 20.0pp threshold",
            ))
            .await
            .unwrap();

        let path = dir.path().join(".evolution/rollback-log.jsonl");
        let raw = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = raw.lines().collect();
        assert_eq!(lines.len(), 1);
        let parsed: evolution_types::RollbackAuditEntry = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(parsed.application_id, application_id);
        assert_eq!(parsed.reason, "auto-heal");
    }
}
