//! In-process fan-out of the engine's lifecycle events over
//! `tokio::sync::broadcast`. A subscriber is a plain `broadcast::Receiver`;
//! it is removed by being dropped, and one subscriber lagging or panicking
//! in its own task cannot affect the emitter or any other subscriber — the
//! isolation the donor gets from callbacks is inherent here because nothing
//! subscriber-owned ever runs inside `emit`.

#![deny(unsafe_code)]

use chrono::{DateTime, Utc};
use evolution_types::{ApplicationId, HealthStatus, ProposalId};
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::broadcast;

/// The closed set of events the engine emits.
#[derive(Clone, Debug, PartialEq)]
pub enum EventKind {
    SchedulerTick {
        proposals_considered: usize,
        skipped_reason: Option<String>,
    },
    ExecutionStarted { proposal_id: ProposalId },
    ExecutionCompleted { proposal_id: ProposalId },
    ExecutionFailed { proposal_id: ProposalId, reason: String },
    ApprovalRequired { proposal_id: ProposalId, reason: String },
    RollbackStarted { application_id: ApplicationId, reason: String },
    RollbackCompleted { application_id: ApplicationId },
    ProposalEscalated { proposal_id: ProposalId, reason: String },
    HealthCheck { status: HealthStatus, reason: String },
}

#[derive(Clone, Debug, PartialEq)]
pub struct EngineEvent {
    pub timestamp: DateTime<Utc>,
    pub kind: EventKind,
}

/// Bounded fan-out bus plus a small in-process ring of recent events so the
/// CLI can inspect history without holding a live subscription.
pub struct EventBus {
    tx: broadcast::Sender<EngineEvent>,
    history: Mutex<VecDeque<EngineEvent>>,
    max_history: usize,
}

impl EventBus {
    pub fn new(max_history: usize) -> Self {
        let (tx, _rx) = broadcast::channel(1024);
        Self {
            tx,
            history: Mutex::new(VecDeque::new()),
            max_history,
        }
    }

    /// Emits `kind` with the current timestamp. A send with no active
    /// subscribers is not an error.
    pub fn emit(&self, kind: EventKind) {
        let event = EngineEvent {
            timestamp: Utc::now(),
            kind,
        };
        {
            let mut history = self.history.lock().unwrap();
            history.push_back(event.clone());
            if history.len() > self.max_history {
                history.pop_front();
            }
        }
        if self.tx.send(event).is_err() {
            tracing::trace!("event emitted with no active subscribers");
        }
    }

    /// A new subscription. Dropping the receiver unsubscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.tx.subscribe()
    }

    /// The last `max_history` events emitted, oldest first.
    pub fn recent_events(&self) -> Vec<EngineEvent> {
        self.history.lock().unwrap().iter().cloned().collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(1000)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscriber_receives_emitted_event() {
        let bus = EventBus::default();
        let mut rx = bus.subscribe();
        bus.emit(EventKind::ExecutionStarted {
            proposal_id: ProposalId::generate(),
        });
        let event = rx.recv().await.unwrap();
        assert!(matches!(event.kind, EventKind::ExecutionStarted { .. }));
    }

    #[tokio::test]
    async fn emit_with_no_subscribers_does_not_panic() {
        let bus = EventBus::default();
        bus.emit(EventKind::SchedulerTick { proposals_considered: 0, skipped_reason: None });
    }

    #[tokio::test]
    async fn history_is_capped_at_max_history() {
        let bus = EventBus::new(2);
        for _ in 0..5 {
            bus.emit(EventKind::SchedulerTick { proposals_considered: 0, skipped_reason: None });
        }
        assert_eq!(bus.recent_events().len(), 2);
    }

    #[tokio::test]
    async fn multiple_subscribers_each_receive_the_same_event() {
        let bus = EventBus::default();
        let mut rx1 = bus.subscribe();
        let mut rx2 = bus.subscribe();
        bus.emit(EventKind::ProposalEscalated {
            proposal_id: ProposalId::generate(),
            reason: "aged out".into(),
        });
        assert!(rx1.recv().await.is_ok());
        assert!(rx2.recv().await.is_ok());
    }

    #[tokio::test]
    async fn dropped_subscriber_does_not_affect_emitter() {
        let bus = EventBus::default();
        let rx = bus.subscribe();
        drop(rx);
        bus.emit(EventKind::HealthCheck {
            status: HealthStatus::Healthy,
            reason: "ok".into(),
        });
    }
}
