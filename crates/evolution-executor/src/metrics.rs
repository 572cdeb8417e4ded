//! The pre-application metrics snapshot is sourced from whatever tracks
//! assistant performance outside this engine. Expressed as an injectable
//! capability, the same shape as `TargetFs`/`CouncilOracle`, so tests never
//! depend on a real metrics backend.

use async_trait::async_trait;
use evolution_types::MetricsSnapshot;

#[async_trait]
pub trait MetricsSource: Send + Sync {
    async fn current_metrics(&self) -> MetricsSnapshot;
}

/// Returns a fixed snapshot. Used in tests and as a placeholder until a real
/// metrics backend is wired in.
pub struct StaticMetricsSource {
    snapshot: MetricsSnapshot,
}

impl StaticMetricsSource {
    pub fn new(snapshot: MetricsSnapshot) -> Self {
        Self { snapshot }
    }

    pub fn neutral() -> Self {
        Self {
            snapshot: MetricsSnapshot {
                success_rate: 1.0,
                average_cost: 0.0,
                average_duration_ms: 0.0,
                task_count: 0,
                timestamp: chrono::Utc::now(),
            },
        }
    }
}

#[async_trait]
impl MetricsSource for StaticMetricsSource {
    async fn current_metrics(&self) -> MetricsSnapshot {
        self.snapshot
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn neutral_source_reports_perfect_success_rate() {
        let source = StaticMetricsSource::neutral();
        assert_eq!(source.current_metrics().await.success_rate, 1.0);
    }
}
