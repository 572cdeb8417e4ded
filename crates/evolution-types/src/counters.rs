use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

/// Per-day aggregates owned exclusively by the State Store and mutated only
/// through its API. Resets on local-day rollover (see DESIGN.md for why
/// local, not UTC, was chosen).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Counters {
    pub schema_version: u32,
    pub last_reset_date: NaiveDate,
    pub daily_limit: u64,
    pub executions_today: u64,
    pub successes_today: u64,
    pub failures_today: u64,
    pub rejections_today: u64,
    pub rollbacks_today: u64,
    pub total_execution_time_ms: u64,
}

impl Counters {
    pub fn new(daily_limit: u64) -> Self {
        Self {
            schema_version: crate::ids::SCHEMA_VERSION,
            last_reset_date: Local::now().date_naive(),
            daily_limit,
            executions_today: 0,
            successes_today: 0,
            failures_today: 0,
            rejections_today: 0,
            rollbacks_today: 0,
            total_execution_time_ms: 0,
        }
    }

    /// Zero the per-day fields if `now`'s local date differs from the last
    /// reset date. Called on every Executor entry, per §4.6.
    pub fn reset_if_new_day(&mut self, now: DateTime<Utc>) {
        let today = now.with_timezone(&Local).date_naive();
        if today != self.last_reset_date {
            self.last_reset_date = today;
            self.executions_today = 0;
            self.successes_today = 0;
            self.failures_today = 0;
            self.rejections_today = 0;
            self.rollbacks_today = 0;
            self.total_execution_time_ms = 0;
        }
    }

    pub fn remaining_today(&self) -> u64 {
        self.daily_limit.saturating_sub(self.executions_today)
    }

    pub fn success_rate(&self) -> f64 {
        if self.executions_today == 0 {
            1.0
        } else {
            self.successes_today as f64 / self.executions_today as f64
        }
    }

    pub fn avg_execution_time_ms(&self) -> f64 {
        if self.executions_today == 0 {
            0.0
        } else {
            self.total_execution_time_ms as f64 / self.executions_today as f64
        }
    }

    pub fn health(&self) -> HealthStatus {
        if self.failures_today >= 5 || self.success_rate() < 0.5 {
            HealthStatus::Unhealthy
        } else if self.failures_today >= 2 || self.success_rate() < 0.8 {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }

    pub fn record_success(&mut self, duration_ms: u64) {
        self.executions_today += 1;
        self.successes_today += 1;
        self.total_execution_time_ms += duration_ms;
    }

    pub fn record_failure(&mut self, duration_ms: u64) {
        self.executions_today += 1;
        self.failures_today += 1;
        self.total_execution_time_ms += duration_ms;
    }

    pub fn record_rejection(&mut self) {
        self.rejections_today += 1;
    }

    pub fn record_rollback(&mut self) {
        self.rollbacks_today += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remaining_floors_at_zero() {
        let mut c = Counters::new(1);
        c.record_success(10);
        c.record_success(10);
        assert_eq!(c.remaining_today(), 0);
    }

    #[test]
    fn health_unhealthy_on_five_failures() {
        let mut c = Counters::new(100);
        for _ in 0..5 {
            c.record_failure(1);
        }
        assert_eq!(c.health(), HealthStatus::Unhealthy);
    }

    #[test]
    fn health_degraded_on_low_success_rate() {
        let mut c = Counters::new(100);
        c.record_success(1);
        c.record_failure(1);
        // 1/2 = 0.5 success rate < 0.8 and failures_today == 1 < 2 -> degraded, not unhealthy
        assert_eq!(c.health(), HealthStatus::Degraded);
    }

    #[test]
    fn invariant_executions_equal_sum() {
        let mut c = Counters::new(100);
        c.record_success(5);
        c.record_failure(5);
        c.record_rejection();
        assert_eq!(c.executions_today, c.successes_today + c.failures_today);
    }

    #[test]
    fn reset_on_new_day_zeros_counters() {
        let mut c = Counters::new(10);
        c.record_success(1);
        c.last_reset_date = NaiveDate::from_ymd_opt(2000, 1, 1).unwrap();
        c.reset_if_new_day(Utc::now());
        assert_eq!(c.executions_today, 0);
    }
}
