//! Shared rate-limiting and quiet-hours checks. Neither the Scheduler nor
//! the Self-Healing Monitor own this logic; both consult it so a daily
//! budget or a quiet-hours window means the same thing everywhere.

#![deny(unsafe_code)]

mod cooldown;

pub use cooldown::Cooldown;

use chrono::{DateTime, Local, Timelike, Utc};
use evolution_types::{Counters, QuietHours};

/// Can the Executor run another proposal today?
pub fn can_execute(counters: &Counters) -> bool {
    counters.remaining_today() > 0
}

/// Can the Self-Healing Monitor issue another *automatic* rollback today?
/// Manual rollbacks (reason tag `manual`) bypass this cap entirely.
pub fn can_auto_rollback(counters: &Counters, max_daily_rollbacks: u64) -> bool {
    counters.rollbacks_today < max_daily_rollbacks
}

/// Is `now` inside the configured quiet-hours window? Compared against the
/// local hour, consistent with `Counters`' local-day rollover.
pub fn in_quiet_hours(quiet_hours: &QuietHours, now: DateTime<Utc>) -> bool {
    let local_hour = now.with_timezone(&Local).time().hour() as u8;
    quiet_hours.contains(local_hour)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn can_execute_false_once_budget_exhausted() {
        let mut counters = Counters::new(1);
        counters.record_success(10);
        assert!(!can_execute(&counters));
    }

    #[test]
    fn can_auto_rollback_false_at_cap() {
        let mut counters = Counters::new(100);
        counters.record_rollback();
        counters.record_rollback();
        counters.record_rollback();
        assert!(!can_auto_rollback(&counters, 3));
    }

    #[test]
    fn can_auto_rollback_true_below_cap() {
        let mut counters = Counters::new(100);
        counters.record_rollback();
        assert!(can_auto_rollback(&counters, 3));
    }

    #[test]
    fn disabled_quiet_hours_never_apply() {
        let quiet_hours = QuietHours {
            enabled: false,
            start_hour: 22,
            end_hour: 6,
        };
        assert!(!in_quiet_hours(&quiet_hours, Utc::now()));
    }
}
