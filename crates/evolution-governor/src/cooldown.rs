use std::sync::atomic::{AtomicU64, Ordering};

/// A minimum spacing between repeated events, shared across tasks via
/// interior atomics. The first call always fires (no cooldown applies until
/// something has actually happened once).
pub struct Cooldown {
    period_ms: u64,
    last_fired_ms: AtomicU64,
}

impl Cooldown {
    pub fn new(period_ms: u64) -> Self {
        Self {
            period_ms,
            last_fired_ms: AtomicU64::new(0),
        }
    }

    /// Whether an event may fire at `now_ms`. Records the firing time when it
    /// returns `true`; callers that only want to check without consuming the
    /// cooldown should not call this from a read-only path.
    pub fn try_fire(&self, now_ms: u64) -> bool {
        let last = self.last_fired_ms.load(Ordering::SeqCst);
        if last != 0 && now_ms.saturating_sub(last) < self.period_ms {
            return false;
        }
        self.last_fired_ms.store(now_ms, Ordering::SeqCst);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_call_always_fires() {
        let cooldown = Cooldown::new(5_000);
        assert!(cooldown.try_fire(1_000));
    }

    #[test]
    fn second_call_within_period_is_blocked() {
        let cooldown = Cooldown::new(5_000);
        assert!(cooldown.try_fire(1_000));
        assert!(!cooldown.try_fire(3_000));
    }

    #[test]
    fn call_after_period_elapses_fires_again() {
        let cooldown = Cooldown::new(5_000);
        assert!(cooldown.try_fire(1_000));
        assert!(cooldown.try_fire(7_000));
    }
}
