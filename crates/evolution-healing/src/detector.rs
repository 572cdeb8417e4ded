//! Pure degradation predicate: compares a pre- and post-application metrics
//! snapshot and decides whether the drop is severe enough to recommend a
//! rollback.

use evolution_types::{MetricsSnapshot, SelfHealConfig};

#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RollbackRecommendation {
    Rollback,
    Ignore,
}

#[derive(Clone, Debug, PartialEq)]
pub struct DegradationFactor {
    pub metric: &'static str,
    pub magnitude_pct: f64,
    pub threshold_pct: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Verdict {
    pub recommendation: RollbackRecommendation,
    pub severity: f64,
    pub factors: Vec<DegradationFactor>,
}

/// A crossing must exceed its threshold by this hysteresis margin (in
/// percentage points) before it counts toward a rollback recommendation,
/// so readings that barely cross the line don't flap a proposal back and
/// forth between retained and rolled-back.
const HYSTERESIS_MARGIN_PCT: f64 = 2.0;

fn pct_change(pre: f64, post: f64) -> f64 {
    if pre == 0.0 {
        0.0
    } else {
        (post - pre) / pre * 100.0
    }
}

/// Evaluates `post` against `pre` using the three degradation signals in
/// percentage-point terms. Severity is the largest relative magnitude among
/// crossed factors, normalized against its own threshold and capped at 1.0 —
/// the same shape as the donor's per-metric severity formula.
pub fn evaluate(pre: &MetricsSnapshot, post: &MetricsSnapshot, config: &SelfHealConfig) -> Verdict {
    let mut factors = Vec::new();

    let success_drop_pct = pct_change(pre.success_rate, post.success_rate) * -1.0;
    if success_drop_pct > config.success_rate_drop_pct {
        factors.push(DegradationFactor {
            metric: "success_rate",
            magnitude_pct: success_drop_pct,
            threshold_pct: config.success_rate_drop_pct,
        });
    }

    let cost_rise_pct = pct_change(pre.average_cost, post.average_cost);
    if cost_rise_pct > config.cost_increase_pct {
        factors.push(DegradationFactor {
            metric: "average_cost",
            magnitude_pct: cost_rise_pct,
            threshold_pct: config.cost_increase_pct,
        });
    }

    let duration_rise_pct = pct_change(pre.average_duration_ms, post.average_duration_ms);
    if duration_rise_pct > config.duration_increase_pct {
        factors.push(DegradationFactor {
            metric: "average_duration_ms",
            magnitude_pct: duration_rise_pct,
            threshold_pct: config.duration_increase_pct,
        });
    }

    let severity = factors
        .iter()
        .map(|f| (f.magnitude_pct / f.threshold_pct).min(1.0))
        .fold(0.0_f64, f64::max);

    let beyond_hysteresis = factors
        .iter()
        .any(|f| f.magnitude_pct - f.threshold_pct >= HYSTERESIS_MARGIN_PCT);

    let recommendation = if beyond_hysteresis {
        RollbackRecommendation::Rollback
    } else {
        RollbackRecommendation::Ignore
    };

    Verdict {
        recommendation,
        severity,
        factors,
    }
}
