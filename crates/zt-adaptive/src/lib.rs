//! Adaptive policy effectiveness engine.
//!
//! Every access decision ultimately resolves to a `PolicyOutcome`
//! (success, denied, or security_incident). This crate rolls those up
//! per policy over a trailing window, scores effectiveness, proposes
//! confidence-threshold adjustments, and keeps enough history to roll
//! an applied adjustment back.

mod outcomes;
mod rollback;

pub use outcomes::{Adjustment, OutcomeKind, OutcomeTracker, PolicyOutcome, Rates};
pub use rollback::{RuleSnapshot, SnapshotHistory};

/// Combines outcome tracking and rollback bookkeeping behind one handle.
pub struct AdaptivePolicyEngine {
    tracker: OutcomeTracker,
    snapshots: SnapshotHistory,
    min_samples: u64,
}

impl AdaptivePolicyEngine {
    pub fn new(window_days: u32, min_samples: u64) -> Self {
        Self {
            tracker: OutcomeTracker::new(window_days),
            snapshots: SnapshotHistory::new(),
            min_samples,
        }
    }

    pub fn record(&self, outcome: PolicyOutcome) {
        self.tracker.record(outcome);
    }

    /// Evaluate effectiveness and propose (but do not apply) an
    /// adjustment for one policy at `at`.
    pub fn evaluate(&self, policy_id: &str, at: chrono::DateTime<chrono::Utc>) -> (Rates, Adjustment) {
        let rates = self.tracker.rates(policy_id, at);
        let adjustment = outcomes::propose_adjustment(&rates, self.min_samples);
        (rates, adjustment)
    }

    /// Simulate the proposed adjustment's effect on the same window.
    pub fn simulate(&self, policy_id: &str, adjustment: Adjustment, at: chrono::DateTime<chrono::Utc>) -> Rates {
        self.tracker.simulate(policy_id, adjustment, at)
    }

    /// Apply an adjustment to the policy's `min_confidence`, recording a
    /// rollback snapshot first.
    pub fn apply(&self, policy_id: &str, current_min_confidence: f64, adjustment: Adjustment, at: chrono::DateTime<chrono::Utc>) -> f64 {
        let new_value = adjustment.apply(current_min_confidence);
        self.snapshots.apply(policy_id, new_value, at);
        new_value
    }

    pub fn rollback(&self, policy_id: &str) -> Option<RuleSnapshot> {
        self.snapshots.rollback(policy_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    #[test]
    fn apply_then_rollback_restores_confidence() {
        let engine = AdaptivePolicyEngine::new(30, 50);
        let now = Utc::now();
        let applied = engine.apply("pol1", 70.0, Adjustment::IncreaseConfidence { by: 5.0 }, now);
        assert_eq!(applied, 75.0);

        let restored = engine.rollback("pol1").unwrap();
        assert_eq!(restored.min_confidence, 70.0);
    }
}
