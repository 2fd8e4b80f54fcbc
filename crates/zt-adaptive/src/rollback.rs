//! Rule-snapshot history for adjustment rollback.
//!
//! Each applied adjustment pushes the prior rule snapshot onto a
//! per-policy stack before mutating; rollback pops the most recent
//! snapshot and hot-swaps it back in via `ArcSwap`, the same lock-free
//! swap this crate's predecessor used for its hot policy-rule path.

use std::sync::Arc;

use arc_swap::ArcSwap;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuleSnapshot {
    pub policy_id: String,
    pub min_confidence: f64,
    pub taken_at: chrono::DateTime<chrono::Utc>,
}

pub struct SnapshotHistory {
    current: DashMap<String, Arc<ArcSwap<RuleSnapshot>>>,
    history: DashMap<String, Vec<RuleSnapshot>>,
}

impl SnapshotHistory {
    pub fn new() -> Self {
        Self {
            current: DashMap::new(),
            history: DashMap::new(),
        }
    }

    /// Records the pre-change snapshot and hot-swaps in the new value.
    pub fn apply(&self, policy_id: &str, new_min_confidence: f64, at: chrono::DateTime<chrono::Utc>) {
        let existing = self.current.get(policy_id).map(|s| (**s.load()).clone());

        let slot = self
            .current
            .entry(policy_id.to_string())
            .or_insert_with(|| {
                Arc::new(ArcSwap::from_pointee(RuleSnapshot {
                    policy_id: policy_id.to_string(),
                    min_confidence: new_min_confidence,
                    taken_at: at,
                }))
            })
            .clone();

        if let Some(prior) = existing {
            self.history.entry(policy_id.to_string()).or_default().push(prior);
        }

        slot.store(Arc::new(RuleSnapshot {
            policy_id: policy_id.to_string(),
            min_confidence: new_min_confidence,
            taken_at: at,
        }));
    }

    pub fn current(&self, policy_id: &str) -> Option<f64> {
        self.current.get(policy_id).map(|s| s.load().min_confidence)
    }

    /// Restores the most-recent prior snapshot, if one exists.
    pub fn rollback(&self, policy_id: &str) -> Option<RuleSnapshot> {
        let mut history = self.history.get_mut(policy_id)?;
        let prior = history.pop()?;

        if let Some(slot) = self.current.get(policy_id) {
            slot.store(Arc::new(prior.clone()));
        }
        Some(prior)
    }
}

impl Default for SnapshotHistory {
    fn default() -> Self {
        Self::new()
    }
}
