//! Orchestrates feature evaluation into threat predictions.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashMap;

use crate::indicators::{self, ThreatFeatures};
use crate::prediction::{self, ThreatPrediction};

pub struct ThreatDetector {
    confidence_threshold: f64,
    predictions: RwLock<HashMap<String, ThreatPrediction>>,
}

impl ThreatDetector {
    pub fn new(confidence_threshold: f64) -> Self {
        Self {
            confidence_threshold,
            predictions: RwLock::new(HashMap::new()),
        }
    }

    /// Evaluate one principal's trailing feature vector; stores and
    /// returns the resulting prediction if confidence clears the
    /// reporting threshold.
    pub fn evaluate(&self, features: &ThreatFeatures, now: DateTime<Utc>) -> Option<ThreatPrediction> {
        let raised = indicators::evaluate(features, now);
        let built = prediction::build_prediction(&features.principal_id, raised, self.confidence_threshold, now)?;

        self.predictions.write().insert(built.prediction_id.to_string(), built.clone());
        Some(built)
    }

    pub fn get_prediction(&self, prediction_id: &str) -> Option<ThreatPrediction> {
        self.predictions.read().get(prediction_id).cloned()
    }

    pub fn resolve(&self, prediction_id: &str, outcome: Outcome, at: DateTime<Utc>) {
        let mut predictions = self.predictions.write();
        if let Some(prediction) = predictions.get_mut(prediction_id) {
            match outcome {
                Outcome::Confirmed => prediction.confirm(at),
                Outcome::FalsePositive => prediction.mark_false_positive(at),
                Outcome::Prevented => prediction.mark_prevented(at),
            }
        }
    }

    pub fn accuracy(&self) -> f64 {
        let predictions: Vec<ThreatPrediction> = self.predictions.read().values().cloned().collect();
        prediction::accuracy(&predictions)
    }
}

#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    Confirmed,
    FalsePositive,
    Prevented,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn low_confidence_features_produce_no_prediction() {
        let detector = ThreatDetector::new(0.70);
        let features = ThreatFeatures {
            principal_id: "p1".into(),
            distinct_device_count: 3,
            ..Default::default()
        };
        assert!(detector.evaluate(&features, Utc::now()).is_none());
    }

    #[test]
    fn high_confidence_features_are_stored_and_retrievable() {
        let detector = ThreatDetector::new(0.70);
        let features = ThreatFeatures {
            principal_id: "p1".into(),
            failed_login_count: 12,
            ..Default::default()
        };
        let prediction = detector.evaluate(&features, Utc::now()).expect("prediction");
        let fetched = detector.get_prediction(&prediction.prediction_id.to_string()).unwrap();
        assert_eq!(fetched.principal_id, "p1");
    }
}
