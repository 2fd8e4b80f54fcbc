//! Threat prediction assembly and outcome lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zt_common::PredictionId;

use crate::indicators::{IndicatorType, ThreatIndicator};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ThreatType {
    BruteForce,
    PrivilegeEscalation,
    AccountCompromise,
    AutomatedAttack,
    SuspiciousActivity,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum PredictionStatus {
    Pending,
    Confirmed,
    FalsePositive,
    Prevented,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatPrediction {
    pub prediction_id: PredictionId,
    pub principal_id: String,
    pub threat_type: ThreatType,
    pub confidence: f64,
    pub threat_score: f64,
    pub indicators: Vec<ThreatIndicator>,
    pub preventive_measures: Vec<String>,
    pub status: PredictionStatus,
    pub predicted_at: DateTime<Utc>,
    pub outcome_at: Option<DateTime<Utc>>,
}

/// Builds a prediction from a principal's raised indicators. Returns `None`
/// when confidence falls below the reporting threshold (default 0.70) or
/// there are no indicators at all.
pub fn build_prediction(
    principal_id: &str,
    indicators: Vec<ThreatIndicator>,
    confidence_threshold: f64,
    now: DateTime<Utc>,
) -> Option<ThreatPrediction> {
    if indicators.is_empty() {
        return None;
    }

    let threat_score: u32 = indicators.iter().map(|i| i.severity.weight()).sum();
    let confidence = threat_score as f64 / (3.0 * indicators.len() as f64);

    if confidence < confidence_threshold {
        return None;
    }

    let threat_type = dominant_threat_type(&indicators);

    Some(ThreatPrediction {
        prediction_id: PredictionId::new(),
        principal_id: principal_id.to_string(),
        threat_type,
        confidence,
        threat_score: threat_score as f64,
        indicators,
        preventive_measures: preventive_measures_for(threat_type),
        status: PredictionStatus::Pending,
        predicted_at: now,
        outcome_at: None,
    })
}

/// The dominant indicator (highest severity, ties broken by declaration
/// order) decides the threat type.
fn dominant_threat_type(indicators: &[ThreatIndicator]) -> ThreatType {
    let dominant = indicators
        .iter()
        .max_by_key(|i| i.severity.weight())
        .expect("non-empty indicators");

    match dominant.indicator_type {
        IndicatorType::FailedLogins => ThreatType::BruteForce,
        IndicatorType::ScopeDeviation => ThreatType::PrivilegeEscalation,
        IndicatorType::GeographicAnomaly => ThreatType::AccountCompromise,
        IndicatorType::FrequencyChange => ThreatType::AutomatedAttack,
        IndicatorType::UnusualHour | IndicatorType::DeviceCount | IndicatorType::DenialRatio => {
            ThreatType::SuspiciousActivity
        }
    }
}

fn preventive_measures_for(threat_type: ThreatType) -> Vec<String> {
    match threat_type {
        ThreatType::BruteForce => vec!["block offending device fingerprint".into(), "alert administrators".into()],
        ThreatType::PrivilegeEscalation => vec!["require step-up MFA".into(), "review recent policy grants".into()],
        ThreatType::AccountCompromise => vec!["force re-authentication".into(), "terminate active sessions".into()],
        ThreatType::AutomatedAttack => vec!["rate-limit principal".into(), "lock affected resource segment".into()],
        ThreatType::SuspiciousActivity => vec!["monitor session closely".into()],
    }
}

impl ThreatPrediction {
    pub fn confirm(&mut self, at: DateTime<Utc>) {
        self.status = PredictionStatus::Confirmed;
        self.outcome_at = Some(at);
    }

    pub fn mark_false_positive(&mut self, at: DateTime<Utc>) {
        self.status = PredictionStatus::FalsePositive;
        self.outcome_at = Some(at);
    }

    pub fn mark_prevented(&mut self, at: DateTime<Utc>) {
        self.status = PredictionStatus::Prevented;
        self.outcome_at = Some(at);
    }

    pub fn should_alert_administrators(&self) -> bool {
        self.confidence >= 0.80
    }
}

/// Accuracy over a set of resolved predictions: (confirmed + prevented) / total.
pub fn accuracy(predictions: &[ThreatPrediction]) -> f64 {
    let resolved: Vec<&ThreatPrediction> = predictions
        .iter()
        .filter(|p| !matches!(p.status, PredictionStatus::Pending))
        .collect();
    if resolved.is_empty() {
        return 0.0;
    }
    let good = resolved
        .iter()
        .filter(|p| matches!(p.status, PredictionStatus::Confirmed | PredictionStatus::Prevented))
        .count();
    good as f64 / resolved.len() as f64
}
