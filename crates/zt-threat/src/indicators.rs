//! Seven-dimension threat feature vector and threshold rules.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::events::Severity;

/// Aggregated per-principal signals over the trailing 24h, as assembled by
/// the caller from audit history and device registry state.
#[derive(Debug, Clone, Default)]
pub struct ThreatFeatures {
    pub principal_id: String,
    pub failed_login_count: u32,
    pub unusual_hour_ratio: f64,
    /// Fraction of today's accessed resource types outside the 7-day
    /// typical set.
    pub scope_deviation_ratio: f64,
    /// Today's request frequency divided by the 7-day mean; 1.0 is normal.
    pub frequency_change_ratio: f64,
    pub geographic_anomaly_ratio: f64,
    pub distinct_device_count: u32,
    pub denial_ratio: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum IndicatorType {
    FailedLogins,
    UnusualHour,
    ScopeDeviation,
    FrequencyChange,
    GeographicAnomaly,
    DeviceCount,
    DenialRatio,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThreatIndicator {
    pub principal_id: String,
    pub indicator_type: IndicatorType,
    pub severity: Severity,
    pub value: f64,
    pub description: String,
    pub observed_at: DateTime<Utc>,
}

/// Evaluate the threshold rules table against one principal's feature
/// vector; each rule independently raises at most one indicator.
pub fn evaluate(features: &ThreatFeatures, now: DateTime<Utc>) -> Vec<ThreatIndicator> {
    let mut indicators = Vec::new();
    let p = &features.principal_id;

    if features.failed_login_count >= 10 {
        indicators.push(indicator(p, IndicatorType::FailedLogins, Severity::High, features.failed_login_count as f64, now));
    } else if features.failed_login_count >= 5 {
        indicators.push(indicator(p, IndicatorType::FailedLogins, Severity::Medium, features.failed_login_count as f64, now));
    }

    if features.unusual_hour_ratio > 0.30 {
        indicators.push(indicator(p, IndicatorType::UnusualHour, Severity::Medium, features.unusual_hour_ratio, now));
    }

    if features.scope_deviation_ratio > 0.40 {
        indicators.push(indicator(p, IndicatorType::ScopeDeviation, Severity::Medium, features.scope_deviation_ratio, now));
    }

    if features.frequency_change_ratio > 2.0 {
        indicators.push(indicator(p, IndicatorType::FrequencyChange, Severity::Medium, features.frequency_change_ratio, now));
    }

    if features.geographic_anomaly_ratio > 0.30 {
        indicators.push(indicator(p, IndicatorType::GeographicAnomaly, Severity::High, features.geographic_anomaly_ratio, now));
    }

    if features.distinct_device_count >= 3 {
        indicators.push(indicator(p, IndicatorType::DeviceCount, Severity::Medium, features.distinct_device_count as f64, now));
    }

    if features.denial_ratio > 0.50 {
        indicators.push(indicator(p, IndicatorType::DenialRatio, Severity::High, features.denial_ratio, now));
    }

    indicators
}

fn indicator(
    principal_id: &str,
    indicator_type: IndicatorType,
    severity: Severity,
    value: f64,
    observed_at: DateTime<Utc>,
) -> ThreatIndicator {
    ThreatIndicator {
        principal_id: principal_id.to_string(),
        indicator_type,
        severity,
        value,
        description: format!("{:?} at {:.2} ({:?})", indicator_type, value, severity),
        observed_at,
    }
}
