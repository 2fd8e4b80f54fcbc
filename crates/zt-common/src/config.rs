//! Enumerated configuration record.
//!
//! Replaces the duck-typed config dictionaries the redesign flags call out:
//! every knob from the external-interfaces configuration surface gets a
//! named field with the documented default. Unknown keys are rejected on
//! load rather than silently ignored.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DecisionConfig {
    pub auto_approve_threshold: f64,
    pub step_up_threshold: f64,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            auto_approve_threshold: 90.0,
            step_up_threshold: 50.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ContinuousAuthConfig {
    pub interval_seconds: u64,
    pub high_risk_interval_seconds: u64,
    pub terminate_threshold: f64,
    pub mfa_threshold: f64,
}

impl Default for ContinuousAuthConfig {
    fn default() -> Self {
        Self {
            interval_seconds: 300,
            high_risk_interval_seconds: 60,
            terminate_threshold: 85.0,
            mfa_threshold: 70.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DeviceConfig {
    pub max_active_per_user: u32,
    pub similarity_threshold: f64,
    pub expire_days: u32,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            max_active_per_user: 3,
            similarity_threshold: 85.0,
            expire_days: 90,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct JitConfig {
    pub min_justification_chars: usize,
    pub max_duration_hours: u32,
}

impl Default for JitConfig {
    fn default() -> Self {
        Self {
            min_justification_chars: 50,
            max_duration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct BreakGlassConfig {
    pub approval_timeout_minutes: u32,
    pub max_session_hours: f64,
}

impl Default for BreakGlassConfig {
    fn default() -> Self {
        Self {
            approval_timeout_minutes: 30,
            max_session_hours: 2.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ThreatConfig {
    pub prediction_confidence_threshold: f64,
    pub alert_threshold: f64,
}

impl Default for ThreatConfig {
    fn default() -> Self {
        Self {
            prediction_confidence_threshold: 0.70,
            alert_threshold: 0.80,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AdaptiveConfig {
    pub window_days: u32,
    pub min_samples: u64,
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            window_days: 30,
            min_samples: 50,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RateLimitConfig {
    pub access_per_hour: u32,
    pub auth_per_minute: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            access_per_hour: 10,
            auth_per_minute: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct CoreConfig {
    pub decision: DecisionConfig,
    pub continuous_auth: ContinuousAuthConfig,
    pub device: DeviceConfig,
    pub jit: JitConfig,
    pub break_glass: BreakGlassConfig,
    pub threat: ThreatConfig,
    pub adaptive: AdaptiveConfig,
    pub ratelimit: RateLimitConfig,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            decision: DecisionConfig::default(),
            continuous_auth: ContinuousAuthConfig::default(),
            device: DeviceConfig::default(),
            jit: JitConfig::default(),
            break_glass: BreakGlassConfig::default(),
            threat: ThreatConfig::default(),
            adaptive: AdaptiveConfig::default(),
            ratelimit: RateLimitConfig::default(),
        }
    }
}

impl CoreConfig {
    /// Parse from a JSON document, rejecting unknown keys at any level.
    pub fn from_json(raw: &str) -> Result<Self, crate::error::ZtError> {
        serde_json::from_str(raw).map_err(|e| crate::error::ZtError::Config(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.decision.auto_approve_threshold, 90.0);
        assert_eq!(cfg.continuous_auth.terminate_threshold, 85.0);
        assert_eq!(cfg.device.max_active_per_user, 3);
        assert_eq!(cfg.break_glass.max_session_hours, 2.0);
    }

    #[test]
    fn rejects_unknown_keys() {
        let raw = r#"{"decision": {"auto_approve_threshold": 95.0, "step_up_threshold": 50.0, "bogus": 1}}"#;
        assert!(CoreConfig::from_json(raw).is_err());
    }
}
