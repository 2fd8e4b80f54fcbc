//! Access decision fusion (C7): combines C1-C3/C6 signals into one
//! confidence score and an `AccessOutcome`.

use std::collections::HashMap;

use crate::policy::Verdict;
use crate::types::AccessOutcome;

#[derive(Debug, Clone, Copy)]
pub struct ConfidenceInputs {
    pub device_fingerprint: f64,
    pub behavioral: f64,
    pub peer_analysis: f64,
    pub temporal: f64,
    pub historical: f64,
    pub justification: f64,
}

const WEIGHTS: [(&str, f64); 6] = [
    ("device_fingerprint", 0.25),
    ("behavioral_patterns", 0.20),
    ("peer_analysis", 0.20),
    ("temporal_modeling", 0.15),
    ("historical_patterns", 0.10),
    ("justification_quality", 0.10),
];

#[derive(Debug, Clone)]
pub struct FusedDecision {
    pub decision: AccessOutcome,
    pub combined_confidence: f64,
    pub breakdown: HashMap<String, f64>,
    pub denial_reason: Option<String>,
}

/// Fuse confidence components with the ML adjustment and anomaly penalty,
/// then apply the policy verdict and decision boundaries.
pub fn decide(inputs: ConfidenceInputs, ml_confidence: f64, is_anomalous: bool, policy_verdict: Option<&Verdict>) -> FusedDecision {
    let components = [
        inputs.device_fingerprint,
        inputs.behavioral,
        inputs.peer_analysis,
        inputs.temporal,
        inputs.historical,
        inputs.justification,
    ];

    let mut breakdown = HashMap::new();
    for ((name, weight), value) in WEIGHTS.iter().zip(components.iter()) {
        breakdown.insert(name.to_string(), weight * value);
    }

    let raw_confidence: f64 = WEIGHTS.iter().zip(components.iter()).map(|((_, w), v)| w * v).sum();
    let mut combined = 0.6 * raw_confidence + 0.4 * ml_confidence;
    if is_anomalous {
        combined *= 0.70;
    }
    let combined_confidence = combined.clamp(0.0, 100.0);

    if let Some(Verdict::Deny { reason }) = policy_verdict {
        return FusedDecision {
            decision: AccessOutcome::Denied,
            combined_confidence,
            breakdown,
            denial_reason: Some(reason.to_string()),
        };
    }

    let policy_requires_mfa = matches!(
        policy_verdict,
        Some(Verdict::Allow { requires_mfa: true, .. })
    );
    let policy_forbids_mfa = matches!(
        policy_verdict,
        Some(Verdict::Allow { forbids_mfa_path: true, .. })
    );

    let decision = if combined_confidence >= 90.0 {
        if policy_requires_mfa {
            AccessOutcome::GrantedWithMfa
        } else {
            AccessOutcome::Granted
        }
    } else if combined_confidence >= 50.0 {
        if policy_forbids_mfa {
            AccessOutcome::PendingApproval
        } else {
            AccessOutcome::GrantedWithMfa
        }
    } else {
        AccessOutcome::Denied
    };

    let denial_reason = matches!(decision, AccessOutcome::Denied).then(|| "LOW_CONFIDENCE".to_string());

    FusedDecision {
        decision,
        combined_confidence,
        breakdown,
        denial_reason,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strong_inputs() -> ConfidenceInputs {
        ConfidenceInputs {
            device_fingerprint: 95.0,
            behavioral: 90.0,
            peer_analysis: 80.0,
            temporal: 100.0,
            historical: 90.0,
            justification: 90.0,
        }
    }

    #[test]
    fn high_confidence_grants_without_mfa_requirement() {
        let result = decide(strong_inputs(), 95.0, false, None);
        assert_eq!(result.decision, AccessOutcome::Granted);
    }

    #[test]
    fn mfa_mandating_policy_grants_with_mfa_even_at_high_confidence() {
        let verdict = Verdict::Allow { candidate_confidence: 1.0, requires_mfa: true, forbids_mfa_path: false };
        let result = decide(strong_inputs(), 95.0, false, Some(&verdict));
        assert_eq!(result.decision, AccessOutcome::GrantedWithMfa);
    }

    #[test]
    fn mid_confidence_without_mfa_forbidden_steps_up() {
        let weak = ConfidenceInputs {
            device_fingerprint: 60.0,
            behavioral: 60.0,
            peer_analysis: 50.0,
            temporal: 60.0,
            historical: 50.0,
            justification: 60.0,
        };
        let result = decide(weak, 60.0, false, None);
        assert_eq!(result.decision, AccessOutcome::GrantedWithMfa);
    }

    #[test]
    fn mid_confidence_with_mfa_forbidden_pends_approval() {
        let weak = ConfidenceInputs {
            device_fingerprint: 60.0,
            behavioral: 60.0,
            peer_analysis: 50.0,
            temporal: 60.0,
            historical: 50.0,
            justification: 60.0,
        };
        let verdict = Verdict::Allow { candidate_confidence: 1.0, requires_mfa: false, forbids_mfa_path: true };
        let result = decide(weak, 60.0, false, Some(&verdict));
        assert_eq!(result.decision, AccessOutcome::PendingApproval);
    }

    #[test]
    fn low_confidence_denies_with_reason() {
        let poor = ConfidenceInputs {
            device_fingerprint: 10.0,
            behavioral: 20.0,
            peer_analysis: 10.0,
            temporal: 20.0,
            historical: 10.0,
            justification: 10.0,
        };
        let result = decide(poor, 10.0, false, None);
        assert_eq!(result.decision, AccessOutcome::Denied);
        assert_eq!(result.denial_reason.as_deref(), Some("LOW_CONFIDENCE"));
    }

    #[test]
    fn policy_deny_overrides_high_confidence() {
        let verdict = Verdict::Deny { reason: "ROLE_NOT_ALLOWED" };
        let result = decide(strong_inputs(), 95.0, false, Some(&verdict));
        assert_eq!(result.decision, AccessOutcome::Denied);
        assert_eq!(result.denial_reason.as_deref(), Some("ROLE_NOT_ALLOWED"));
    }

    #[test]
    fn anomaly_applies_thirty_percent_penalty() {
        let with_anomaly = decide(strong_inputs(), 95.0, true, None);
        let without = decide(strong_inputs(), 95.0, false, None);
        assert!(with_anomaly.combined_confidence < without.combined_confidence);
    }
}
