//! Zero-trust continuous access control core.
//!
//! Composes intent scoring (C1), device fingerprinting (C2), contextual
//! intelligence (C3), policy evaluation (C6) and decision fusion (C7)
//! behind one [`AccessCore`] handle, backed by the JIT elevation (C8),
//! break-glass (C9), continuous monitoring (C10) and segment-locking (C11)
//! primitives, a tamper-evident audit chain and an in-process event bus
//! (C13). Behavioral deviation and ML anomaly scoring are delegated to the
//! sibling `zt-behavioral` and `zt-ml` crates rather than reimplemented
//! here; `zt-threat` and `zt-adaptive` consume this crate's audit and
//! policy-outcome events but are composed by the deployment, not by
//! `AccessCore` itself, so that threat response and policy tuning can run
//! as independent services against the same audit stream.

pub mod audit;
pub mod breakglass;
pub mod context;
pub mod continuous;
pub mod decision;
pub mod device;
pub mod eventbus;
pub mod intent;
pub mod jit;
pub mod microseg;
pub mod policy;
pub mod ratelimit;
pub mod types;

pub use audit::{AuditChain, AuditEvent, ChainReceipt};
pub use breakglass::{BreakGlassManager, IncidentReport};
pub use context::{ContextInputs, ContextResult};
pub use continuous::{Action as ContinuousAction, ContinuousAuthMonitor, RiskFactors};
pub use decision::{ConfidenceInputs, FusedDecision};
pub use device::{Characteristics, DeviceRecord, DeviceRegistry};
pub use eventbus::{Event, EventBus};
pub use intent::IntentResult;
pub use jit::{JitManager, RouteOutcome};
pub use microseg::SegmentRegistry;
pub use policy::{EvalRequest, Policy, PolicyStore, Verdict};
pub use ratelimit::RateLimiter;
pub use types::*;

use chrono::{DateTime, Utc};
use serde_json::json;
use zt_behavioral::{BehavioralEngine, BehavioralSample};
use zt_common::{CoreConfig, EventId, ZtError, ZtResult};
use zt_ml::{AnomalyDetector, SessionFeatures as MlSessionFeatures};

/// Everything the C1-C7 decision pipeline needs beyond the request itself:
/// the principal's current device sample (if any), the contextual-signal
/// inputs for C3, a raw behavioral sample for the sibling biometrics
/// engine, the ML feature vector for anomaly scoring, and the peer-cohort
/// confidence score. Peer-cohort comparison needs an organization-wide
/// access-pattern store this crate doesn't own, so it arrives as a
/// pre-computed input rather than being derived here.
pub struct EvaluationContext<'a> {
    pub principal: &'a types::Principal,
    pub device_characteristics: Option<&'a device::Characteristics>,
    pub context_inputs: context::ContextInputs<'a>,
    pub behavioral_sample: Option<BehavioralSample>,
    pub ml_features: MlSessionFeatures,
    pub peer_analysis_score: f64,
    pub resource_department: &'a str,
}

/// Top-level handle wiring every module behind the access-decision
/// pipeline. One instance per deployment; all interior state is
/// concurrency-safe so the same handle is shared across request handlers.
pub struct AccessCore {
    pub config: CoreConfig,
    pub devices: DeviceRegistry,
    pub policies: PolicyStore,
    pub segments: SegmentRegistry,
    pub audit: AuditChain,
    pub events: EventBus,
    pub continuous: ContinuousAuthMonitor,
    pub jit: JitManager,
    pub break_glass: BreakGlassManager,
    pub behavioral: BehavioralEngine,
    pub anomaly: AnomalyDetector,
    pub ratelimit: RateLimiter,
}

impl AccessCore {
    pub fn new(config: CoreConfig) -> Self {
        let jit = JitManager::new(
            config.decision.auto_approve_threshold,
            config.decision.step_up_threshold,
            config.jit.min_justification_chars,
            config.jit.max_duration_hours,
        );
        let devices = DeviceRegistry::new(config.device.max_active_per_user, config.device.expire_days);
        let continuous = ContinuousAuthMonitor::new(
            config.continuous_auth.interval_seconds,
            config.continuous_auth.high_risk_interval_seconds,
            config.continuous_auth.terminate_threshold,
            config.continuous_auth.mfa_threshold,
        );
        let break_glass = BreakGlassManager::new(
            config.break_glass.max_session_hours,
            config.break_glass.approval_timeout_minutes,
        );

        Self {
            config,
            devices,
            policies: PolicyStore::new(),
            segments: SegmentRegistry::new(),
            audit: AuditChain::new(),
            events: EventBus::new(),
            continuous,
            jit,
            break_glass,
            behavioral: BehavioralEngine::new(),
            anomaly: AnomalyDetector::new(0.7),
            ratelimit: RateLimiter::new(),
        }
    }

    /// Runs one access request through C1 (intent) -> C2 (device) -> C3
    /// (context) -> behavioral/ML scoring -> C6 (policy) -> C7 (fusion),
    /// then records the decision to the audit chain and publishes it on
    /// the `decision.made` topic.
    pub fn evaluate_access(&self, request: &types::AccessRequest, ctx: &EvaluationContext, now: DateTime<Utc>) -> ZtResult<types::AccessDecision> {
        let (rate_limit_count, rate_limit_window) = match self.policies.rate_limit_for(&request.resource_type) {
            Some(rule_limit) => (rule_limit.count, chrono::Duration::seconds(rule_limit.window_seconds as i64)),
            None => (self.config.ratelimit.access_per_hour, chrono::Duration::hours(1)),
        };
        if !self.ratelimit.check_and_record(request.principal_id.as_str(), rate_limit_count, rate_limit_window, now) {
            return Err(ZtError::RateLimitExceeded);
        }

        let intent_result = intent::analyze(&request.intent_text, &request.resource_type, role_label(ctx.principal.role));

        let device_fingerprint_confidence = match ctx.device_characteristics {
            Some(characteristics) => self
                .devices
                .validate(ctx.principal.principal_id.as_str(), characteristics, now)
                .map(|r| r.similarity)
                .unwrap_or(50.0),
            None => 50.0,
        };
        let device_anomalous = ctx.device_characteristics.map(looks_anomalous).unwrap_or(false);

        let context_result = context::evaluate(&ctx.context_inputs);

        let behavioral_confidence = match &ctx.behavioral_sample {
            Some(sample) => {
                let deviation = self.behavioral.score(ctx.principal.principal_id.as_str(), sample);
                (100.0 - deviation.score_or_neutral()).clamp(0.0, 100.0)
            }
            None => 50.0,
        };
        let behavioral_anomalous = ctx
            .behavioral_sample
            .as_ref()
            .map(|sample| self.behavioral.score(ctx.principal.principal_id.as_str(), sample).is_anomalous())
            .unwrap_or(false);

        let risk_score = self.anomaly.analyze(&ctx.ml_features);

        let confidence_inputs = decision::ConfidenceInputs {
            device_fingerprint: device_fingerprint_confidence,
            behavioral: behavioral_confidence,
            peer_analysis: ctx.peer_analysis_score,
            temporal: context_result.sub_scores.get("time_appropriateness").copied().unwrap_or(50.0),
            historical: context_result.sub_scores.get("historical_trust").copied().unwrap_or(50.0),
            justification: intent_result.intent_score,
        };

        let policy_eval = policy::evaluate(
            &self.policies,
            &policy::EvalRequest {
                resource_type: &request.resource_type,
                role: ctx.principal.role,
                principal_department: &ctx.principal.department,
                resource_department: ctx.resource_department,
                at: now,
                intent_score: intent_result.intent_score,
                source_ip: &request.ip,
                authorized_projects: &request.authorized_projects,
            },
        );

        let is_anomalous = device_anomalous || behavioral_anomalous || risk_score.is_anomalous() || context_result.requires_step_up_auth;

        let fused = decision::decide(
            confidence_inputs,
            risk_score.ml_confidence(),
            is_anomalous,
            policy_eval.as_ref().map(|e| &e.verdict),
        );

        let policies_applied = policy_eval.map(|e| e.policies_applied).unwrap_or_default();
        let session_cap_hours = self.config.jit.max_duration_hours as f64;
        let session_hours = request.requested_duration_hours.unwrap_or(session_cap_hours).clamp(0.0, session_cap_hours);
        let expires_at = matches!(fused.decision, types::AccessOutcome::Granted | types::AccessOutcome::GrantedWithMfa)
            .then(|| now + chrono::Duration::seconds((session_hours * 3600.0).round() as i64));

        let decision = types::AccessDecision {
            request_id: request.request_id.clone(),
            decision: fused.decision,
            confidence_score: fused.combined_confidence,
            confidence_breakdown: fused.breakdown,
            policies_applied,
            denial_reason: fused.denial_reason,
            expires_at,
        };

        self.record_decision(request, &decision, now);
        Ok(decision)
    }

    fn record_decision(&self, request: &types::AccessRequest, decision: &types::AccessDecision, now: DateTime<Utc>) {
        let event = audit::AuditEvent {
            event_id: EventId::new().to_string(),
            event_type: "decision.made".to_string(),
            principal_id: Some(request.principal_id.to_string()),
            session_id: None,
            resource: Some(request.resource_type.clone()),
            details: json!({
                "decision": format!("{:?}", decision.decision),
                "confidence_score": decision.confidence_score,
                "denial_reason": decision.denial_reason,
            }),
            timestamp: now,
        };
        let receipt = self.audit.record(event);

        self.events.publish(eventbus::Event {
            topic: "decision.made".to_string(),
            payload: json!({
                "request_id": request.request_id.to_string(),
                "decision": format!("{:?}", decision.decision),
                "transaction_id": receipt.transaction_id,
            }),
        });
    }
}

/// Builds the C7 `ml_confidence` feature vector from the request itself and
/// the principal's recent history, rather than network-telemetry concepts
/// this domain has no equivalent for. `recent_resource_types` and
/// `recent_duration_hours` are the principal's other requests within the
/// current rate-limit window; callers without a session-history store may
/// pass empty slices, which still yields a well-formed single-request
/// feature vector.
pub fn derive_ml_features(
    request: &types::AccessRequest,
    principal: &types::Principal,
    recent_resource_types: &[String],
    recent_duration_hours: &[f64],
    device_fingerprint_confidence: f64,
    new_location: bool,
) -> MlSessionFeatures {
    use chrono::{Datelike, Timelike};
    use std::collections::HashSet;

    let mut distinct: HashSet<&str> = recent_resource_types.iter().map(String::as_str).collect();
    distinct.insert(&request.resource_type);

    let cumulative_duration_hours =
        recent_duration_hours.iter().sum::<f64>() + request.requested_duration_hours.unwrap_or(0.0);

    MlSessionFeatures {
        user_id: principal.principal_id.to_string(),
        source_ip: request.ip.clone(),
        request_count: recent_resource_types.len() as u32 + 1,
        distinct_resource_types: distinct.len() as u32,
        cumulative_duration_hours,
        hour_of_day: request.timestamp.hour() as u8,
        day_of_week: request.timestamp.weekday().num_days_from_monday() as u8,
        new_location,
        device_trust: (device_fingerprint_confidence / 100.0).clamp(0.0, 1.0) as f32,
        mfa_used: principal.mfa_enabled,
    }
}

fn role_label(role: types::Role) -> &'static str {
    match role {
        types::Role::Student => "student",
        types::Role::Faculty => "faculty",
        types::Role::Admin => "admin",
        types::Role::Visitor => "visitor",
    }
}

/// A cheap anomaly check on a device sample without reaching into
/// `device`'s private heuristic: low canvas confidence or a missing WebGL
/// renderer are the two signals worth short-circuiting on here, matching
/// what `DeviceRegistry::register` would flag on first sight of the device.
fn looks_anomalous(characteristics: &device::Characteristics) -> bool {
    characteristics.canvas_confidence < 50.0 || characteristics.webgl_renderer.is_none()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_principal() -> types::Principal {
        types::Principal {
            principal_id: zt_common::PrincipalId::new(),
            role: types::Role::Student,
            department: "cs".to_string(),
            active: true,
            mfa_enabled: false,
            created_at: Utc::now(),
            last_seen_at: Utc::now(),
        }
    }

    fn sample_request(principal: &types::Principal) -> types::AccessRequest {
        types::AccessRequest {
            request_id: zt_common::RequestId::new(),
            principal_id: principal.principal_id.clone(),
            role_snapshot: principal.role,
            resource_type: "grades".to_string(),
            segment_id: None,
            intent_text: "I am requesting access to my course grades so I can verify my transcript before the registrar deadline next week for my advisor meeting".to_string(),
            requested_duration_hours: None,
            urgency: types::Urgency::Low,
            ip: "10.0.0.5".to_string(),
            device_info: types::DeviceInfo { device_id: None, user_agent: "Mozilla/5.0".to_string() },
            authorized_projects: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    fn sample_ml_features(principal: &types::Principal, request: &types::AccessRequest) -> MlSessionFeatures {
        derive_ml_features(request, principal, &[], &[], 90.0, false)
    }

    fn sample_context_inputs<'a>(typical_hours: &'a [u32], frequent_ips: &'a [String]) -> context::ContextInputs<'a> {
        context::ContextInputs {
            device_health: context::DeviceHealth {
                os_updated: true,
                security_software_current: true,
                disk_encrypted: true,
                device_known: true,
                mdm_compliant: true,
            },
            network: context::NetworkContext { network_type: context::NetworkType::CampusWifi, vpn_in_use: false },
            at: Utc.with_ymd_and_hms(2026, 1, 5, 10, 0, 0).unwrap(),
            typical_hours,
            current_ip: "10.0.0.5",
            frequent_ips,
            current_location: None,
            location_history: &[],
            recent_outcomes: &[true, true, true],
        }
    }

    #[test]
    fn evaluate_access_grants_with_no_policy_on_record() {
        let core = AccessCore::new(CoreConfig::default());
        let principal = sample_principal();
        let request = sample_request(&principal);
        let typical_hours = [9, 10, 11];
        let frequent_ips = vec!["10.0.0.5".to_string()];

        let ctx = EvaluationContext {
            principal: &principal,
            device_characteristics: None,
            context_inputs: sample_context_inputs(&typical_hours, &frequent_ips),
            behavioral_sample: None,
            ml_features: sample_ml_features(&principal, &request),
            peer_analysis_score: 80.0,
            resource_department: "cs",
        };

        let decision = core.evaluate_access(&request, &ctx, Utc::now()).unwrap();
        assert_eq!(decision.decision, types::AccessOutcome::Granted);
        assert_eq!(core.audit.len(), 1);
    }

    #[test]
    fn evaluate_access_denies_when_policy_blocks_role() {
        let core = AccessCore::new(CoreConfig::default());
        core.policies.add(policy::Policy {
            policy_id: zt_common::PolicyId::new(),
            name: "faculty-only grades".to_string(),
            priority: 10,
            created_at: Utc::now(),
            rules: vec![policy::PolicyRule {
                resource_type: "grades".to_string(),
                allowed_roles: vec![types::Role::Faculty],
                time_restriction: None,
                require_department_match: false,
                requires_mfa: false,
                forbids_mfa_path: false,
                base_weight: 1.0,
                rate_limit: None,
                ip_whitelist: Vec::new(),
                project_authorization: Vec::new(),
            }],
        });

        let principal = sample_principal();
        let request = sample_request(&principal);
        let typical_hours = [9, 10, 11];
        let frequent_ips = vec!["10.0.0.5".to_string()];

        let ctx = EvaluationContext {
            principal: &principal,
            device_characteristics: None,
            context_inputs: sample_context_inputs(&typical_hours, &frequent_ips),
            behavioral_sample: None,
            ml_features: sample_ml_features(&principal, &request),
            peer_analysis_score: 80.0,
            resource_department: "cs",
        };

        let decision = core.evaluate_access(&request, &ctx, Utc::now()).unwrap();
        assert_eq!(decision.decision, types::AccessOutcome::Denied);
        assert_eq!(decision.denial_reason.as_deref(), Some("ROLE_NOT_ALLOWED"));
    }

    #[test]
    fn evaluate_access_enforces_per_principal_rate_limit() {
        let mut config = CoreConfig::default();
        config.ratelimit.access_per_hour = 1;
        let core = AccessCore::new(config);
        let principal = sample_principal();
        let request = sample_request(&principal);
        let typical_hours = [9, 10, 11];
        let frequent_ips = vec!["10.0.0.5".to_string()];
        let now = Utc::now();

        let ctx = EvaluationContext {
            principal: &principal,
            device_characteristics: None,
            context_inputs: sample_context_inputs(&typical_hours, &frequent_ips),
            behavioral_sample: None,
            ml_features: sample_ml_features(&principal, &request),
            peer_analysis_score: 80.0,
            resource_department: "cs",
        };

        core.evaluate_access(&request, &ctx, now).unwrap();
        let err = core.evaluate_access(&request, &ctx, now).unwrap_err();
        assert_eq!(err.code(), "RATE_LIMIT_EXCEEDED");
    }
}
