//! Just-in-time elevation (C8): segment-gated grants with an approval
//! workflow, expiry sweep, and visitor route-deviation tracking.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

use crate::types::{Approval, JitGrant, JitStatus, ResourceSegment, Role, Urgency};
use zt_common::{GrantId, PrincipalId, SegmentId, ZtError, ZtResult};

pub struct JitManager {
    grants: DashMap<String, JitGrant>,
    auto_approve_threshold: f64,
    auto_deny_threshold: f64,
    min_justification_chars: usize,
    max_duration_hours: u32,
}

impl JitManager {
    pub fn new(auto_approve_threshold: f64, auto_deny_threshold: f64, min_justification_chars: usize, max_duration_hours: u32) -> Self {
        Self {
            grants: DashMap::new(),
            auto_approve_threshold,
            auto_deny_threshold,
            min_justification_chars,
            max_duration_hours,
        }
    }

    pub fn request(
        &self,
        principal_id: &PrincipalId,
        role: Role,
        segment: &ResourceSegment,
        justification: String,
        duration_hours: u32,
        urgency: Urgency,
        confidence: f64,
        now: DateTime<Utc>,
    ) -> ZtResult<JitGrant> {
        if !segment.requires_jit {
            return Err(ZtError::validation("JIT_NOT_REQUIRED"));
        }
        if role.security_clearance() < segment.security_level {
            return Err(ZtError::Authorization("insufficient security clearance".to_string()));
        }
        if justification.chars().count() < self.min_justification_chars {
            return Err(ZtError::validation("justification too short"));
        }
        if duration_hours > self.max_duration_hours {
            return Err(ZtError::validation("grant lifetime exceeds the maximum allowed"));
        }

        let needs_approval = segment.requires_dual_approval
            || (confidence < self.auto_approve_threshold && confidence >= self.auto_deny_threshold);

        let auto_denied = !segment.requires_dual_approval && confidence < self.auto_deny_threshold;

        let mut grant = JitGrant {
            grant_id: GrantId::new(),
            principal_id: principal_id.clone(),
            segment_id: segment.segment_id.clone(),
            justification,
            duration_hours,
            urgency,
            status: JitStatus::PendingApproval,
            granted_at: None,
            expires_at: None,
            approvers: Vec::new(),
            requires_approval: needs_approval,
            risk_assessment: None,
            ml_evaluation: Some(confidence),
        };

        if auto_denied {
            grant.status = JitStatus::Denied;
        } else if !needs_approval {
            grant.status = JitStatus::Granted;
            grant.granted_at = Some(now);
            grant.expires_at = Some(now + Duration::hours(duration_hours as i64));
        }

        self.grants.insert(grant.grant_id.to_string(), grant.clone());
        Ok(grant)
    }

    /// Record one approver's decision. Dual-approval segments require two
    /// distinct approving decisions; otherwise one suffices. A denial from
    /// any approver terminates the request immediately.
    pub fn decide(
        &self,
        grant_id: &str,
        approver_id: &PrincipalId,
        decision: bool,
        dual_approval_required: bool,
        now: DateTime<Utc>,
    ) -> ZtResult<JitGrant> {
        let mut grant = self.grants.get_mut(grant_id).ok_or(ZtError::NotFound)?;

        if grant.status != JitStatus::PendingApproval {
            return Err(ZtError::conflict("grant is not pending approval"));
        }
        if approver_id == &grant.principal_id {
            return Err(ZtError::Authorization("requester cannot approve their own grant".to_string()));
        }
        if grant.approvers.iter().any(|a| &a.approver_id == approver_id) {
            return Err(ZtError::conflict("approver has already decided"));
        }

        grant.approvers.push(Approval {
            approver_id: approver_id.clone(),
            decision,
            at: now,
        });

        if !decision {
            grant.status = JitStatus::Denied;
            return Ok(grant.clone());
        }

        let approvals = grant.approvers.iter().filter(|a| a.decision).count();
        let threshold = if dual_approval_required { 2 } else { 1 };

        if approvals >= threshold {
            grant.status = JitStatus::Granted;
            grant.granted_at = Some(now);
            grant.expires_at = Some(now + Duration::hours(grant.duration_hours as i64));
        }

        Ok(grant.clone())
    }

    pub fn revoke(&self, grant_id: &str, by: &PrincipalId, is_admin: bool) -> ZtResult<()> {
        let mut grant = self.grants.get_mut(grant_id).ok_or(ZtError::NotFound)?;
        if matches!(grant.status, JitStatus::Revoked | JitStatus::Expired) {
            return Err(ZtError::conflict("grant already terminal"));
        }
        if !is_admin && &grant.principal_id != by {
            return Err(ZtError::Authorization("cannot revoke another principal's grant".to_string()));
        }
        grant.status = JitStatus::Revoked;
        Ok(())
    }

    /// Transitions `granted` grants past `expires_at` to `expired`,
    /// returning the ids that changed.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> Vec<GrantId> {
        let mut expired = Vec::new();
        for mut grant in self.grants.iter_mut() {
            if grant.status == JitStatus::Granted {
                if let Some(expires_at) = grant.expires_at {
                    if now >= expires_at {
                        grant.status = JitStatus::Expired;
                        expired.push(grant.grant_id.clone());
                    }
                }
            }
        }
        expired
    }

    pub fn get(&self, grant_id: &str) -> Option<JitGrant> {
        self.grants.get(grant_id).map(|g| g.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    Allowed,
    ViolationLogged { violation_count: u32, terminate_session: bool },
}

/// Checks a visitor's access against their allowed segments; accesses
/// outside that set are a `route_violation`. Three violations in a
/// session terminate it.
pub fn check_visitor_route(
    segment_id: &SegmentId,
    allowed_segments: &[SegmentId],
    current_violation_count: u32,
) -> RouteOutcome {
    if allowed_segments.contains(segment_id) {
        return RouteOutcome::Allowed;
    }
    let violation_count = current_violation_count + 1;
    RouteOutcome::ViolationLogged {
        violation_count,
        terminate_session: violation_count >= 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn segment(requires_jit: bool, dual_approval: bool, security_level: u8) -> ResourceSegment {
        ResourceSegment {
            segment_id: SegmentId::new(),
            name: "restricted-lab".to_string(),
            category: "research".to_string(),
            security_level,
            requires_jit,
            requires_dual_approval: dual_approval,
            allowed_roles: vec![Role::Faculty, Role::Admin],
            locked: false,
            locked_until: None,
        }
    }

    #[test]
    fn non_jit_segment_rejects_request() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(false, false, 1);
        let err = manager
            .request(&PrincipalId::new(), Role::Faculty, &seg, "x".repeat(20), 1, Urgency::Low, 80.0, Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn short_justification_rejected() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, false, 1);
        let err = manager
            .request(&PrincipalId::new(), Role::Faculty, &seg, "x".repeat(5), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap_err();
        assert_eq!(err.code(), "VALIDATION_FAILED");
    }

    #[test]
    fn insufficient_clearance_rejected() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, false, 5);
        let err = manager
            .request(&PrincipalId::new(), Role::Student, &seg, "x".repeat(20), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ZtError::Authorization(_)));
    }

    #[test]
    fn high_confidence_non_dual_segment_auto_grants() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, false, 1);
        let grant = manager
            .request(&PrincipalId::new(), Role::Faculty, &seg, "x".repeat(20), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap();
        assert_eq!(grant.status, JitStatus::Granted);
    }

    #[test]
    fn dual_approval_segment_requires_two_distinct_approvers() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, true, 1);
        let requester = PrincipalId::new();
        let grant = manager
            .request(&requester, Role::Faculty, &seg, "x".repeat(20), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap();

        let admin1 = PrincipalId::new();
        let admin2 = PrincipalId::new();
        let after_one = manager.decide(&grant.grant_id.to_string(), &admin1, true, true, Utc::now()).unwrap();
        assert_eq!(after_one.status, JitStatus::PendingApproval);

        let after_two = manager.decide(&grant.grant_id.to_string(), &admin2, true, true, Utc::now()).unwrap();
        assert_eq!(after_two.status, JitStatus::Granted);
    }

    #[test]
    fn requester_cannot_approve_own_grant() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, true, 1);
        let requester = PrincipalId::new();
        let grant = manager
            .request(&requester, Role::Faculty, &seg, "x".repeat(20), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap();

        let err = manager
            .decide(&grant.grant_id.to_string(), &requester, true, true, Utc::now())
            .unwrap_err();
        assert!(matches!(err, ZtError::Authorization(_)));
    }

    #[test]
    fn expiry_sweep_transitions_past_due_grants() {
        let manager = JitManager::new(90.0, 40.0, 20, 24);
        let seg = segment(true, false, 1);
        let grant = manager
            .request(&PrincipalId::new(), Role::Faculty, &seg, "x".repeat(20), 1, Urgency::Low, 95.0, Utc::now())
            .unwrap();

        let later = Utc::now() + Duration::hours(2);
        let expired = manager.sweep_expired(later);
        assert_eq!(expired, vec![grant.grant_id]);
    }

    #[test]
    fn third_route_violation_terminates_session() {
        let allowed = vec![SegmentId::new()];
        let restricted = SegmentId::new();
        let outcome = check_visitor_route(&restricted, &allowed, 2);
        assert_eq!(outcome, RouteOutcome::ViolationLogged { violation_count: 3, terminate_session: true });
    }
}
