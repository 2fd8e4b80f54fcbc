//! Emergency break-glass access (C9): validated submission, dual-admin
//! approval with a timeout, an activity-logged active session, and a
//! post-incident report on expiry or completion.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::{ActivityLogEntry, EmergencyApproval, EmergencyRequest, EmergencyStatus, EmergencyType, Urgency};
use zt_common::{EmergencyRequestId, PrincipalId, SessionId, ZtError, ZtResult};

const MIN_JUSTIFICATION_CHARS: usize = 100;
const MIN_DURATION_HOURS: f64 = 0.5;
const MIN_AVAILABLE_ADMINS: usize = 3;

pub struct BreakGlassManager {
    requests: DashMap<String, EmergencyRequest>,
    max_duration_hours: f64,
    approval_timeout_minutes: i64,
}

impl BreakGlassManager {
    pub fn new(max_duration_hours: f64, approval_timeout_minutes: u32) -> Self {
        Self {
            requests: DashMap::new(),
            max_duration_hours,
            approval_timeout_minutes: approval_timeout_minutes as i64,
        }
    }

    pub fn submit(
        &self,
        requester_id: &PrincipalId,
        emergency_type: EmergencyType,
        urgency: Urgency,
        justification: String,
        required_resources: Vec<String>,
        estimated_duration_hours: f64,
        available_admins: usize,
        now: DateTime<Utc>,
    ) -> ZtResult<EmergencyRequest> {
        if justification.chars().count() < MIN_JUSTIFICATION_CHARS {
            return Err(ZtError::validation("justification must be at least 100 characters"));
        }
        if !(MIN_DURATION_HOURS..=self.max_duration_hours).contains(&estimated_duration_hours) {
            return Err(ZtError::validation("duration must be between 0.5 and the configured maximum"));
        }
        if required_resources.is_empty() {
            return Err(ZtError::validation("at least one required resource must be named"));
        }
        if available_admins < MIN_AVAILABLE_ADMINS {
            return Err(ZtError::Dependency("fewer than three administrators available".to_string()));
        }

        let request = EmergencyRequest {
            request_id: EmergencyRequestId::new(),
            requester_id: requester_id.clone(),
            emergency_type,
            urgency,
            justification,
            required_resources,
            estimated_duration_hours,
            status: EmergencyStatus::Pending,
            requested_at: now,
            approvals: Vec::new(),
            session_id: None,
            activity_log: Vec::new(),
        };

        self.requests.insert(request.request_id.to_string(), request.clone());
        Ok(request)
    }

    /// Exactly two distinct admin approvals are required; any single
    /// denial terminates the request. Duplicate decisions from the same
    /// admin, or a decision from the requester, are rejected.
    pub fn decide(&self, request_id: &str, approver_id: &PrincipalId, approved: bool, comments: Option<String>, now: DateTime<Utc>) -> ZtResult<EmergencyRequest> {
        let mut request = self.requests.get_mut(request_id).ok_or(ZtError::NotFound)?;

        if request.status != EmergencyStatus::Pending {
            return Err(ZtError::conflict("request is not pending"));
        }
        if (now - request.requested_at) > Duration::minutes(self.approval_timeout_minutes) {
            request.status = EmergencyStatus::Expired;
            return Err(ZtError::conflict("approval window has expired"));
        }
        if approver_id == &request.requester_id {
            return Err(ZtError::Authorization("requester cannot approve their own request".to_string()));
        }
        if request.approvals.iter().any(|a| &a.approver_id == approver_id) {
            return Err(ZtError::conflict("approver has already decided"));
        }
        if !approved && comments.is_none() {
            return Err(ZtError::validation("a denial requires a reason"));
        }

        request.approvals.push(EmergencyApproval {
            approver_id: approver_id.clone(),
            decision: approved,
            at: now,
            comments,
        });

        if !approved {
            request.status = EmergencyStatus::Denied;
            return Ok(request.clone());
        }

        let approved_count = request.approvals.iter().filter(|a| a.decision).count();
        if approved_count >= 2 {
            request.status = EmergencyStatus::Active;
            request.session_id = Some(SessionId::new());
        }

        Ok(request.clone())
    }

    /// Expires any pending request whose approval window has elapsed.
    pub fn sweep_timeouts(&self, now: DateTime<Utc>) -> Vec<EmergencyRequestId> {
        let mut expired = Vec::new();
        for mut request in self.requests.iter_mut() {
            if request.status == EmergencyStatus::Pending
                && (now - request.requested_at) > Duration::minutes(self.approval_timeout_minutes)
            {
                request.status = EmergencyStatus::Expired;
                expired.push(request.request_id.clone());
            }
        }
        expired
    }

    pub fn log_activity(&self, request_id: &str, entry: ActivityLogEntry) -> ZtResult<()> {
        let mut request = self.requests.get_mut(request_id).ok_or(ZtError::NotFound)?;
        if request.status != EmergencyStatus::Active {
            return Err(ZtError::conflict("no active emergency session"));
        }
        request.activity_log.push(entry);
        Ok(())
    }

    /// Ends an active session (by expiry or early completion) and
    /// generates its post-incident report.
    pub fn complete(&self, request_id: &str, now: DateTime<Utc>) -> ZtResult<IncidentReport> {
        let mut request = self.requests.get_mut(request_id).ok_or(ZtError::NotFound)?;
        if request.status != EmergencyStatus::Active {
            return Err(ZtError::conflict("request is not active"));
        }
        request.status = EmergencyStatus::Completed;
        Ok(build_report(&request, now))
    }

    pub fn get(&self, request_id: &str) -> Option<EmergencyRequest> {
        self.requests.get(request_id).map(|r| r.clone())
    }
}

/// High-risk threshold (on the same 0-100 scale as the rest of the crate)
/// above which an activity-log entry marks the start of the critical phase.
const CRITICAL_ACTIVITY_RISK_THRESHOLD: f64 = 70.0;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncidentReport {
    pub request_id: EmergencyRequestId,
    pub timeline: Vec<ActivityLogEntry>,
    pub initial_phase_minutes: i64,
    pub response_phase_minutes: i64,
    pub critical_phase_minutes: i64,
    pub impacted_systems: Vec<String>,
    pub impacted_principals: Vec<PrincipalId>,
    pub compliance_flags: Vec<String>,
    pub recommendations: Vec<String>,
    pub lessons_learned: Vec<String>,
}

fn build_report(request: &EmergencyRequest, completed_at: DateTime<Utc>) -> IncidentReport {
    let response_start = request
        .approvals
        .first()
        .map(|a| a.at)
        .unwrap_or(request.requested_at);
    let initial_phase_minutes = (response_start - request.requested_at).num_minutes();

    let critical_start = request
        .activity_log
        .iter()
        .find(|entry| entry.risk_score >= CRITICAL_ACTIVITY_RISK_THRESHOLD)
        .map(|entry| entry.at);
    let response_end = critical_start.unwrap_or(completed_at);
    let response_phase_minutes = (response_end - response_start).num_minutes();
    let critical_phase_minutes = critical_start
        .map(|start| (completed_at - start).num_minutes())
        .unwrap_or(0);

    let mut impacted_principals = vec![request.requester_id.clone()];
    impacted_principals.extend(request.approvals.iter().map(|a| a.approver_id.clone()));

    let compliance_flags = compliance_flags_for(&request.required_resources);

    let recommendations = vec![
        "Review emergency access policy coverage for the affected systems".to_string(),
        "Confirm all accessed resources have been re-audited post-incident".to_string(),
    ];

    let lessons_learned = lessons_learned_for(request, &compliance_flags, critical_start.is_some());

    IncidentReport {
        request_id: request.request_id.clone(),
        timeline: request.activity_log.clone(),
        initial_phase_minutes,
        response_phase_minutes,
        critical_phase_minutes,
        impacted_systems: request.required_resources.clone(),
        impacted_principals,
        compliance_flags,
        recommendations,
        lessons_learned,
    }
}

fn lessons_learned_for(request: &EmergencyRequest, compliance_flags: &[String], had_critical_phase: bool) -> Vec<String> {
    let mut lessons = Vec::new();

    if had_critical_phase {
        lessons.push("Critical lesson: a high-risk action occurred during the emergency session and should drive tighter scoping of future grants".to_string());
    }
    if !request.activity_log.is_empty() {
        lessons.push("Activity logging captured the actions taken during the emergency session".to_string());
    }
    if !compliance_flags.is_empty() {
        lessons.push(format!("Session touched resources subject to {}; confirm post-incident compliance review", compliance_flags.join("/")));
    }
    if lessons.is_empty() {
        lessons.push("No anomalous activity observed during the emergency session".to_string());
    }

    lessons
}

fn compliance_flags_for(resources: &[String]) -> Vec<String> {
    let mut flags = Vec::new();
    let joined = resources.join(" ").to_lowercase();
    if joined.contains("health") || joined.contains("medical") {
        flags.push("HIPAA".to_string());
    }
    if joined.contains("student") || joined.contains("grade") || joined.contains("personal") {
        flags.push("GDPR".to_string());
    }
    flags
}
