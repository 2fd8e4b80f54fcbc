//! Core domain types shared across the access-decision pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use zt_common::{
    DeviceId, EmergencyRequestId, GrantId, PolicyId, PrincipalId, RequestId, SegmentId, SessionId,
};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Role {
    Student,
    Faculty,
    Admin,
    Visitor,
}

impl Role {
    /// Derived security clearance used by JIT segment-level checks.
    pub fn security_clearance(&self) -> u8 {
        match self {
            Role::Student => 1,
            Role::Faculty => 3,
            Role::Admin => 5,
            Role::Visitor => 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Principal {
    pub principal_id: PrincipalId,
    pub role: Role,
    pub department: String,
    pub active: bool,
    pub mfa_enabled: bool,
    pub created_at: DateTime<Utc>,
    pub last_seen_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Urgency {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub device_id: Option<DeviceId>,
    pub user_agent: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessRequest {
    pub request_id: RequestId,
    pub principal_id: PrincipalId,
    pub role_snapshot: Role,
    pub resource_type: String,
    pub segment_id: Option<SegmentId>,
    pub intent_text: String,
    pub requested_duration_hours: Option<f64>,
    pub urgency: Urgency,
    pub ip: String,
    pub device_info: DeviceInfo,
    /// Project/grant identifiers the principal has been explicitly
    /// authorized against, checked by rules with `project_authorization`.
    #[serde(default)]
    pub authorized_projects: Vec<String>,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum AccessOutcome {
    Granted,
    GrantedWithMfa,
    PendingApproval,
    Denied,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessDecision {
    pub request_id: RequestId,
    pub decision: AccessOutcome,
    pub confidence_score: f64,
    pub confidence_breakdown: HashMap<String, f64>,
    pub policies_applied: Vec<PolicyId>,
    pub denial_reason: Option<String>,
    pub expires_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SessionStatus {
    Active,
    SteppingUp,
    Terminated,
    Expired,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessLogEntry {
    pub resource: String,
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub result: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub session_id: SessionId,
    pub principal_id: PrincipalId,
    pub device_id: Option<DeviceId>,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    pub ip_history: Vec<String>,
    pub access_log: Vec<AccessLogEntry>,
    pub current_risk_score: f64,
    pub risk_history: Vec<f64>,
    pub status: SessionStatus,
    pub violation_count: u32,
}

impl Session {
    pub const RISK_HISTORY_CAP: usize = 100;

    pub fn push_risk(&mut self, score: f64) {
        self.risk_history.push(score);
        if self.risk_history.len() > Self::RISK_HISTORY_CAP {
            self.risk_history.remove(0);
        }
        self.current_risk_score = score;
    }

    /// A session transitions monotonically; terminated/expired are terminal.
    pub fn can_transition_to(&self, next: SessionStatus) -> bool {
        !matches!(self.status, SessionStatus::Terminated | SessionStatus::Expired)
            && (self.status, next) != (SessionStatus::Active, SessionStatus::Active)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum JitStatus {
    PendingApproval,
    Granted,
    Denied,
    Expired,
    Revoked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Approval {
    pub approver_id: PrincipalId,
    pub decision: bool,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JitGrant {
    pub grant_id: GrantId,
    pub principal_id: PrincipalId,
    pub segment_id: SegmentId,
    pub justification: String,
    pub duration_hours: u32,
    pub urgency: Urgency,
    pub status: JitStatus,
    pub granted_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub approvers: Vec<Approval>,
    pub requires_approval: bool,
    pub risk_assessment: Option<f64>,
    pub ml_evaluation: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSegment {
    pub segment_id: SegmentId,
    pub name: String,
    pub category: String,
    pub security_level: u8,
    pub requires_jit: bool,
    pub requires_dual_approval: bool,
    pub allowed_roles: Vec<Role>,
    pub locked: bool,
    pub locked_until: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmergencyType {
    SystemOutage,
    SecurityIncident,
    DataRecovery,
    CriticalMaintenance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EmergencyStatus {
    Pending,
    Approved,
    Denied,
    Active,
    Expired,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyApproval {
    pub approver_id: PrincipalId,
    pub decision: bool,
    pub at: DateTime<Utc>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActivityLogEntry {
    pub command: String,
    pub resource: String,
    pub data_accessed: Option<String>,
    pub result: String,
    pub risk_score: f64,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmergencyRequest {
    pub request_id: EmergencyRequestId,
    pub requester_id: PrincipalId,
    pub emergency_type: EmergencyType,
    pub urgency: Urgency,
    pub justification: String,
    pub required_resources: Vec<String>,
    pub estimated_duration_hours: f64,
    pub status: EmergencyStatus,
    pub requested_at: DateTime<Utc>,
    pub approvals: Vec<EmergencyApproval>,
    pub session_id: Option<SessionId>,
    pub activity_log: Vec<ActivityLogEntry>,
}
