//! Policy store and evaluation (C6): priority-ordered RBAC/ABAC rules
//! that produce a verdict feeding into the C7 fusion core.

use chrono::{DateTime, Datelike, Timelike, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::types::Role;
use zt_common::PolicyId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimeRestriction {
    pub start_hour: u32,
    pub end_hour: u32,
    /// ISO weekday numbers (1 = Monday .. 7 = Sunday) the rule permits.
    /// Empty means every weekday is allowed.
    #[serde(default)]
    pub allowed_weekdays: Vec<u32>,
}

impl TimeRestriction {
    fn allows(&self, at: DateTime<Utc>) -> bool {
        if !self.allowed_weekdays.is_empty() && !self.allowed_weekdays.contains(&at.weekday().number_from_monday()) {
            return false;
        }
        let hour = at.hour();
        if self.start_hour <= self.end_hour {
            (self.start_hour..=self.end_hour).contains(&hour)
        } else {
            hour >= self.start_hour || hour <= self.end_hour
        }
    }
}

/// Per-principal request budget attached to a rule (spec.md's `rate_limit`).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RateLimit {
    pub count: u32,
    pub window_seconds: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PolicyRule {
    pub resource_type: String,
    pub allowed_roles: Vec<Role>,
    pub time_restriction: Option<TimeRestriction>,
    pub require_department_match: bool,
    pub requires_mfa: bool,
    pub forbids_mfa_path: bool,
    pub base_weight: f64,
    /// Per-principal request budget; enforced ahead of evaluation.
    #[serde(default)]
    pub rate_limit: Option<RateLimit>,
    /// Caller's IP must appear in this list when non-empty.
    #[serde(default)]
    pub ip_whitelist: Vec<String>,
    /// Resource identifiers the principal must carry an explicit project
    /// authorization for (e.g. a grant/project id); checked against the
    /// caller-supplied `authorized_projects` list when non-empty.
    #[serde(default)]
    pub project_authorization: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub policy_id: PolicyId,
    pub name: String,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub rules: Vec<PolicyRule>,
}

pub struct PolicyStore {
    policies: DashMap<String, Policy>,
}

impl PolicyStore {
    pub fn new() -> Self {
        Self { policies: DashMap::new() }
    }

    pub fn add(&self, policy: Policy) {
        self.policies.insert(policy.policy_id.to_string(), policy);
    }

    /// Policies whose any rule names `resource_type`, ordered
    /// `(priority desc, created_at asc)`.
    fn candidates(&self, resource_type: &str) -> Vec<Policy> {
        let mut matching: Vec<Policy> = self
            .policies
            .iter()
            .filter(|p| p.rules.iter().any(|r| r.resource_type == resource_type))
            .map(|p| p.clone())
            .collect();
        matching.sort_by(|a, b| b.priority.cmp(&a.priority).then(a.created_at.cmp(&b.created_at)));
        matching
    }

    /// The rate limit of the highest-priority matching rule that defines
    /// one, if any. Enforced ahead of full policy evaluation.
    pub fn rate_limit_for(&self, resource_type: &str) -> Option<RateLimit> {
        self.candidates(resource_type)
            .iter()
            .find_map(|p| p.rules.iter().find(|r| r.resource_type == resource_type).and_then(|r| r.rate_limit))
    }
}

impl Default for PolicyStore {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    Allow {
        candidate_confidence: f64,
        requires_mfa: bool,
        forbids_mfa_path: bool,
    },
    Deny {
        reason: &'static str,
    },
}

#[derive(Debug, Clone)]
pub struct PolicyEvaluation {
    pub policies_applied: Vec<PolicyId>,
    pub verdict: Verdict,
}

pub struct EvalRequest<'a> {
    pub resource_type: &'a str,
    pub role: Role,
    pub principal_department: &'a str,
    pub resource_department: &'a str,
    pub at: DateTime<Utc>,
    pub intent_score: f64,
    pub source_ip: &'a str,
    pub authorized_projects: &'a [String],
}

/// Evaluate candidate policies for a resource type in priority order. The
/// first candidate that does not deny decides `policies_applied`; if every
/// candidate denies, the first deny reason wins.
pub fn evaluate(store: &PolicyStore, req: &EvalRequest) -> Option<PolicyEvaluation> {
    let candidates = store.candidates(req.resource_type);
    if candidates.is_empty() {
        return None;
    }

    let mut first_deny: Option<(PolicyId, &'static str)> = None;

    for policy in &candidates {
        let Some(rule) = policy.rules.iter().find(|r| r.resource_type == req.resource_type) else {
            continue;
        };

        let verdict = rule_verdict(rule, req);
        match verdict {
            Verdict::Deny { reason } => {
                if first_deny.is_none() {
                    first_deny = Some((policy.policy_id.clone(), reason));
                }
            }
            Verdict::Allow { .. } => {
                return Some(PolicyEvaluation {
                    policies_applied: vec![policy.policy_id.clone()],
                    verdict,
                });
            }
        }
    }

    first_deny.map(|(policy_id, reason)| PolicyEvaluation {
        policies_applied: vec![policy_id],
        verdict: Verdict::Deny { reason },
    })
}

fn rule_verdict(rule: &PolicyRule, req: &EvalRequest) -> Verdict {
    if !rule.allowed_roles.contains(&req.role) {
        return Verdict::Deny { reason: "ROLE_NOT_ALLOWED" };
    }
    if let Some(restriction) = &rule.time_restriction {
        if !restriction.allows(req.at) {
            return Verdict::Deny { reason: "TIME_RESTRICTED" };
        }
    }
    if rule.require_department_match && req.principal_department != req.resource_department {
        return Verdict::Deny { reason: "DEPARTMENT_MISMATCH" };
    }
    if !rule.ip_whitelist.is_empty() && !rule.ip_whitelist.iter().any(|ip| ip == req.source_ip) {
        return Verdict::Deny { reason: "IP_NOT_WHITELISTED" };
    }
    if !rule.project_authorization.is_empty()
        && !rule.project_authorization.iter().all(|project| req.authorized_projects.iter().any(|p| p == project))
    {
        return Verdict::Deny { reason: "PROJECT_NOT_AUTHORIZED" };
    }

    Verdict::Allow {
        candidate_confidence: (req.intent_score / 100.0).min(1.0) * rule.base_weight,
        requires_mfa: rule.requires_mfa,
        forbids_mfa_path: rule.forbids_mfa_path,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy(priority: i32, created_at: DateTime<Utc>, rule: PolicyRule) -> Policy {
        Policy {
            policy_id: PolicyId::new(),
            name: "test".to_string(),
            priority,
            created_at,
            rules: vec![rule],
        }
    }

    fn base_rule(resource_type: &str, roles: Vec<Role>) -> PolicyRule {
        PolicyRule {
            resource_type: resource_type.to_string(),
            allowed_roles: roles,
            time_restriction: None,
            require_department_match: false,
            requires_mfa: false,
            forbids_mfa_path: false,
            base_weight: 1.0,
            rate_limit: None,
            ip_whitelist: Vec::new(),
            project_authorization: Vec::new(),
        }
    }

    fn base_req(resource_type: &'static str, role: Role) -> EvalRequest<'static> {
        EvalRequest {
            resource_type,
            role,
            principal_department: "cs",
            resource_department: "cs",
            at: Utc::now(),
            intent_score: 80.0,
            source_ip: "10.0.0.5",
            authorized_projects: &[],
        }
    }

    #[test]
    fn role_not_allowed_denies() {
        let store = PolicyStore::new();
        store.add(policy(10, Utc::now(), base_rule("grades", vec![Role::Faculty])));

        let req = base_req("grades", Role::Student);
        let result = evaluate(&store, &req).unwrap();
        assert_eq!(result.verdict, Verdict::Deny { reason: "ROLE_NOT_ALLOWED" });
    }

    #[test]
    fn higher_priority_candidate_wins_when_it_allows() {
        let store = PolicyStore::new();
        store.add(policy(5, Utc::now(), base_rule("grades", vec![Role::Student])));
        store.add(policy(50, Utc::now(), base_rule("grades", vec![Role::Faculty])));

        let req = base_req("grades", Role::Faculty);
        let result = evaluate(&store, &req).unwrap();
        assert!(matches!(result.verdict, Verdict::Allow { .. }));
    }

    #[test]
    fn all_denying_candidates_surface_first_deny_reason() {
        let store = PolicyStore::new();
        let mut restricted = base_rule("grades", vec![Role::Student]);
        restricted.time_restriction = Some(TimeRestriction { start_hour: 9, end_hour: 10, allowed_weekdays: Vec::new() });
        store.add(policy(50, Utc::now(), restricted));
        store.add(policy(10, Utc::now(), base_rule("grades", vec![Role::Faculty])));

        let req = base_req("grades", Role::Student);
        let result = evaluate(&store, &req).unwrap();
        assert_eq!(result.verdict, Verdict::Deny { reason: "TIME_RESTRICTED" });
    }

    #[test]
    fn no_matching_policy_returns_none() {
        let store = PolicyStore::new();
        let req = base_req("unknown", Role::Student);
        assert!(evaluate(&store, &req).is_none());
    }

    #[test]
    fn weekday_restriction_denies_on_disallowed_day() {
        let store = PolicyStore::new();
        let mut restricted = base_rule("grades", vec![Role::Student]);
        // Saturday, 2026-01-03: only Mon-Fri (1-5) permitted.
        restricted.time_restriction = Some(TimeRestriction { start_hour: 0, end_hour: 23, allowed_weekdays: vec![1, 2, 3, 4, 5] });
        store.add(policy(10, Utc::now(), restricted));

        let mut req = base_req("grades", Role::Student);
        req.at = chrono::TimeZone::with_ymd_and_hms(&Utc, 2026, 1, 3, 12, 0, 0).unwrap();
        let result = evaluate(&store, &req).unwrap();
        assert_eq!(result.verdict, Verdict::Deny { reason: "TIME_RESTRICTED" });
    }

    #[test]
    fn ip_whitelist_denies_unlisted_source() {
        let store = PolicyStore::new();
        let mut rule = base_rule("grades", vec![Role::Student]);
        rule.ip_whitelist = vec!["10.0.0.5".to_string()];
        store.add(policy(10, Utc::now(), rule));

        let mut req = base_req("grades", Role::Student);
        req.source_ip = "1.2.3.4";
        let result = evaluate(&store, &req).unwrap();
        assert_eq!(result.verdict, Verdict::Deny { reason: "IP_NOT_WHITELISTED" });
    }

    #[test]
    fn project_authorization_denies_missing_grant() {
        let store = PolicyStore::new();
        let mut rule = base_rule("grades", vec![Role::Student]);
        rule.project_authorization = vec!["proj-42".to_string()];
        store.add(policy(10, Utc::now(), rule));

        let req = base_req("grades", Role::Student);
        let result = evaluate(&store, &req).unwrap();
        assert_eq!(result.verdict, Verdict::Deny { reason: "PROJECT_NOT_AUTHORIZED" });
    }

    #[test]
    fn rate_limit_for_returns_the_highest_priority_matching_rule() {
        let store = PolicyStore::new();
        let mut limited = base_rule("grades", vec![Role::Student]);
        limited.rate_limit = Some(RateLimit { count: 5, window_seconds: 3600 });
        store.add(policy(10, Utc::now(), limited));

        let found = store.rate_limit_for("grades").unwrap();
        assert_eq!(found.count, 5);
        assert!(store.rate_limit_for("unknown").is_none());
    }
}
