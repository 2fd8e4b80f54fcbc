//! Continuous authentication monitoring (C10): recurring per-session risk
//! scoring with an adaptive interval and tiered response actions.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

const MFA_CHALLENGE_WINDOW_SECS: i64 = 300;
const RISK_HISTORY_CAP: usize = 100;

#[derive(Debug, Clone, Copy)]
pub struct RiskFactors {
    pub device_consistency: f64,
    pub location_stability: f64,
    pub access_patterns: f64,
    pub time_appropriateness: f64,
    pub request_frequency: f64,
}

const WEIGHTS: [f64; 5] = [0.25, 0.20, 0.20, 0.15, 0.20];

impl RiskFactors {
    pub fn composite(&self) -> f64 {
        let values = [
            self.device_consistency,
            self.location_stability,
            self.access_patterns,
            self.time_appropriateness,
            self.request_frequency,
        ];
        WEIGHTS.iter().zip(values.iter()).map(|(w, v)| w * v).sum::<f64>().clamp(0.0, 100.0)
    }
}

/// Buckets requests-per-minute into the risk factor's step function.
pub fn request_frequency_score(requests_per_min: f64) -> f64 {
    if requests_per_min < 1.0 {
        0.0
    } else if requests_per_min < 3.0 {
        10.0
    } else if requests_per_min < 5.0 {
        30.0
    } else if requests_per_min < 10.0 {
        60.0
    } else {
        100.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    TerminateSession { reason: &'static str },
    RequireMfa { challenge_expires_at: DateTime<Utc> },
    MonitorClosely,
    ContinueNormal,
}

struct SessionState {
    interval_secs: i64,
    risk_history: Vec<f64>,
    pending_mfa_expires_at: Option<DateTime<Utc>>,
}

impl SessionState {
    fn push_risk(&mut self, score: f64) {
        self.risk_history.push(score);
        if self.risk_history.len() > RISK_HISTORY_CAP {
            self.risk_history.remove(0);
        }
    }
}

pub struct ContinuousAuthMonitor {
    sessions: DashMap<String, SessionState>,
    default_interval_secs: i64,
    elevated_interval_secs: i64,
    terminate_threshold: f64,
    mfa_threshold: f64,
}

impl ContinuousAuthMonitor {
    pub fn new(default_interval_secs: u64, elevated_interval_secs: u64, terminate_threshold: f64, mfa_threshold: f64) -> Self {
        Self {
            sessions: DashMap::new(),
            default_interval_secs: default_interval_secs as i64,
            elevated_interval_secs: elevated_interval_secs as i64,
            terminate_threshold,
            mfa_threshold,
        }
    }

    pub fn interval_secs(&self, session_id: &str) -> i64 {
        self.sessions.get(session_id).map(|s| s.interval_secs).unwrap_or(self.default_interval_secs)
    }

    /// Score one evaluation tick for a session, applying the action
    /// thresholds and adapting the next interval.
    pub fn evaluate(&self, session_id: &str, factors: RiskFactors, anomaly_detected: bool, now: DateTime<Utc>) -> (f64, Action) {
        let mut state = self
            .sessions
            .entry(session_id.to_string())
            .or_insert_with(|| SessionState {
                interval_secs: self.default_interval_secs,
                risk_history: Vec::new(),
                pending_mfa_expires_at: None,
            });

        let risk_score = factors.composite();
        state.push_risk(risk_score);

        let mut action = if risk_score >= self.terminate_threshold {
            Action::TerminateSession { reason: "RISK_SCORE_CRITICAL" }
        } else if risk_score >= self.mfa_threshold {
            let expires_at = now + Duration::seconds(MFA_CHALLENGE_WINDOW_SECS);
            state.pending_mfa_expires_at = Some(expires_at);
            Action::RequireMfa { challenge_expires_at: expires_at }
        } else if risk_score >= 50.0 {
            Action::MonitorClosely
        } else {
            Action::ContinueNormal
        };

        if anomaly_detected && matches!(action, Action::ContinueNormal | Action::MonitorClosely) {
            let expires_at = now + Duration::seconds(MFA_CHALLENGE_WINDOW_SECS);
            state.pending_mfa_expires_at = Some(expires_at);
            action = Action::RequireMfa { challenge_expires_at: expires_at };
        }

        state.interval_secs = match action {
            Action::TerminateSession { .. } => self.default_interval_secs,
            Action::RequireMfa { .. } => self.elevated_interval_secs,
            Action::MonitorClosely => (state.interval_secs / 2).max(self.elevated_interval_secs),
            Action::ContinueNormal => {
                if risk_score >= self.mfa_threshold {
                    self.elevated_interval_secs
                } else {
                    self.default_interval_secs
                }
            }
        };

        (risk_score, action)
    }

    /// Resolves an outstanding MFA challenge. Success resets risk to 50
    /// and returns to normal monitoring; failure or timeout terminates.
    pub fn resolve_mfa_challenge(&self, session_id: &str, success: bool, now: DateTime<Utc>) -> Action {
        let mut state = match self.sessions.get_mut(session_id) {
            Some(s) => s,
            None => return Action::TerminateSession { reason: "SESSION_NOT_MONITORED" },
        };

        let timed_out = state.pending_mfa_expires_at.map(|exp| now > exp).unwrap_or(true);
        state.pending_mfa_expires_at = None;

        if !success || timed_out {
            state.interval_secs = self.default_interval_secs;
            return Action::TerminateSession { reason: "MFA_CHALLENGE_FAILED" };
        }

        state.push_risk(50.0);
        state.interval_secs = self.default_interval_secs;
        Action::ContinueNormal
    }

    pub fn risk_history(&self, session_id: &str) -> Vec<f64> {
        self.sessions.get(session_id).map(|s| s.risk_history.clone()).unwrap_or_default()
    }
}
