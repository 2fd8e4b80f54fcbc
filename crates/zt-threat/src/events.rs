//! Minimal audit-event view consumed by threat detection.
//!
//! This crate never reads the audit chain directly; callers (the core)
//! project whatever subset of `AuditEvent` the detector needs into this
//! shape.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum EventResult {
    Success,
    Failure,
    Denied,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditEventView {
    pub event_id: String,
    pub timestamp: DateTime<Utc>,
    pub principal_id: String,
    pub action: String,
    pub resource_type: String,
    pub result: EventResult,
    pub ip: Option<String>,
    pub device_fingerprint_hash: Option<String>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Low,
    Medium,
    High,
}

impl Severity {
    /// low=1, medium=2, high=3, per the threat-score weighting table.
    pub fn weight(&self) -> u32 {
        match self {
            Severity::Low => 1,
            Severity::Medium => 2,
            Severity::High => 3,
        }
    }
}
