//! Automated response: brute-force and coordinated-attack detection, and
//! the pluggable action handlers they trigger.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use zt_common::{Notifier, Priority, Store, ZtResult};

use crate::events::{AuditEventView, EventResult};

/// One automated-response action. Concrete handlers live outside this
/// crate's test code; production wiring injects `Store`/`Notifier`-backed
/// implementations (see `BlockDeviceHandler`, `LockSegmentHandler`,
/// `AdminAlertHandler` below for the reference implementations).
#[async_trait]
pub trait ActionHandler: Send + Sync {
    fn action_type(&self) -> &str;
    async fn execute(&self, params: &ActionParams) -> ZtResult<ActionResult>;
}

#[derive(Debug, Clone, Default)]
pub struct ActionParams {
    pub context: HashMap<String, serde_json::Value>,
}

impl ActionParams {
    pub fn with(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
        self.context.insert(key.to_string(), value.into());
        self
    }

    fn str_param(&self, key: &str) -> Option<&str> {
        self.context.get(key).and_then(|v| v.as_str())
    }
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct ActionResult {
    pub success: bool,
    pub output: serde_json::Value,
}

/// Marks a device fingerprint blocked, evicts it from the validation
/// cache by deleting its store entry, and persists the reason.
pub struct BlockDeviceHandler {
    store: std::sync::Arc<dyn Store>,
}

impl BlockDeviceHandler {
    pub fn new(store: std::sync::Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for BlockDeviceHandler {
    fn action_type(&self) -> &str {
        "block_device"
    }

    async fn execute(&self, params: &ActionParams) -> ZtResult<ActionResult> {
        let device_id = params
            .str_param("device_id")
            .ok_or_else(|| zt_common::ZtError::validation("missing device_id"))?;
        let reason = params.str_param("reason").unwrap_or("automated_response");

        self.store
            .update(
                "device_fingerprints",
                device_id,
                json!({ "is_blocked": true, "block_reason": reason }),
            )
            .await?;

        tracing::warn!(device_id, reason, "blocked device fingerprint");

        Ok(ActionResult {
            success: true,
            output: json!({ "action": "block_device", "device_id": device_id }),
        })
    }
}

/// Locks every resource segment in the given category for `duration`.
pub struct LockSegmentHandler {
    store: std::sync::Arc<dyn Store>,
}

impl LockSegmentHandler {
    pub fn new(store: std::sync::Arc<dyn Store>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl ActionHandler for LockSegmentHandler {
    fn action_type(&self) -> &str {
        "lock_segment"
    }

    async fn execute(&self, params: &ActionParams) -> ZtResult<ActionResult> {
        let category = params
            .str_param("category")
            .ok_or_else(|| zt_common::ZtError::validation("missing category"))?;

        let segments = self
            .store
            .query("resource_segments", json!({ "category": category }), None, None)
            .await?;

        for segment in &segments {
            if let Some(id) = segment.get("segment_id").and_then(|v| v.as_str()) {
                self.store
                    .update("resource_segments", id, json!({ "locked": true }))
                    .await?;
            }
        }

        tracing::warn!(category, locked = segments.len(), "locked resource segments");

        Ok(ActionResult {
            success: true,
            output: json!({ "action": "lock_segment", "category": category, "locked": segments.len() }),
        })
    }
}

/// Broadcasts a critical notification to every administrator.
pub struct AdminAlertHandler {
    notifier: std::sync::Arc<dyn Notifier>,
}

impl AdminAlertHandler {
    pub fn new(notifier: std::sync::Arc<dyn Notifier>) -> Self {
        Self { notifier }
    }
}

#[async_trait]
impl ActionHandler for AdminAlertHandler {
    fn action_type(&self) -> &str {
        "admin_alert"
    }

    async fn execute(&self, params: &ActionParams) -> ZtResult<ActionResult> {
        let title = params.str_param("title").unwrap_or("Automated threat response");
        let body = params.str_param("body").unwrap_or("");

        self.notifier
            .admin_broadcast(title, body, Priority::Critical, json!(params.context))
            .await;

        Ok(ActionResult {
            success: true,
            output: json!({ "action": "admin_alert" }),
        })
    }
}

/// Any device fingerprint with 10+ failures in the last 10 minutes.
pub fn detect_brute_force(events: &[AuditEventView], now: DateTime<Utc>) -> Vec<String> {
    let window_start = now - Duration::minutes(10);
    let mut counts: HashMap<String, u32> = HashMap::new();

    for event in events {
        if event.timestamp < window_start {
            continue;
        }
        if !matches!(event.result, EventResult::Failure) {
            continue;
        }
        if let Some(device) = &event.device_fingerprint_hash {
            *counts.entry(device.clone()).or_insert(0) += 1;
        }
    }

    counts
        .into_iter()
        .filter(|(_, count)| *count >= 10)
        .map(|(device, _)| device)
        .collect()
}

/// Groups last-10-minute failure/denied events by `(resource_type, action)`;
/// a group with ≥3 distinct principals AND ≥5 attempts per principal
/// triggers a lockdown on that resource category.
pub fn detect_coordinated_attack(events: &[AuditEventView], now: DateTime<Utc>) -> Vec<String> {
    let window_start = now - Duration::minutes(10);
    let mut groups: HashMap<(String, String), HashMap<String, u32>> = HashMap::new();

    for event in events {
        if event.timestamp < window_start {
            continue;
        }
        if !matches!(event.result, EventResult::Failure | EventResult::Denied) {
            continue;
        }
        let key = (event.resource_type.clone(), event.action.clone());
        *groups
            .entry(key)
            .or_default()
            .entry(event.principal_id.clone())
            .or_insert(0) += 1;
    }

    groups
        .into_iter()
        .filter(|(_, by_principal)| {
            by_principal.len() >= 3 && by_principal.values().all(|&count| count >= 5)
        })
        .map(|((resource_type, _), _)| resource_type)
        .collect()
}
