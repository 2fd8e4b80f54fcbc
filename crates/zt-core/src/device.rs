//! Device fingerprint registry (C2): normalized canvas/WebGL/audio/screen/
//! system characteristics, hashed for identity and scored for similarity.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};
use zt_common::{DeviceId, PrincipalId, ZtError, ZtResult};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Characteristics {
    pub canvas_hash: String,
    pub canvas_confidence: f64,
    pub webgl_renderer: Option<String>,
    pub webgl_vendor: Option<String>,
    pub webgl_version: Option<String>,
    pub audio_hash: String,
    pub screen_width: u32,
    pub screen_height: u32,
    pub pixel_ratio: f64,
    pub platform: String,
    pub language: String,
    pub timezone: String,
    pub cpu_concurrency: u32,
    pub user_agent: String,
}

impl Characteristics {
    /// Normalize into a canonical form before hashing: lowercase strings,
    /// round pixelRatio to 0.1, drop the volatile `user_agent` field, and
    /// use a `BTreeMap` for stable key ordering.
    fn canonical(&self) -> Value {
        let mut map = BTreeMap::new();
        map.insert("canvas_hash", Value::String(self.canvas_hash.to_lowercase()));
        map.insert(
            "webgl_renderer",
            Value::String(self.webgl_renderer.clone().unwrap_or_default().to_lowercase()),
        );
        map.insert(
            "webgl_vendor",
            Value::String(self.webgl_vendor.clone().unwrap_or_default().to_lowercase()),
        );
        map.insert("audio_hash", Value::String(self.audio_hash.to_lowercase()));
        map.insert("screen_width", Value::from(self.screen_width));
        map.insert("screen_height", Value::from(self.screen_height));
        map.insert("pixel_ratio", Value::from((self.pixel_ratio * 10.0).round() / 10.0));
        map.insert("platform", Value::String(self.platform.to_lowercase()));
        map.insert("language", Value::String(self.language.to_lowercase()));
        map.insert("timezone", Value::String(self.timezone.to_lowercase()));

        let ordered: serde_json::Map<String, Value> =
            map.into_iter().map(|(k, v)| (k.to_string(), v)).collect();
        Value::Object(ordered)
    }

    pub fn fingerprint_hash(&self) -> String {
        let canonical = self.canonical().to_string();
        let digest = Sha256::digest(canonical.as_bytes());
        hex::encode(digest)
    }

    fn is_anomalous(&self) -> Option<String> {
        if self.canvas_confidence < 50.0 {
            return Some("low canvas confidence".into());
        }
        if self.webgl_renderer.is_none() {
            return Some("missing WebGL renderer".into());
        }
        if self.screen_width < 1024 || self.screen_height < 768 {
            return Some("unusual resolution".into());
        }
        if looks_headless(&self.user_agent) {
            return Some("headless browser user agent".into());
        }
        if self.cpu_concurrency > 32 {
            return Some("implausible CPU concurrency".into());
        }
        None
    }
}

fn looks_headless(user_agent: &str) -> bool {
    let ua = user_agent.to_lowercase();
    ua.contains("headless") || ua.contains("phantomjs") || ua.is_empty()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub device_id: DeviceId,
    pub principal_id: PrincipalId,
    pub fingerprint_hash: String,
    pub characteristics: Characteristics,
    pub trust_score: f64,
    pub is_blocked: bool,
    pub is_approved: bool,
    pub active: bool,
    pub warnings: Vec<String>,
    pub registered_at: DateTime<Utc>,
    pub last_verified_at: DateTime<Utc>,
    pub mfa_verified: bool,
}

#[derive(Debug, Clone)]
pub struct ValidationResult {
    pub device_id: DeviceId,
    pub similarity: f64,
    pub approved: bool,
}

pub struct DeviceRegistry {
    devices: dashmap::DashMap<String, DeviceRecord>,
    max_active_per_user: u32,
    expire_days: i64,
}

impl DeviceRegistry {
    pub fn new(max_active_per_user: u32, expire_days: u32) -> Self {
        Self {
            devices: dashmap::DashMap::new(),
            max_active_per_user,
            expire_days: expire_days as i64,
        }
    }

    fn active_for_principal(&self, principal_id: &str) -> Vec<DeviceRecord> {
        self.devices
            .iter()
            .filter(|r| r.principal_id.as_str() == principal_id && r.active)
            .map(|r| r.clone())
            .collect()
    }

    pub fn register(
        &self,
        principal_id: &PrincipalId,
        characteristics: Characteristics,
        mfa_verified: bool,
        now: DateTime<Utc>,
    ) -> ZtResult<DeviceRecord> {
        let active = self.active_for_principal(principal_id.as_str());

        if active.len() as u32 >= self.max_active_per_user && !mfa_verified {
            return Err(ZtError::DeviceLimitExceeded);
        }

        let fingerprint_hash = characteristics.fingerprint_hash();
        if active.iter().any(|d| d.fingerprint_hash == fingerprint_hash) {
            return Err(ZtError::DuplicateFingerprint);
        }

        let mut warnings = Vec::new();
        let mut trust_score = 100.0;
        if let Some(warning) = characteristics.is_anomalous() {
            warnings.push(warning);
            trust_score = trust_score.min(60.0);
        }

        let record = DeviceRecord {
            device_id: DeviceId::new(),
            principal_id: principal_id.clone(),
            fingerprint_hash,
            characteristics,
            trust_score,
            is_blocked: false,
            is_approved: true,
            active: true,
            warnings,
            registered_at: now,
            last_verified_at: now,
            mfa_verified,
        };

        self.devices.insert(record.device_id.to_string(), record.clone());
        Ok(record)
    }

    /// Validate a current characteristics sample against every active
    /// device for the principal, returning the best match.
    pub fn validate(&self, principal_id: &str, current: &Characteristics, now: DateTime<Utc>) -> Option<ValidationResult> {
        let active = self.active_for_principal(principal_id);
        let mut best: Option<ValidationResult> = None;

        for record in active {
            let similarity = similarity(&record.characteristics, current);
            let approved = similarity >= 85.0 && !record.is_blocked;

            if let Some(mut existing) = self.devices.get_mut(&record.device_id.to_string()) {
                existing.trust_score = (existing.trust_score + if approved { 5.0 } else { -10.0 }).clamp(0.0, 100.0);
                existing.last_verified_at = now;
            }

            if best.as_ref().map(|b| similarity > b.similarity).unwrap_or(true) {
                best = Some(ValidationResult {
                    device_id: record.device_id,
                    similarity,
                    approved,
                });
            }
        }

        best
    }

    pub fn block(&self, device_id: &str, reason: &str) -> ZtResult<()> {
        let mut record = self.devices.get_mut(device_id).ok_or(ZtError::NotFound)?;
        record.is_blocked = true;
        record.warnings.push(format!("blocked: {reason}"));
        Ok(())
    }

    /// Periodic sweep: devices unverified for `expire_days` go inactive.
    pub fn sweep_expired(&self, now: DateTime<Utc>) -> u32 {
        let mut expired = 0;
        for mut record in self.devices.iter_mut() {
            if record.active && (now - record.last_verified_at).num_days() >= self.expire_days {
                record.active = false;
                expired += 1;
            }
        }
        expired
    }
}

fn similarity(baseline: &Characteristics, current: &Characteristics) -> f64 {
    let canvas = if baseline.canvas_hash == current.canvas_hash { 1.0 } else { 0.0 };

    let webgl_fields = [
        (&baseline.webgl_renderer, &current.webgl_renderer),
        (&baseline.webgl_vendor, &current.webgl_vendor),
        (&baseline.webgl_version, &current.webgl_version),
    ];
    let webgl_matches = webgl_fields.iter().filter(|(a, b)| a == b).count();
    let webgl = webgl_matches as f64 / 3.0;

    let audio = if baseline.audio_hash == current.audio_hash { 1.0 } else { 0.0 };

    let width_diff = (baseline.screen_width as i64 - current.screen_width as i64).abs();
    let height_diff = (baseline.screen_height as i64 - current.screen_height as i64).abs();
    let screen = if width_diff == 0 && height_diff == 0 {
        1.0
    } else if width_diff <= 100 && height_diff <= 100 {
        0.8
    } else {
        0.0
    };

    let system_fields = [
        (&baseline.platform, &current.platform),
        (&baseline.language, &current.language),
        (&baseline.timezone, &current.timezone),
    ];
    let system_matches = system_fields.iter().filter(|(a, b)| a == b).count();
    let system = system_matches as f64 / 3.0;

    (canvas * 0.25 + webgl * 0.20 + audio * 0.15 + screen * 0.20 + system * 0.20) * 100.0
}

impl Clone for DeviceRecord {
    fn clone(&self) -> Self {
        Self {
            device_id: self.device_id.clone(),
            principal_id: self.principal_id.clone(),
            fingerprint_hash: self.fingerprint_hash.clone(),
            characteristics: self.characteristics.clone(),
            trust_score: self.trust_score,
            is_blocked: self.is_blocked,
            is_approved: self.is_approved,
            active: self.active,
            warnings: self.warnings.clone(),
            registered_at: self.registered_at,
            last_verified_at: self.last_verified_at,
            mfa_verified: self.mfa_verified,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Characteristics {
        Characteristics {
            canvas_hash: "abc123".into(),
            canvas_confidence: 90.0,
            webgl_renderer: Some("Apple GPU".into()),
            webgl_vendor: Some("Apple Inc.".into()),
            webgl_version: Some("WebGL 2.0".into()),
            audio_hash: "def456".into(),
            screen_width: 1920,
            screen_height: 1080,
            pixel_ratio: 2.0,
            platform: "MacIntel".into(),
            language: "en-US".into(),
            timezone: "America/New_York".into(),
            cpu_concurrency: 8,
            user_agent: "Mozilla/5.0".into(),
        }
    }

    #[test]
    fn registration_caps_at_max_devices_without_mfa() {
        let registry = DeviceRegistry::new(2, 90);
        let principal = PrincipalId::new();
        let now = Utc::now();

        let mut c1 = sample();
        c1.canvas_hash = "one".into();
        registry.register(&principal, c1, false, now).unwrap();

        let mut c2 = sample();
        c2.canvas_hash = "two".into();
        registry.register(&principal, c2, false, now).unwrap();

        let mut c3 = sample();
        c3.canvas_hash = "three".into();
        let err = registry.register(&principal, c3, false, now).unwrap_err();
        assert_eq!(err.code(), "DEVICE_LIMIT_EXCEEDED");
    }

    #[test]
    fn duplicate_fingerprint_rejected() {
        let registry = DeviceRegistry::new(3, 90);
        let principal = PrincipalId::new();
        let now = Utc::now();

        registry.register(&principal, sample(), false, now).unwrap();
        let err = registry.register(&principal, sample(), false, now).unwrap_err();
        assert_eq!(err.code(), "DUPLICATE_FINGERPRINT");
    }

    #[test]
    fn identical_characteristics_validate_at_full_similarity() {
        let registry = DeviceRegistry::new(3, 90);
        let principal = PrincipalId::new();
        let now = Utc::now();
        registry.register(&principal, sample(), false, now).unwrap();

        let result = registry.validate(principal.as_str(), &sample(), now).unwrap();
        assert!(result.similarity > 99.0);
        assert!(result.approved);
    }

    #[test]
    fn anomalous_registration_caps_trust_score() {
        let registry = DeviceRegistry::new(3, 90);
        let principal = PrincipalId::new();
        let mut anomalous = sample();
        anomalous.webgl_renderer = None;

        let record = registry.register(&principal, anomalous, false, Utc::now()).unwrap();
        assert!(record.trust_score <= 60.0);
        assert!(!record.warnings.is_empty());
    }
}
