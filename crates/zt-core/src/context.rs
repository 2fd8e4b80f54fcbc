//! Contextual intelligence (C3): five weighted sub-scores combine into an
//! overall context score, plus the impossible-travel detector that feeds
//! both this score and continuous auth (C10).

use std::collections::HashMap;

use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DeviceHealth {
    pub os_updated: bool,
    pub security_software_current: bool,
    pub disk_encrypted: bool,
    pub device_known: bool,
    pub mdm_compliant: bool,
}

impl DeviceHealth {
    fn score(&self) -> f64 {
        let mut score = 0.0;
        score += if self.os_updated { 30.0 } else { 0.0 };
        score += if self.security_software_current { 25.0 } else { 0.0 };
        score += if self.disk_encrypted { 20.0 } else { 0.0 };
        score += if self.device_known { 15.0 } else { 0.0 };
        score += if self.mdm_compliant { 10.0 } else { 0.0 };
        score
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NetworkType {
    CampusWifi,
    Vpn,
    Home,
    Unknown,
    Public,
}

impl NetworkType {
    fn base_score(&self) -> f64 {
        match self {
            NetworkType::CampusWifi => 100.0,
            NetworkType::Vpn => 90.0,
            NetworkType::Home => 60.0,
            NetworkType::Unknown => 40.0,
            NetworkType::Public => 20.0,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct NetworkContext {
    pub network_type: NetworkType,
    pub vpn_in_use: bool,
}

impl NetworkContext {
    fn score(&self) -> f64 {
        let vpn_component = if self.vpn_in_use { 100.0 } else { 0.0 };
        self.network_type.base_score() * 0.70 + vpn_component * 0.30
    }
}

#[derive(Debug, Clone, Copy)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

/// Great-circle distance in kilometers (haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    const EARTH_RADIUS_KM: f64 = 6371.0;
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = (b.lat - a.lat).to_radians();
    let dlon = (b.lon - a.lon).to_radians();

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_KM * h.sqrt().asin()
}

/// Flags impossible travel: speed implied by two successive locations
/// exceeding 1000 km/h. Returns `false` with no prior location.
pub fn is_impossible_travel(prior: Option<(GeoPoint, DateTime<Utc>)>, current: (GeoPoint, DateTime<Utc>)) -> bool {
    let Some((prior_point, prior_at)) = prior else {
        return false;
    };
    let hours = (current.1 - prior_at).num_seconds() as f64 / 3600.0;
    if hours <= 0.0 {
        return true;
    }
    distance_km(prior_point, current.0) / hours > 1000.0
}

fn location_risk_score(current_ip: &str, frequent_ips: &[String], current: Option<GeoPoint>, history: &[GeoPoint]) -> f64 {
    if frequent_ips.iter().any(|ip| ip == current_ip) {
        return 0.0;
    }
    let Some(current) = current else {
        return 40.0;
    };
    let nearest = history
        .iter()
        .map(|h| distance_km(*h, current))
        .fold(f64::INFINITY, f64::min);

    if !nearest.is_finite() {
        40.0
    } else if nearest <= 50.0 {
        90.0
    } else if nearest <= 200.0 {
        70.0
    } else if nearest <= 1000.0 {
        40.0
    } else {
        10.0
    }
}

fn time_appropriateness_score(at: DateTime<Utc>, typical_hours: &[u32]) -> f64 {
    let hour = at.hour();
    if typical_hours.contains(&hour) {
        return 100.0;
    }
    let weekday = at.weekday().number_from_monday() <= 5;
    let daytime = (6..22).contains(&hour);
    if weekday && daytime {
        return 60.0;
    }
    if (2..6).contains(&hour) {
        return 30.0;
    }
    if daytime {
        // Weekend daytime: same band as weekday daytime.
        return 60.0;
    }
    // Remaining off-hours (22:00-02:00, wrapping past midnight): linear
    // falloff from the day-band anchor (60.0 at 22:00) to the deep-night
    // anchor (30.0 at 02:00) across the 4-hour span between them.
    let hours_past_day_end = ((hour + 24) - 22) % 24;
    let fraction = (hours_past_day_end as f64 / 4.0).clamp(0.0, 1.0);
    60.0 - fraction * 30.0
}

/// Exponentially smoothed success rate over the most recent events,
/// oldest-first. Empty history yields a neutral 50.
pub fn historical_trust_score(recent_outcomes: &[bool], alpha: f64) -> f64 {
    if recent_outcomes.is_empty() {
        return 50.0;
    }
    let mut smoothed = if recent_outcomes[0] { 100.0 } else { 0.0 };
    for &success in &recent_outcomes[1..] {
        let sample = if success { 100.0 } else { 0.0 };
        smoothed = alpha * sample + (1.0 - alpha) * smoothed;
    }
    smoothed
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContextResult {
    pub overall_score: f64,
    pub sub_scores: HashMap<String, f64>,
    pub requires_step_up_auth: bool,
    pub recommendations: Vec<String>,
}

pub struct ContextInputs<'a> {
    pub device_health: DeviceHealth,
    pub network: NetworkContext,
    pub at: DateTime<Utc>,
    pub typical_hours: &'a [u32],
    pub current_ip: &'a str,
    pub frequent_ips: &'a [String],
    pub current_location: Option<GeoPoint>,
    pub location_history: &'a [GeoPoint],
    pub recent_outcomes: &'a [bool],
}

const WEIGHTS: [(&str, f64); 5] = [
    ("device_health", 0.25),
    ("network_security", 0.20),
    ("time_appropriateness", 0.15),
    ("location_risk_inverted", 0.20),
    ("historical_trust", 0.20),
];

pub fn evaluate(inputs: &ContextInputs) -> ContextResult {
    let device_health = inputs.device_health.score();
    let network_security = inputs.network.score();
    let time_appropriateness = time_appropriateness_score(inputs.at, inputs.typical_hours);
    let location_risk = location_risk_score(
        inputs.current_ip,
        inputs.frequent_ips,
        inputs.current_location,
        inputs.location_history,
    );
    let historical_trust = historical_trust_score(inputs.recent_outcomes, 0.3);

    // Location is scored as risk (higher = worse); fold into the overall
    // average as its safety complement.
    let location_safety = 100.0 - location_risk;

    let mut sub_scores = HashMap::new();
    sub_scores.insert("device_health".to_string(), device_health);
    sub_scores.insert("network_security".to_string(), network_security);
    sub_scores.insert("time_appropriateness".to_string(), time_appropriateness);
    sub_scores.insert("location_risk".to_string(), location_risk);
    sub_scores.insert("historical_trust".to_string(), historical_trust);

    let values = [device_health, network_security, time_appropriateness, location_safety, historical_trust];
    let overall_score: f64 = WEIGHTS.iter().zip(values.iter()).map(|((_, w), v)| w * v).sum();

    let requires_step_up_auth = overall_score < 60.0;
    let recommendations = if requires_step_up_auth {
        recommend(&sub_scores, location_risk)
    } else {
        Vec::new()
    };

    ContextResult {
        overall_score: overall_score.clamp(0.0, 100.0),
        sub_scores,
        requires_step_up_auth,
        recommendations,
    }
}

fn recommend(sub_scores: &HashMap<String, f64>, location_risk: f64) -> Vec<String> {
    let mut gaps: Vec<(&str, f64)> = vec![
        ("device_health", 100.0 - sub_scores["device_health"]),
        ("network_security", 100.0 - sub_scores["network_security"]),
        ("time_appropriateness", 100.0 - sub_scores["time_appropriateness"]),
        ("location_risk", location_risk),
        ("historical_trust", 100.0 - sub_scores["historical_trust"]),
    ];
    gaps.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());

    gaps.into_iter()
        .filter(|(_, gap)| *gap > 20.0)
        .map(|(factor, _)| match factor {
            "device_health" => "Update OS and security software, enable disk encryption".to_string(),
            "network_security" => "Enable VPN before accessing this resource".to_string(),
            "time_appropriateness" => "Access outside your typical hours; expect a step-up challenge".to_string(),
            "location_risk" => "Access from an unrecognized location; verify with step-up auth".to_string(),
            _ => "Recent activity has deviated from your historical pattern".to_string(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn full_device_health_scores_one_hundred() {
        let health = DeviceHealth {
            os_updated: true,
            security_software_current: true,
            disk_encrypted: true,
            device_known: true,
            mdm_compliant: true,
        };
        assert_eq!(health.score(), 100.0);
    }

    #[test]
    fn known_ip_has_zero_location_risk() {
        let risk = location_risk_score("10.0.0.1", &["10.0.0.1".to_string()], None, &[]);
        assert_eq!(risk, 0.0);
    }

    #[test]
    fn distant_location_scores_high_risk() {
        let campus = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let far_away = GeoPoint { lat: 51.5074, lon: -0.1278 };
        let risk = location_risk_score("1.2.3.4", &[], Some(far_away), &[campus]);
        assert_eq!(risk, 10.0);
    }

    #[test]
    fn impossible_travel_detected_across_continents() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let t1 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 30, 0).unwrap();
        let nyc = GeoPoint { lat: 40.7128, lon: -74.0060 };
        let london = GeoPoint { lat: 51.5074, lon: -0.1278 };
        assert!(is_impossible_travel(Some((nyc, t0)), (london, t1)));
    }

    #[test]
    fn no_prior_location_never_flags() {
        let t0 = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let nyc = GeoPoint { lat: 40.7128, lon: -74.0060 };
        assert!(!is_impossible_travel(None, (nyc, t0)));
    }

    #[test]
    fn late_night_hours_fall_off_linearly_toward_deep_night() {
        let at_22 = Utc.with_ymd_and_hms(2026, 1, 5, 22, 0, 0).unwrap();
        let at_23 = Utc.with_ymd_and_hms(2026, 1, 5, 23, 0, 0).unwrap();
        let at_01 = Utc.with_ymd_and_hms(2026, 1, 6, 1, 0, 0).unwrap();
        assert_eq!(time_appropriateness_score(at_22, &[]), 60.0);
        assert_eq!(time_appropriateness_score(at_23, &[]), 52.5);
        assert_eq!(time_appropriateness_score(at_01, &[]), 37.5);
    }

    #[test]
    fn low_overall_score_requires_step_up() {
        let inputs = ContextInputs {
            device_health: DeviceHealth::default(),
            network: NetworkContext { network_type: NetworkType::Public, vpn_in_use: false },
            at: Utc.with_ymd_and_hms(2026, 1, 1, 3, 0, 0).unwrap(),
            typical_hours: &[],
            current_ip: "1.2.3.4",
            frequent_ips: &[],
            current_location: None,
            location_history: &[],
            recent_outcomes: &[],
        };
        let result = evaluate(&inputs);
        assert!(result.requires_step_up_auth);
        assert!(!result.recommendations.is_empty());
    }
}
