//! Rolling mean/variance baselines and deviation scoring.

use std::collections::HashMap;

use parking_lot::RwLock;

const NUM_FEATURES: usize = 5;
/// `[keystroke, mouse_velocity, nav_ngram, request_rate, session_duration]`,
/// matching the order features are packed into `BehavioralSample::as_array`.
const FEATURE_WEIGHTS: [f64; NUM_FEATURES] = [0.25, 0.20, 0.20, 0.20, 0.15];
const EPSILON: f64 = 1e-6;

/// One observed session's raw behavioral signals.
#[derive(Debug, Clone, Copy)]
pub struct BehavioralSample {
    pub keystroke_interval_ms: f64,
    pub mouse_velocity: f64,
    pub nav_ngram_score: f64,
    pub request_rate: f64,
    pub session_duration_secs: f64,
}

impl BehavioralSample {
    fn as_array(&self) -> [f64; NUM_FEATURES] {
        [
            self.keystroke_interval_ms,
            self.mouse_velocity,
            self.nav_ngram_score,
            self.request_rate,
            self.session_duration_secs,
        ]
    }
}

/// Result of scoring a sample against a principal's baseline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Deviation {
    /// Fewer than `min_sessions` samples observed; callers should treat
    /// this as a neutral 50 rather than trusting or penalizing it.
    NoBaseline,
    Established { deviation_score: f64, is_anomalous: bool },
}

impl Deviation {
    /// The score to feed into a caller's confidence composite: the
    /// established deviation score, or a neutral 50 with no baseline yet.
    pub fn score_or_neutral(&self) -> f64 {
        match self {
            Deviation::NoBaseline => 50.0,
            Deviation::Established { deviation_score, .. } => *deviation_score,
        }
    }

    pub fn is_anomalous(&self) -> bool {
        matches!(self, Deviation::Established { is_anomalous: true, .. })
    }
}

/// Welford's online algorithm, one instance per feature.
#[derive(Debug, Clone, Copy)]
struct RunningStat {
    count: u64,
    mean: f64,
    m2: f64,
}

impl Default for RunningStat {
    fn default() -> Self {
        Self { count: 0, mean: 0.0, m2: 0.0 }
    }
}

impl RunningStat {
    fn update(&mut self, x: f64) {
        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        let delta2 = x - self.mean;
        self.m2 += delta * delta2;
    }

    fn stddev(&self) -> f64 {
        if self.count < 2 {
            0.0
        } else {
            (self.m2 / (self.count - 1) as f64).sqrt()
        }
    }
}

#[derive(Debug, Clone, Default)]
struct PrincipalBaseline {
    stats: [RunningStat; NUM_FEATURES],
    sessions: u64,
}

/// Behavioral biometrics engine: one baseline per principal, updated
/// incrementally and never requiring a full history replay.
pub struct BehavioralEngine {
    baselines: RwLock<HashMap<String, PrincipalBaseline>>,
    min_sessions: u64,
}

impl BehavioralEngine {
    pub fn new() -> Self {
        Self {
            baselines: RwLock::new(HashMap::new()),
            min_sessions: 5,
        }
    }

    pub fn with_min_sessions(min_sessions: u64) -> Self {
        Self {
            baselines: RwLock::new(HashMap::new()),
            min_sessions,
        }
    }

    /// Fold a sample into the principal's baseline.
    pub fn observe(&self, principal_id: &str, sample: &BehavioralSample) {
        let mut baselines = self.baselines.write();
        let baseline = baselines.entry(principal_id.to_string()).or_default();
        for (stat, value) in baseline.stats.iter_mut().zip(sample.as_array()) {
            stat.update(value);
        }
        baseline.sessions += 1;
    }

    /// Score a sample against the principal's baseline without updating it.
    pub fn score(&self, principal_id: &str, sample: &BehavioralSample) -> Deviation {
        let baselines = self.baselines.read();
        let Some(baseline) = baselines.get(principal_id) else {
            return Deviation::NoBaseline;
        };
        if baseline.sessions < self.min_sessions {
            return Deviation::NoBaseline;
        }

        let current = sample.as_array();
        let mut weighted_sum = 0.0;
        for i in 0..NUM_FEATURES {
            let stat = &baseline.stats[i];
            let sigma = stat.stddev().max(EPSILON);
            let diff = (current[i] - stat.mean).abs();
            weighted_sum += FEATURE_WEIGHTS[i] * (diff / sigma);
        }
        let deviation_score = 100.0 * weighted_sum.min(1.0);

        Deviation::Established {
            deviation_score,
            is_anomalous: deviation_score > 70.0,
        }
    }
}

impl Default for BehavioralEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn typical_sample() -> BehavioralSample {
        BehavioralSample {
            keystroke_interval_ms: 180.0,
            mouse_velocity: 450.0,
            nav_ngram_score: 0.6,
            request_rate: 4.0,
            session_duration_secs: 1200.0,
        }
    }

    #[test]
    fn no_baseline_until_min_sessions() {
        let engine = BehavioralEngine::new();
        for _ in 0..4 {
            engine.observe("p1", &typical_sample());
        }
        assert_eq!(engine.score("p1", &typical_sample()), Deviation::NoBaseline);
        assert_eq!(Deviation::NoBaseline.score_or_neutral(), 50.0);
    }

    #[test]
    fn established_baseline_scores_typical_sample_low() {
        let engine = BehavioralEngine::new();
        for _ in 0..10 {
            engine.observe("p1", &typical_sample());
        }
        let deviation = engine.score("p1", &typical_sample());
        match deviation {
            Deviation::Established { deviation_score, is_anomalous } => {
                assert!(deviation_score < 5.0, "expected near-zero deviation, got {deviation_score}");
                assert!(!is_anomalous);
            }
            Deviation::NoBaseline => panic!("expected an established baseline"),
        }
    }

    #[test]
    fn wildly_different_sample_is_anomalous() {
        let engine = BehavioralEngine::new();
        for _ in 0..10 {
            // Low-variance baseline so a 10x jump clears the threshold.
            engine.observe(
                "p1",
                &BehavioralSample {
                    keystroke_interval_ms: 180.0,
                    mouse_velocity: 450.0,
                    nav_ngram_score: 0.6,
                    request_rate: 4.0,
                    session_duration_secs: 1200.0,
                },
            );
        }
        let outlier = BehavioralSample {
            keystroke_interval_ms: 20.0,
            mouse_velocity: 4000.0,
            nav_ngram_score: 0.01,
            request_rate: 80.0,
            session_duration_secs: 10.0,
        };
        let deviation = engine.score("p1", &outlier);
        assert!(deviation.is_anomalous());
        assert!(deviation.score_or_neutral() > 70.0);
    }
}
