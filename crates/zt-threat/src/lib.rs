//! Pattern-based threat detection over recent audit events, and the
//! automated responses its detections (and continuous-auth terminations)
//! trigger.
//!
//! `indicators` turns a 24h feature vector into threshold-crossing
//! indicators; `prediction` folds indicators into a scored, typed
//! `ThreatPrediction`; `detector` is the stateful façade that stores and
//! resolves predictions. `response` covers C11: brute-force and
//! coordinated-attack pattern matching plus the `ActionHandler`s they
//! dispatch to (block a device, lock a segment, alert administrators).

pub mod detector;
pub mod events;
pub mod indicators;
pub mod prediction;
pub mod response;

pub use detector::{Outcome, ThreatDetector};
pub use events::{AuditEventView, EventResult, Severity};
pub use indicators::{IndicatorType, ThreatFeatures, ThreatIndicator};
pub use prediction::{accuracy, ThreatPrediction, ThreatType};
pub use response::{
    detect_brute_force, detect_coordinated_attack, ActionHandler, ActionParams, ActionResult,
    AdminAlertHandler, BlockDeviceHandler, LockSegmentHandler,
};
