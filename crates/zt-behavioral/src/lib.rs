//! Per-principal behavioral biometric baselining.
//!
//! Tracks five rolling features per principal (keystroke inter-arrival,
//! mouse path velocity, navigation n-gram score, request rate, session
//! duration) via Welford's online mean/variance, and scores new samples
//! against the accumulated baseline. A baseline is "established" once a
//! principal has contributed at least `min_sessions` samples (default 5);
//! before that, callers get `Deviation::NoBaseline` and should treat it as
//! a neutral 50 rather than either trusting or penalizing the session.

mod baseline;

pub use baseline::{BehavioralEngine, BehavioralSample, Deviation};
