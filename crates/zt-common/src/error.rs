//! Error taxonomy for the zero-trust access core.
//!
//! One variant family per kind from the error handling design: validation,
//! authorization, rate limiting, conflict, not-found, timeout, dependency
//! and corruption. Every variant carries a stable `code()` string so callers
//! never have to pattern-match on the `Display` text.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ZtError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("not authorized: {0}")]
    Authorization(String),

    #[error("rate limit exceeded")]
    RateLimitExceeded,

    #[error("conflict: {0}")]
    Conflict(String),

    /// A principal already has the maximum number of active registered
    /// devices and the new registration did not carry an MFA waiver.
    #[error("device limit exceeded")]
    DeviceLimitExceeded,

    /// The submitted fingerprint matches an already-registered active
    /// device for the same principal.
    #[error("duplicate device fingerprint")]
    DuplicateFingerprint,

    /// Deliberately carries no identifying detail: the same code is
    /// returned whether an id is unknown or simply not visible to the
    /// caller, per the "don't leak which IDs exist" requirement.
    #[error("not found")]
    NotFound,

    #[error("decision timed out")]
    DecisionTimeout,

    #[error("dependency unavailable: {0}")]
    Dependency(String),

    #[error("integrity check failed: {0}")]
    Corruption(String),

    #[error("config error: {0}")]
    Config(String),
}

impl ZtError {
    /// Stable machine-readable code for the user-facing response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "VALIDATION_FAILED",
            Self::Authorization(_) => "NOT_AUTHORIZED",
            Self::RateLimitExceeded => "RATE_LIMIT_EXCEEDED",
            Self::Conflict(_) => "CONFLICT",
            Self::DeviceLimitExceeded => "DEVICE_LIMIT_EXCEEDED",
            Self::DuplicateFingerprint => "DUPLICATE_FINGERPRINT",
            Self::NotFound => "NOT_FOUND",
            Self::DecisionTimeout => "DECISION_TIMEOUT",
            Self::Dependency(_) => "DEPENDENCY_UNAVAILABLE",
            Self::Corruption(_) => "INTEGRITY_FAILURE",
            Self::Config(_) => "CONFIG_ERROR",
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }
}

pub type ZtResult<T> = Result<T, ZtError>;
