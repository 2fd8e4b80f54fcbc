//! Shared types for the zero-trust continuous-access core.
//!
//! This crate carries the cross-cutting concerns every other crate in the
//! workspace depends on:
//! - opaque entity identifiers
//! - the error taxonomy (`error::ZtError`)
//! - the enumerated configuration record (`config::CoreConfig`)
//! - capability traits at the core boundary (`capability`)
//! - an injectable clock for deterministic sweep/expiry tests

pub mod capability;
pub mod clock;
pub mod config;
pub mod error;
pub mod ids;

pub use capability::{AuditChain, AuditReceipt, IdentityVerifier, Notifier, Priority, Store, VerifiedIdentity};
pub use clock::{Clock, SystemClock};
pub use config::CoreConfig;
pub use error::{ZtError, ZtResult};
pub use ids::*;
