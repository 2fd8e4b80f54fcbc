//! Capability interfaces at the core boundary.
//!
//! The core composes these by explicit dependency injection (constructor
//! parameters), never through a global registry. Concrete adapters for the
//! document store, blob store, identity provider, notification channels and
//! audit anchor live outside this workspace; these traits are the contract
//! they must satisfy.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ZtResult;

/// Document-store capability. No transactional guarantee beyond
/// single-document atomicity is required of implementations.
#[async_trait]
pub trait Store: Send + Sync {
    async fn get(&self, collection: &str, id: &str) -> ZtResult<Option<Value>>;
    async fn put(&self, collection: &str, id: &str, doc: Value) -> ZtResult<()>;
    async fn update(&self, collection: &str, id: &str, patch: Value) -> ZtResult<()>;
    async fn delete(&self, collection: &str, id: &str) -> ZtResult<()>;
    async fn query(
        &self,
        collection: &str,
        predicates: Value,
        order_by: Option<&str>,
        limit: Option<usize>,
    ) -> ZtResult<Vec<Value>>;
}

/// One tamper-evident audit write; satisfied equally by a hash chain, an
/// append-only log, or an actual blockchain anchor.
#[derive(Debug, Clone)]
pub struct AuditReceipt {
    pub transaction_id: String,
    pub block_number: u64,
    pub event_hash: String,
    pub previous_hash: String,
}

#[async_trait]
pub trait AuditChain: Send + Sync {
    async fn submit(&self, event: Value) -> ZtResult<AuditReceipt>;
    async fn verify(&self, transaction_id: &str, event: Value) -> ZtResult<bool>;
    async fn verify_chain(&self, start: u64, end: u64) -> ZtResult<bool>;
}

/// Verifies a bearer token against the identity provider. The core never
/// issues or refreshes identity tokens itself.
#[derive(Debug, Clone)]
pub struct VerifiedIdentity {
    pub principal_id: String,
    pub role: String,
    pub mfa_verified: bool,
}

#[async_trait]
pub trait IdentityVerifier: Send + Sync {
    async fn verify_token(&self, bearer_token: &str) -> ZtResult<VerifiedIdentity>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    Low,
    Normal,
    High,
    Critical,
}

/// Best-effort notification sinks. Delivery failures are logged and must
/// never block the decision path.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn user_notify(&self, principal_id: &str, title: &str, body: &str, priority: Priority, data: Value);
    async fn admin_broadcast(&self, title: &str, body: &str, priority: Priority, data: Value);
}
