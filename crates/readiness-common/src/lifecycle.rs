//! Resource lifecycle collaborator
//!
//! The engine never talks to a backend directly. It consumes the three
//! operations of [`ResourceLifecycle`]: create once, fetch repeatedly, delete
//! once. Implementations surface every error as-is; retry policy belongs to
//! the verifier alone.

use async_trait::async_trait;

#[cfg(test)]
use mockall::automock;

use crate::condition::Condition;
use crate::Result;

/// Opaque reference to a created resource, used for fetch and delete
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct ResourceHandle {
    /// Resource kind (e.g., "Certificate")
    pub kind: String,
    /// Resource name
    pub name: String,
    /// Namespace, for namespaced resources
    pub namespace: Option<String>,
}

impl ResourceHandle {
    /// Handle for a namespaced resource
    pub fn namespaced(
        kind: impl Into<String>,
        namespace: impl Into<String>,
        name: impl Into<String>,
    ) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: Some(namespace.into()),
        }
    }

    /// Handle for a cluster-scoped resource
    pub fn cluster_scoped(kind: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            name: name.into(),
            namespace: None,
        }
    }
}

impl std::fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.namespace {
            Some(ns) => write!(f, "{} {}/{}", self.kind, ns, self.name),
            None => write!(f, "{} {}", self.kind, self.name),
        }
    }
}

/// Snapshot of a monitored resource
///
/// Only the conditions matter to the engine; everything else about the
/// resource stays with the backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ResourceState {
    /// Status conditions in backend order
    pub conditions: Vec<Condition>,
    /// Generation the backend controller last observed, if reported
    pub observed_generation: Option<i64>,
}

impl ResourceState {
    /// State carrying only conditions
    pub fn with_conditions(conditions: Vec<Condition>) -> Self {
        Self {
            conditions,
            observed_generation: None,
        }
    }
}

/// Trait abstracting backend create/fetch/delete operations
///
/// This trait allows mocking the backend in tests while using a real
/// client (e.g., Kubernetes) in production.
#[cfg_attr(test, automock(type Spec = String;))]
#[async_trait]
pub trait ResourceLifecycle: Send + Sync {
    /// Backend-specific creation request, passed through untouched
    type Spec: Send + Sync;

    /// Submit the creation request
    ///
    /// Called once per run; idempotency is not assumed.
    async fn create(&self, spec: &Self::Spec) -> Result<ResourceHandle>;

    /// Fetch the current state of the resource behind `handle`
    ///
    /// Transient failures are returned, not retried.
    async fn fetch(&self, handle: &ResourceHandle) -> Result<ResourceState>;

    /// Delete the resource behind `handle`
    ///
    /// Best-effort. Deleting an already-deleted resource must succeed.
    async fn delete(&self, handle: &ResourceHandle) -> Result<()>;
}
