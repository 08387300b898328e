//! Create, verify and clean up a resource in one run
//!
//! Cleanup is tied to the handle: once `create` returns one, `delete` is
//! called exactly once whatever the verification outcome. A failed delete is
//! logged and recorded in the report but never changes the outcome.

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::lifecycle::{ResourceHandle, ResourceLifecycle};
use crate::verifier::{ReadinessVerifier, VerificationOutcome};
use crate::{Error, Result};

/// What happened when the resource was deleted
#[derive(Clone, Debug, PartialEq)]
pub enum CleanupStatus {
    /// The resource was deleted (or was already gone)
    Deleted,
    /// Deletion failed; the resource may need external garbage collection
    Failed(Error),
}

/// Result of a create/verify/cleanup run
#[derive(Clone, Debug, PartialEq)]
pub struct RunReport {
    /// Handle of the created resource
    pub handle: ResourceHandle,
    /// Verification outcome
    pub outcome: VerificationOutcome,
    /// Cleanup result
    pub cleanup: CleanupStatus,
}

impl RunReport {
    /// Convert into a typed result; cleanup failures are not escalated
    pub fn into_result(self) -> Result<()> {
        self.outcome.into_result(&self.handle)
    }
}

/// Create a resource, verify it becomes ready, then delete it
///
/// # Returns
/// * `Err(Error::Creation)` if `create` fails; nothing is cleaned up since
///   no handle exists
/// * `Ok(RunReport)` otherwise, whatever the verification outcome
pub async fn run_with_cleanup<L>(
    lifecycle: &L,
    spec: &L::Spec,
    verifier: &ReadinessVerifier,
    cancel: &CancellationToken,
) -> Result<RunReport>
where
    L: ResourceLifecycle + ?Sized,
{
    let handle = lifecycle.create(spec).await.map_err(|e| match e {
        Error::Creation { .. } => e,
        other => Error::creation(other.to_string()),
    })?;
    info!(resource = %handle, "Resource created");

    let outcome = verifier.verify(lifecycle, &handle, cancel).await;
    info!(resource = %handle, outcome = %outcome, "Verification finished");

    let cleanup = cleanup(lifecycle, &handle).await;

    Ok(RunReport {
        handle,
        outcome,
        cleanup,
    })
}

/// Verify a resource created elsewhere; nothing is created or deleted
pub async fn verify_existing<L>(
    lifecycle: &L,
    handle: &ResourceHandle,
    verifier: &ReadinessVerifier,
    cancel: &CancellationToken,
) -> VerificationOutcome
where
    L: ResourceLifecycle + ?Sized,
{
    let outcome = verifier.verify(lifecycle, handle, cancel).await;
    info!(resource = %handle, outcome = %outcome, "Verification finished");
    outcome
}

async fn cleanup<L>(lifecycle: &L, handle: &ResourceHandle) -> CleanupStatus
where
    L: ResourceLifecycle + ?Sized,
{
    match lifecycle.delete(handle).await {
        Ok(()) => {
            info!(resource = %handle, "Resource deleted");
            CleanupStatus::Deleted
        }
        Err(e) => {
            let error = match e {
                Error::Cleanup { .. } => e,
                other => Error::cleanup_for(handle.to_string(), other.to_string()),
            };
            warn!(
                resource = %handle,
                error = %error,
                "Error cleaning up resource, it may need manual deletion"
            );
            CleanupStatus::Failed(error)
        }
    }
}
