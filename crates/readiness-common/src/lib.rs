//! Readiness verification engine
//!
//! Confirms that an asynchronously provisioned resource eventually reports a
//! ready condition, without blocking forever or hammering the backend.
//!
//! - [`condition`]: condition types and the readiness evaluator
//! - [`backoff`]: retry policy and exponential backoff scheduling
//! - [`verifier`]: the fetch/evaluate/wait state machine
//! - [`lifecycle`]: the create/fetch/delete contract a backend implements
//! - [`run`]: create, verify and clean up in one call

#![warn(missing_docs)]

pub mod backoff;
pub mod condition;
pub mod error;
pub mod lifecycle;
pub mod run;
pub mod telemetry;
pub mod verifier;

pub use backoff::RetryPolicy;
pub use condition::{Condition, ConditionStatus, CONDITION_READY};
pub use error::Error;
pub use lifecycle::{ResourceHandle, ResourceLifecycle, ResourceState};
pub use run::{run_with_cleanup, verify_existing, CleanupStatus, RunReport};
pub use verifier::{ProgressObserver, ReadinessVerifier, VerificationOutcome};

/// Result type alias using our custom Error type
pub type Result<T> = std::result::Result<T, Error>;
