//! Error types for readiness verification
//!
//! Errors are structured with fields to aid debugging. Each variant names the
//! resource it concerns (when one exists) and the underlying cause, so a
//! failed run can be traced back to the step that produced it.

use thiserror::Error;

/// Default context value when no specific resource is available
pub const UNKNOWN_RESOURCE: &str = "unknown";

/// Main error type for readiness runs
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    /// Backend connection or run configuration could not be established
    #[error("configuration error: {message}")]
    Configuration {
        /// Description of what's invalid or missing
        message: String,
    },

    /// The create request for the resource failed
    #[error("creation error for {resource}: {message}")]
    Creation {
        /// Resource that could not be created
        resource: String,
        /// Description of what failed
        message: String,
    },

    /// A single fetch of the resource state failed during verification
    #[error("fetch error for {resource} on attempt {attempt}: {message}")]
    Fetch {
        /// Resource being verified
        resource: String,
        /// 1-based attempt on which the fetch failed
        attempt: u32,
        /// Description of what failed
        message: String,
    },

    /// All attempts were used without the resource becoming ready
    #[error("{resource} not ready after {attempts} attempts")]
    ReadinessTimeout {
        /// Resource being verified
        resource: String,
        /// Number of evaluations performed
        attempts: u32,
    },

    /// The run was cancelled before reaching a verdict
    #[error("verification of {resource} cancelled after {attempts} attempts")]
    Cancelled {
        /// Resource being verified
        resource: String,
        /// Number of evaluations completed before cancellation
        attempts: u32,
    },

    /// Deleting the resource after the run failed
    #[error("cleanup error for {resource}: {message}")]
    Cleanup {
        /// Resource that could not be deleted
        resource: String,
        /// Description of what failed
        message: String,
    },
}

impl Error {
    /// Create a configuration error with the given message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration {
            message: msg.into(),
        }
    }

    /// Create a creation error without resource context
    pub fn creation(msg: impl Into<String>) -> Self {
        Self::creation_for(UNKNOWN_RESOURCE, msg)
    }

    /// Create a creation error for a named resource
    pub fn creation_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Creation {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Create a fetch error for a named resource
    ///
    /// The attempt number is filled in by the verifier when the error
    /// surfaces from a backend that does not know it.
    pub fn fetch_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Fetch {
            resource: resource.into(),
            attempt: 0,
            message: msg.into(),
        }
    }

    /// Create a cleanup error for a named resource
    pub fn cleanup_for(resource: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Cleanup {
            resource: resource.into(),
            message: msg.into(),
        }
    }

    /// Whether this error determines the result of a run
    ///
    /// Cleanup failures are recorded but never fail a run: the primary
    /// result is already known by the time cleanup happens.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::Cleanup { .. })
    }

    /// Process exit code used by the CLI for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::Configuration { .. } => 2,
            Error::Creation { .. } => 3,
            Error::Fetch { .. } => 4,
            Error::ReadinessTimeout { .. } => 5,
            Error::Cancelled { .. } => 6,
            // Never escalated; a run whose only problem is cleanup succeeded
            Error::Cleanup { .. } => 0,
        }
    }

    /// Get the resource name if this error is associated with one
    pub fn resource(&self) -> Option<&str> {
        match self {
            Error::Configuration { .. } => None,
            Error::Creation { resource, .. }
            | Error::Fetch { resource, .. }
            | Error::ReadinessTimeout { resource, .. }
            | Error::Cancelled { resource, .. }
            | Error::Cleanup { resource, .. } => Some(resource),
        }
    }
}
