//! Error types for the CLI

use readiness_common::telemetry::TelemetryError;

/// CLI Result type
pub type Result<T> = std::result::Result<T, Error>;

/// Exit code for failures that are not part of the readiness taxonomy
pub const EXIT_INTERNAL: u8 = 1;

/// CLI errors
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Readiness(#[from] readiness_common::Error),

    #[error("telemetry error: {0}")]
    Telemetry(#[from] TelemetryError),
}

impl Error {
    /// Process exit code for this error
    pub fn exit_code(&self) -> u8 {
        match self {
            Error::Readiness(e) => u8::try_from(e.exit_code()).unwrap_or(EXIT_INTERNAL),
            Error::Telemetry(_) => EXIT_INTERNAL,
        }
    }
}
