//! Readiness CLI library

pub mod commands;
pub mod error;

pub use error::{Error, Result};

use clap::{Parser, Subcommand};
use readiness_common::telemetry::LogFormat;
use tokio_util::sync::CancellationToken;

/// Readiness - provision a resource and verify it becomes Ready
#[derive(Parser, Debug)]
#[command(name = "readiness")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Log output format (text or json)
    #[arg(long, global = true, env = "READINESS_LOG_FORMAT", default_value = "text")]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Create a Certificate, verify it becomes ready, then delete it
    Issue(commands::issue::IssueArgs),
    /// Verify an existing Certificate becomes ready
    Wait(commands::wait::WaitArgs),
}

impl Cli {
    /// Run the CLI command
    pub async fn run(self, cancel: CancellationToken) -> Result<()> {
        match self.command {
            Commands::Issue(args) => commands::issue::run(args, cancel).await,
            Commands::Wait(args) => commands::wait::run(args, cancel).await,
        }
    }
}
