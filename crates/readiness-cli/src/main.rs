//! Readiness CLI
//!
//! Exit codes: 0 ready, 2 configuration, 3 creation, 4 fetch, 5 timeout,
//! 6 cancelled.

use std::process::ExitCode;

use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, warn};

use readiness_cli::{Cli, Error};
use readiness_common::telemetry::{init_tracing, TelemetryConfig};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(TelemetryConfig {
        format: cli.log_format,
        ..Default::default()
    }) {
        let err = Error::from(e);
        eprintln!("{}", err);
        return ExitCode::from(err.exit_code());
    }

    // Ctrl-C cancels the run; cleanup still happens before exit
    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                warn!("Interrupt received, cancelling verification");
                cancel.cancel();
            }
        }
    });

    match cli.run(cancel).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, exit_code = e.exit_code(), "Readiness check failed");
            ExitCode::from(e.exit_code())
        }
    }
}
