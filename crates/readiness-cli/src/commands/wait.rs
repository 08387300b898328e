//! Wait command - Verify an existing certificate becomes ready
//!
//! Usage: readiness wait --name <name> --namespace <ns>
//!
//! Nothing is created or deleted; only the readiness check runs.

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::info;

use readiness_common::{verify_existing, ResourceHandle};
use readiness_kube::certificate::CERTIFICATE_KIND;
use readiness_kube::CertificateLifecycle;

use super::{ConnectionArgs, PolicyArgs, TargetArgs};
use crate::Result;

/// Wait for an existing Certificate to become ready
#[derive(Args, Debug, Clone)]
pub struct WaitArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl WaitArgs {
    /// Handle of the certificate to watch
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle::namespaced(CERTIFICATE_KIND, &self.target.namespace, &self.target.name)
    }
}

/// Run the wait command
pub async fn run(args: WaitArgs, cancel: CancellationToken) -> Result<()> {
    let verifier = args.policy.to_verifier()?;
    let handle = args.handle();
    let client = args.connection.connect().await?;
    let lifecycle = CertificateLifecycle::new(client);

    info!(resource = %handle, "Waiting for certificate");
    let outcome = verify_existing(&lifecycle, &handle, &verifier, &cancel).await;
    Ok(outcome.into_result(&handle)?)
}
