//! Issue command - Request a certificate and verify it becomes ready
//!
//! Usage: readiness issue --name <name> --issuer-name <issuer>
//!
//! 1. Creates a cert-manager Certificate
//! 2. Polls its condition with exponential backoff
//! 3. Deletes the Certificate whatever the outcome, including Ctrl-C

use clap::Args;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use readiness_common::{run_with_cleanup, CleanupStatus};
use readiness_kube::certificate::{
    CertificateRequest, IssuerRef, CERT_MANAGER_GROUP, DEFAULT_COMMON_NAME, DEFAULT_ISSUER_KIND,
    DEFAULT_ISSUER_NAME, DEFAULT_SECRET_NAME,
};
use readiness_kube::CertificateLifecycle;

use super::{ConnectionArgs, PolicyArgs, TargetArgs};
use crate::Result;

/// Create a Certificate, wait for it to become ready, then delete it
#[derive(Args, Debug, Clone)]
pub struct IssueArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Secret that will hold the issued keypair
    #[arg(long, env = "READINESS_SECRET_NAME", default_value = DEFAULT_SECRET_NAME)]
    pub secret_name: String,

    /// Issuer to request the certificate from
    #[arg(long, env = "READINESS_ISSUER_NAME", default_value = DEFAULT_ISSUER_NAME)]
    pub issuer_name: String,

    /// Issuer kind (Issuer or ClusterIssuer)
    #[arg(long, env = "READINESS_ISSUER_KIND", default_value = DEFAULT_ISSUER_KIND)]
    pub issuer_kind: String,

    /// Issuer API group
    #[arg(long, env = "READINESS_ISSUER_GROUP", default_value = CERT_MANAGER_GROUP)]
    pub issuer_group: String,

    /// Common name of the certificate
    #[arg(long, env = "READINESS_COMMON_NAME", default_value = DEFAULT_COMMON_NAME)]
    pub common_name: String,

    /// DNS name to include (repeatable; defaults to the common name)
    #[arg(long = "dns-name")]
    pub dns_names: Vec<String>,

    #[command(flatten)]
    pub policy: PolicyArgs,

    #[command(flatten)]
    pub connection: ConnectionArgs,
}

impl IssueArgs {
    /// The certificate this invocation asks for
    pub fn to_request(&self) -> CertificateRequest {
        CertificateRequest {
            name: self.target.name.clone(),
            namespace: self.target.namespace.clone(),
            secret_name: self.secret_name.clone(),
            issuer_ref: IssuerRef {
                name: self.issuer_name.clone(),
                kind: Some(self.issuer_kind.clone()),
                group: Some(self.issuer_group.clone()),
            },
            common_name: self.common_name.clone(),
            dns_names: self.dns_names.clone(),
        }
    }
}

/// Run the issue command
pub async fn run(args: IssueArgs, cancel: CancellationToken) -> Result<()> {
    let verifier = args.policy.to_verifier()?;
    let request = args.to_request();
    let client = args.connection.connect().await?;
    let lifecycle = CertificateLifecycle::new(client);

    info!(
        resource = %request.handle(),
        issuer = %request.issuer_ref.name,
        "Issuing certificate"
    );
    let report = run_with_cleanup(&lifecycle, &request, &verifier, &cancel).await?;

    if let CleanupStatus::Failed(e) = &report.cleanup {
        warn!(resource = %report.handle, error = %e, "Certificate was left behind");
    }
    if report.outcome.is_ready() {
        info!(resource = %report.handle, outcome = %report.outcome, "Certificate is ready");
    }
    Ok(report.into_result()?)
}
