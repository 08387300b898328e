//! Shared fixtures for live-cluster tests

use std::time::Duration;

use kube::api::{Api, ApiResource, DynamicObject, GroupVersionKind, Patch, PatchParams};
use kube::Client;

use readiness_common::{ReadinessVerifier, RetryPolicy};
use readiness_kube::certificate::{CertificateRequest, IssuerRef, CERT_MANAGER_GROUP};
use readiness_kube::OsConnectionEnv;

/// Self-signed ClusterIssuer created for the tests
pub const SELFSIGNED_ISSUER: &str = "readiness-selfsigned";

const FIELD_MANAGER: &str = "readiness-kind-tests";

/// Connect the same way the CLI does
pub async fn test_client() -> Client {
    readiness_kube::connect(&OsConnectionEnv, None)
        .await
        .expect("failed to connect to test cluster")
}

/// Apply a self-signed ClusterIssuer so certificates can be issued offline
pub async fn ensure_selfsigned_issuer(client: &Client) {
    let ar = ApiResource::from_gvk(&GroupVersionKind::gvk(
        CERT_MANAGER_GROUP,
        "v1",
        "ClusterIssuer",
    ));
    let api: Api<DynamicObject> = Api::all_with(client.clone(), &ar);
    let issuer = DynamicObject::new(SELFSIGNED_ISSUER, &ar)
        .data(serde_json::json!({ "spec": { "selfSigned": {} } }));

    api.patch(
        SELFSIGNED_ISSUER,
        &PatchParams::apply(FIELD_MANAGER).force(),
        &Patch::Apply(&issuer),
    )
    .await
    .expect("failed to apply self-signed ClusterIssuer");
}

/// A certificate request against the given issuer
pub fn certificate_request(name: &str, issuer: &str) -> CertificateRequest {
    CertificateRequest {
        name: name.to_string(),
        secret_name: format!("{}-tls", name),
        issuer_ref: IssuerRef {
            name: issuer.to_string(),
            kind: Some("ClusterIssuer".to_string()),
            group: Some(CERT_MANAGER_GROUP.to_string()),
        },
        common_name: format!("{}.readiness.test", name),
        ..Default::default()
    }
}

/// Short schedule so the suite finishes in seconds
pub fn fast_verifier(max_attempts: u32) -> ReadinessVerifier {
    let policy = RetryPolicy::new(max_attempts, Duration::from_secs(1), 2.0)
        .and_then(|p| p.with_max_wait(Duration::from_secs(5)))
        .expect("valid policy");
    ReadinessVerifier::ready(policy)
}
