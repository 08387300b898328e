//! Integration tests for certificate issuance
//!
//! These tests tell the story of a platform operator checking that their
//! cert-manager installation actually issues certificates, and what the
//! check reports when it doesn't.

use std::time::Duration;

use kube::Api;
use tokio_util::sync::CancellationToken;

use readiness_common::{
    run_with_cleanup, verify_existing, CleanupStatus, ResourceHandle, VerificationOutcome,
};
use readiness_kube::certificate::{Certificate, CERTIFICATE_KIND};
use readiness_kube::lifecycle::is_not_found;
use readiness_kube::CertificateLifecycle;

use super::helpers::{
    certificate_request, ensure_selfsigned_issuer, fast_verifier, test_client, SELFSIGNED_ISSUER,
};

/// Assert that the certificate no longer exists
async fn assert_deleted(client: &kube::Client, handle: &ResourceHandle) {
    let namespace = handle.namespace.as_deref().unwrap_or("default");
    let api: Api<Certificate> = Api::namespaced(client.clone(), namespace);
    match api.get(&handle.name).await {
        Err(e) if is_not_found(&e) => {}
        Ok(cert) => assert!(
            cert.metadata.deletion_timestamp.is_some(),
            "{} should have been deleted",
            handle
        ),
        Err(e) => panic!("unexpected error checking {}: {}", handle, e),
    }
}

// =============================================================================
// Happy Path
// =============================================================================

/// Story: Operator verifies that a working issuer produces a ready certificate
///
/// With a self-signed issuer, cert-manager signs the certificate within a few
/// seconds. The check should report Ready well before exhausting its
/// attempts, then remove the certificate it created.
#[tokio::test]
#[ignore = "requires kind cluster with cert-manager - run with: cargo test --test kind -- --ignored"]
async fn story_selfsigned_certificate_becomes_ready() {
    let client = test_client().await;
    ensure_selfsigned_issuer(&client).await;

    let lifecycle = CertificateLifecycle::new(client.clone());
    let request = certificate_request("readiness-ready", SELFSIGNED_ISSUER);

    let report = run_with_cleanup(
        &lifecycle,
        &request,
        &fast_verifier(8),
        &CancellationToken::new(),
    )
    .await
    .expect("certificate should be created");

    assert!(report.outcome.is_ready(), "outcome was {}", report.outcome);
    assert_eq!(report.cleanup, CleanupStatus::Deleted);
    assert_deleted(&client, &report.handle).await;
}

// =============================================================================
// Unhappy Paths
// =============================================================================

/// Story: Operator points the check at an issuer that doesn't exist
///
/// cert-manager accepts the Certificate but can never sign it. The check must
/// give up after its attempts instead of hanging, and still clean up.
#[tokio::test]
#[ignore = "requires kind cluster with cert-manager - run with: cargo test --test kind -- --ignored"]
async fn story_missing_issuer_times_out_and_cleans_up() {
    let client = test_client().await;
    let lifecycle = CertificateLifecycle::new(client.clone());
    let request = certificate_request("readiness-no-issuer", "readiness-missing-issuer");

    let report = run_with_cleanup(
        &lifecycle,
        &request,
        &fast_verifier(2),
        &CancellationToken::new(),
    )
    .await
    .expect("certificate should be created");

    assert_eq!(report.outcome, VerificationOutcome::TimedOut { attempts: 2 });
    assert_eq!(report.cleanup, CleanupStatus::Deleted);
    assert_deleted(&client, &report.handle).await;
}

/// Story: Operator waits on a certificate that was never created
///
/// The first fetch fails with NotFound. That is reported immediately as a
/// fetch failure; the schedule is not consumed.
#[tokio::test]
#[ignore = "requires kind cluster with cert-manager - run with: cargo test --test kind -- --ignored"]
async fn story_waiting_on_missing_certificate_fails_fetch() {
    let client = test_client().await;
    let lifecycle = CertificateLifecycle::new(client);
    let handle = ResourceHandle::namespaced(CERTIFICATE_KIND, "default", "readiness-never-created");

    let outcome = verify_existing(
        &lifecycle,
        &handle,
        &fast_verifier(5),
        &CancellationToken::new(),
    )
    .await;

    match outcome {
        VerificationOutcome::FetchFailed { attempt, error } => {
            assert_eq!(attempt, 1);
            assert_eq!(error.exit_code(), 4);
        }
        other => panic!("expected FetchFailed, got {}", other),
    }
}

/// Story: Operator interrupts a long check
///
/// Cancelling mid-wait ends verification promptly, and the certificate the
/// run created is still deleted.
#[tokio::test]
#[ignore = "requires kind cluster with cert-manager - run with: cargo test --test kind -- --ignored"]
async fn story_cancelled_run_still_cleans_up() {
    let client = test_client().await;
    let lifecycle = CertificateLifecycle::new(client.clone());
    let request = certificate_request("readiness-cancelled", "readiness-missing-issuer");

    let cancel = CancellationToken::new();
    tokio::spawn({
        let cancel = cancel.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(1500)).await;
            cancel.cancel();
        }
    });

    let report = run_with_cleanup(&lifecycle, &request, &fast_verifier(10), &cancel)
        .await
        .expect("certificate should be created");

    assert!(
        matches!(report.outcome, VerificationOutcome::Cancelled { .. }),
        "outcome was {}",
        report.outcome
    );
    assert_eq!(report.cleanup, CleanupStatus::Deleted);
    assert_deleted(&client, &report.handle).await;
}
