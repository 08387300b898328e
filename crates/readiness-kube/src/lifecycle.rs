//! cert-manager Certificate lifecycle
//!
//! Implements [`ResourceLifecycle`] over the Kubernetes API. Each call is a
//! single request; retrying is left to the verifier's schedule.

use async_trait::async_trait;
use kube::api::{DeleteParams, PostParams};
use kube::{Api, Client};
use tracing::{debug, info};

use readiness_common::{Error, ResourceHandle, ResourceLifecycle, ResourceState, Result};

use crate::certificate::{Certificate, CertificateRequest};

/// Returns true if the error is a 404 from the API server
pub fn is_not_found(err: &kube::Error) -> bool {
    matches!(err, kube::Error::Api(ae) if ae.code == 404)
}

/// Certificate lifecycle backed by a kube client
#[derive(Clone)]
pub struct CertificateLifecycle {
    client: Client,
}

impl CertificateLifecycle {
    /// Create a lifecycle using the given client
    pub fn new(client: Client) -> Self {
        Self { client }
    }

    fn api(&self, namespace: Option<&str>) -> Api<Certificate> {
        match namespace {
            Some(ns) => Api::namespaced(self.client.clone(), ns),
            None => Api::default_namespaced(self.client.clone()),
        }
    }
}

#[async_trait]
impl ResourceLifecycle for CertificateLifecycle {
    type Spec = CertificateRequest;

    async fn create(&self, spec: &CertificateRequest) -> Result<ResourceHandle> {
        let cert = spec.to_certificate();
        let requested = spec.handle();

        let created = self
            .api(Some(&spec.namespace))
            .create(&PostParams::default(), &cert)
            .await
            .map_err(|e| Error::creation_for(requested.to_string(), e.to_string()))?;

        let mut handle = created.handle();
        if handle.name.is_empty() {
            handle.name = requested.name;
        }
        if handle.namespace.is_none() {
            handle.namespace = requested.namespace;
        }
        info!(resource = %handle, issuer = %spec.issuer_ref.name, "Certificate created");
        Ok(handle)
    }

    async fn fetch(&self, handle: &ResourceHandle) -> Result<ResourceState> {
        let cert = self
            .api(handle.namespace.as_deref())
            .get(&handle.name)
            .await
            .map_err(|e| Error::fetch_for(handle.to_string(), e.to_string()))?;
        Ok(cert.to_state())
    }

    async fn delete(&self, handle: &ResourceHandle) -> Result<()> {
        let result = self
            .api(handle.namespace.as_deref())
            .delete(&handle.name, &DeleteParams::default())
            .await;
        delete_result(handle, result)
    }
}

/// Map a DELETE response; a certificate that is already gone counts as deleted
fn delete_result<T>(
    handle: &ResourceHandle,
    result: std::result::Result<T, kube::Error>,
) -> Result<()> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if is_not_found(&e) => {
            debug!(resource = %handle, "Certificate already deleted");
            Ok(())
        }
        Err(e) => Err(Error::cleanup_for(handle.to_string(), e.to_string())),
    }
}
