//! Kubernetes backend for readiness verification
//!
//! Issues cert-manager `Certificate` resources and reports their conditions
//! to the verification engine in `readiness-common`.
//!
//! - [`config`]: choose in-cluster or kubeconfig credentials
//! - [`client`]: build a kube client with timeouts
//! - [`certificate`]: the Certificate CRD and request builder
//! - [`lifecycle`]: create/fetch/delete over the API server

#![warn(missing_docs)]

pub mod certificate;
pub mod client;
pub mod config;
pub mod lifecycle;

pub use certificate::{Certificate, CertificateRequest, CertificateSpec, IssuerRef};
pub use client::{connect, create_client};
pub use config::{resolve_connection, ConnectionEnv, ConnectionSource, OsConnectionEnv};
pub use lifecycle::CertificateLifecycle;
