//! cert-manager Certificate custom resource
//!
//! Only the fields needed to request a certificate and read its status
//! conditions are modeled. Unknown fields returned by the API server are
//! ignored on deserialization.

use chrono::{DateTime, Utc};
use kube::CustomResource;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use readiness_common::condition::{find_condition, HasConditionFields};
use readiness_common::{Condition, ConditionStatus, ResourceHandle, ResourceState, CONDITION_READY};

/// Kind name used in resource handles
pub const CERTIFICATE_KIND: &str = "Certificate";
/// API group of cert-manager issuers
pub const CERT_MANAGER_GROUP: &str = "cert-manager.io";

/// Default certificate name used by the issuance check
pub const DEFAULT_CERTIFICATE_NAME: &str = "test-certificate";
/// Default namespace
pub const DEFAULT_NAMESPACE: &str = "default";
/// Default secret the issued keypair is stored in
pub const DEFAULT_SECRET_NAME: &str = "test-secret";
/// Default issuer name
pub const DEFAULT_ISSUER_NAME: &str = "letsencrypt-prod";
/// Default issuer kind
pub const DEFAULT_ISSUER_KIND: &str = "ClusterIssuer";
/// Default common name
pub const DEFAULT_COMMON_NAME: &str = "example.com";

/// Reference to the Issuer or ClusterIssuer that signs the certificate
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IssuerRef {
    /// Issuer name
    pub name: String,
    /// Issuer kind (Issuer or ClusterIssuer)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    /// Issuer API group
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// Desired state of a cert-manager Certificate
#[derive(CustomResource, Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[kube(
    group = "cert-manager.io",
    version = "v1",
    kind = "Certificate",
    plural = "certificates",
    namespaced,
    status = "CertificateStatus"
)]
#[serde(rename_all = "camelCase")]
pub struct CertificateSpec {
    /// Secret that will hold the issued keypair
    pub secret_name: String,

    /// Issuer to request the certificate from
    pub issuer_ref: IssuerRef,

    /// Common name for the certificate subject
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub common_name: Option<String>,

    /// Subject alternative DNS names
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dns_names: Vec<String>,
}

/// Condition as reported by cert-manager
///
/// Kept as raw strings so that unexpected values never fail a fetch.
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateCondition {
    /// Condition type (Ready, Issuing)
    #[serde(rename = "type", default)]
    pub type_: String,
    /// Condition status (True, False, Unknown)
    #[serde(default)]
    pub status: String,
    /// Machine-readable reason
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    /// Human-readable message
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// RFC 3339 timestamp of the last transition
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_transition_time: Option<String>,
    /// Certificate generation this condition was computed for
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observed_generation: Option<i64>,
}

impl HasConditionFields for CertificateCondition {
    fn type_field(&self) -> &str {
        &self.type_
    }
    fn status_field(&self) -> &str {
        &self.status
    }
}

impl From<&CertificateCondition> for Condition {
    fn from(c: &CertificateCondition) -> Self {
        Condition {
            type_: c.type_.clone(),
            status: ConditionStatus::parse(&c.status),
            reason: c.reason.clone(),
            message: c.message.clone(),
            last_transition_time: c
                .last_transition_time
                .as_deref()
                .and_then(|t| DateTime::parse_from_rfc3339(t).ok())
                .map(|t| t.with_timezone(&Utc)),
        }
    }
}

/// Observed state of a cert-manager Certificate
#[derive(Clone, Debug, Default, Deserialize, Serialize, JsonSchema, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CertificateStatus {
    /// Status conditions
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub conditions: Vec<CertificateCondition>,
    /// Expiry of the current certificate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_after: Option<String>,
    /// When cert-manager will next renew
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub renewal_time: Option<String>,
    /// Issuance revision counter
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub revision: Option<i64>,
}

impl Certificate {
    /// Handle identifying this certificate
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle {
            kind: CERTIFICATE_KIND.to_string(),
            name: self.metadata.name.clone().unwrap_or_default(),
            namespace: self.metadata.namespace.clone(),
        }
    }

    /// Engine view of this certificate's status
    ///
    /// A certificate without status yet has no conditions.
    pub fn to_state(&self) -> ResourceState {
        let raw = self
            .status
            .as_ref()
            .map(|s| s.conditions.as_slice())
            .unwrap_or_default();

        ResourceState {
            conditions: raw.iter().map(Condition::from).collect(),
            observed_generation: find_condition(raw, CONDITION_READY)
                .and_then(|c| c.observed_generation),
        }
    }
}

/// Everything needed to request a certificate
#[derive(Clone, Debug, PartialEq)]
pub struct CertificateRequest {
    /// Certificate name
    pub name: String,
    /// Namespace to create it in
    pub namespace: String,
    /// Secret that will hold the issued keypair
    pub secret_name: String,
    /// Issuer to request from
    pub issuer_ref: IssuerRef,
    /// Common name
    pub common_name: String,
    /// DNS names; the common name is used when empty
    pub dns_names: Vec<String>,
}

impl Default for CertificateRequest {
    fn default() -> Self {
        Self {
            name: DEFAULT_CERTIFICATE_NAME.to_string(),
            namespace: DEFAULT_NAMESPACE.to_string(),
            secret_name: DEFAULT_SECRET_NAME.to_string(),
            issuer_ref: IssuerRef {
                name: DEFAULT_ISSUER_NAME.to_string(),
                kind: Some(DEFAULT_ISSUER_KIND.to_string()),
                group: Some(CERT_MANAGER_GROUP.to_string()),
            },
            common_name: DEFAULT_COMMON_NAME.to_string(),
            dns_names: Vec::new(),
        }
    }
}

impl CertificateRequest {
    /// Handle the created certificate will have
    pub fn handle(&self) -> ResourceHandle {
        ResourceHandle::namespaced(CERTIFICATE_KIND, &self.namespace, &self.name)
    }

    /// Build the Certificate object to submit
    pub fn to_certificate(&self) -> Certificate {
        let dns_names = if self.dns_names.is_empty() {
            vec![self.common_name.clone()]
        } else {
            self.dns_names.clone()
        };

        let mut cert = Certificate::new(
            &self.name,
            CertificateSpec {
                secret_name: self.secret_name.clone(),
                issuer_ref: self.issuer_ref.clone(),
                common_name: Some(self.common_name.clone()),
                dns_names,
            },
        );
        cert.metadata.namespace = Some(self.namespace.clone());
        cert
    }
}
