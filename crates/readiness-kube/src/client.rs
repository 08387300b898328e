//! Kubernetes client construction
//!
//! Builds a `kube::Client` from a resolved [`ConnectionSource`] with explicit
//! connect and read timeouts. The client is created once and passed to each
//! run; nothing here is global.

use std::path::Path;
use std::time::Duration;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use tracing::info;

use readiness_common::{Error, Result};

use crate::config::{resolve_connection, ConnectionEnv, ConnectionSource};

/// Default connection timeout for kube clients
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Default read timeout for kube clients
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Resolve credentials from the environment and build a client
pub async fn connect(
    env: &dyn ConnectionEnv,
    explicit_kubeconfig: Option<&str>,
) -> Result<Client> {
    let source = resolve_connection(env, explicit_kubeconfig)?;
    create_client(&source).await
}

/// Create a kube client with default timeouts
pub async fn create_client(source: &ConnectionSource) -> Result<Client> {
    create_client_with_timeout(source, DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT).await
}

/// Create a kube client with custom timeouts
pub async fn create_client_with_timeout(
    source: &ConnectionSource,
    connect_timeout: Duration,
    read_timeout: Duration,
) -> Result<Client> {
    let mut config = match source {
        ConnectionSource::InCluster => {
            info!("Using config from in-cluster");
            Config::incluster().map_err(|e| {
                Error::configuration(format!("failed to load in-cluster config: {}", e))
            })?
        }
        ConnectionSource::Kubeconfig(path) => {
            info!(path = %path.display(), "Reading config from kubeconfig");
            load_kubeconfig(path).await?
        }
    };

    config.connect_timeout = Some(connect_timeout);
    config.read_timeout = Some(read_timeout);
    Client::try_from(config)
        .map_err(|e| Error::configuration(format!("failed to create client: {}", e)))
}

async fn load_kubeconfig(path: &Path) -> Result<Config> {
    let kubeconfig = Kubeconfig::read_from(path).map_err(|e| {
        Error::configuration(format!(
            "failed to read kubeconfig {}: {}",
            path.display(),
            e
        ))
    })?;
    Config::from_custom_kubeconfig(kubeconfig, &KubeConfigOptions::default())
        .await
        .map_err(|e| {
            Error::configuration(format!(
                "failed to load kubeconfig {}: {}",
                path.display(),
                e
            ))
        })
}
