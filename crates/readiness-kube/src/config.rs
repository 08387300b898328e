//! Connection configuration
//!
//! Provides trait-based access to the environment that selects how to reach
//! the API server, enabling dependency injection and mocking for tests.
//!
//! Resolution:
//! 1. `RUNNING_IN_CLUSTER=true` selects the in-cluster service account
//! 2. otherwise `KUBECONFIG_PATH`, when set and non-empty
//! 3. otherwise `~/.kube/config`

use std::path::PathBuf;

use readiness_common::{Error, Result};

/// Environment flag selecting in-cluster credentials
pub const RUNNING_IN_CLUSTER_ENV: &str = "RUNNING_IN_CLUSTER";
/// Environment variable with an explicit kubeconfig path
pub const KUBECONFIG_PATH_ENV: &str = "KUBECONFIG_PATH";

const KUBE_DIR_NAME: &str = ".kube";
const KUBECONFIG_FILE_NAME: &str = "config";

/// Trait for reading connection settings from the environment
///
/// This abstracts environment variables and the home directory, enabling
/// proper unit testing without manipulating global state.
#[cfg_attr(test, mockall::automock)]
pub trait ConnectionEnv: Send + Sync {
    /// Value of `RUNNING_IN_CLUSTER`
    fn running_in_cluster(&self) -> Option<String>;

    /// Value of `KUBECONFIG_PATH`
    fn kubeconfig_path(&self) -> Option<String>;

    /// The current user's home directory
    fn home_dir(&self) -> Option<PathBuf>;
}

/// Default implementation that reads from the process environment
#[derive(Clone, Debug, Default)]
pub struct OsConnectionEnv;

impl ConnectionEnv for OsConnectionEnv {
    fn running_in_cluster(&self) -> Option<String> {
        std::env::var(RUNNING_IN_CLUSTER_ENV).ok()
    }

    fn kubeconfig_path(&self) -> Option<String> {
        std::env::var(KUBECONFIG_PATH_ENV).ok()
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }
}

/// Where API server credentials come from
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ConnectionSource {
    /// Service account token and CA mounted into the pod
    InCluster,
    /// A kubeconfig file on disk
    Kubeconfig(PathBuf),
}

impl std::fmt::Display for ConnectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InCluster => write!(f, "in-cluster"),
            Self::Kubeconfig(path) => write!(f, "kubeconfig {}", path.display()),
        }
    }
}

/// Decide which credentials to use
///
/// An explicit override (e.g., a `--kubeconfig` flag) takes precedence over
/// everything except the in-cluster flag.
pub fn resolve_connection(
    env: &dyn ConnectionEnv,
    explicit_kubeconfig: Option<&str>,
) -> Result<ConnectionSource> {
    if env.running_in_cluster().as_deref() == Some("true") {
        return Ok(ConnectionSource::InCluster);
    }

    if let Some(path) = explicit_kubeconfig.filter(|p| !p.is_empty()) {
        return Ok(ConnectionSource::Kubeconfig(PathBuf::from(path)));
    }

    if let Some(path) = env.kubeconfig_path().filter(|p| !p.is_empty()) {
        return Ok(ConnectionSource::Kubeconfig(PathBuf::from(path)));
    }

    let home = env.home_dir().ok_or_else(|| {
        Error::configuration(format!(
            "could not determine home directory; set {} or {}=true",
            KUBECONFIG_PATH_ENV, RUNNING_IN_CLUSTER_ENV
        ))
    })?;
    Ok(ConnectionSource::Kubeconfig(
        home.join(KUBE_DIR_NAME).join(KUBECONFIG_FILE_NAME),
    ))
}
