//! CLI commands

use std::time::Duration;

use clap::Args;
use kube::Client;
use tracing::info;

use readiness_common::backoff::{DEFAULT_BACKOFF_MULTIPLIER, DEFAULT_MAX_ATTEMPTS};
use readiness_common::{ReadinessVerifier, RetryPolicy, CONDITION_READY};
use readiness_kube::certificate::{DEFAULT_CERTIFICATE_NAME, DEFAULT_NAMESPACE};
use readiness_kube::OsConnectionEnv;

use crate::Result;

pub mod issue;
pub mod wait;

/// Which certificate to act on
#[derive(Args, Debug, Clone)]
pub struct TargetArgs {
    /// Certificate name
    #[arg(long, env = "READINESS_NAME", default_value = DEFAULT_CERTIFICATE_NAME)]
    pub name: String,

    /// Namespace of the certificate
    #[arg(short = 'n', long, env = "READINESS_NAMESPACE", default_value = DEFAULT_NAMESPACE)]
    pub namespace: String,
}

/// How to reach the API server
#[derive(Args, Debug, Clone, Default)]
pub struct ConnectionArgs {
    /// Path to kubeconfig (overrides KUBECONFIG_PATH; ignored when RUNNING_IN_CLUSTER=true)
    #[arg(short = 'k', long)]
    pub kubeconfig: Option<String>,
}

impl ConnectionArgs {
    /// Resolve credentials and build a client
    pub async fn connect(&self) -> Result<Client> {
        Ok(readiness_kube::connect(&OsConnectionEnv, self.kubeconfig.as_deref()).await?)
    }
}

/// Retry schedule and readiness condition
#[derive(Args, Debug, Clone)]
pub struct PolicyArgs {
    /// Condition type that must report True
    #[arg(long, env = "READINESS_CONDITION", default_value = CONDITION_READY)]
    pub condition: String,

    /// Maximum number of readiness checks
    #[arg(long, env = "READINESS_MAX_ATTEMPTS", default_value_t = DEFAULT_MAX_ATTEMPTS)]
    pub max_attempts: u32,

    /// Wait before the second check (e.g. 500ms, 30s, 2m, 1h)
    #[arg(long, env = "READINESS_INITIAL_WAIT", default_value = "30s", value_parser = parse_duration)]
    pub initial_wait: Duration,

    /// Factor applied to the wait after each failed check
    #[arg(long, env = "READINESS_MULTIPLIER", default_value_t = DEFAULT_BACKOFF_MULTIPLIER)]
    pub multiplier: f64,

    /// Upper bound on any single wait
    #[arg(long, env = "READINESS_MAX_WAIT", value_parser = parse_duration)]
    pub max_wait: Option<Duration>,

    /// Randomize sleeps by 0.5x to 1.5x of the scheduled wait
    #[arg(long, env = "READINESS_JITTER")]
    pub jitter: bool,
}

impl PolicyArgs {
    /// Build a validated retry policy
    pub fn to_policy(&self) -> Result<RetryPolicy> {
        let mut policy = RetryPolicy::new(self.max_attempts, self.initial_wait, self.multiplier)?
            .with_jitter(self.jitter);
        if let Some(max_wait) = self.max_wait {
            policy = policy.with_max_wait(max_wait)?;
        }
        Ok(policy)
    }

    /// Build the verifier for this run
    pub fn to_verifier(&self) -> Result<ReadinessVerifier> {
        let policy = self.to_policy()?;
        info!(
            condition = %self.condition,
            max_attempts = policy.max_attempts(),
            initial_wait_ms = policy.initial_wait().as_millis() as u64,
            multiplier = policy.backoff_multiplier(),
            worst_case_wait_secs = policy.worst_case_total_wait().as_secs(),
            "Readiness policy"
        );
        Ok(ReadinessVerifier::new(policy, self.condition.clone()))
    }
}

/// Parse a human-friendly duration.
///
/// Supports `Nms`, `Ns`, `Nm` and `Nh`; a bare number is seconds.
/// Examples: "500ms", "30s", "2m", "1h", "45".
pub fn parse_duration(s: &str) -> std::result::Result<Duration, String> {
    let s = s.trim();
    let invalid = || format!("invalid duration '{}', expected e.g. 500ms, 30s, 2m, 1h", s);

    let (digits, unit_ms) = if let Some(ms) = s.strip_suffix("ms") {
        (ms, 1)
    } else if let Some(secs) = s.strip_suffix('s') {
        (secs, 1_000)
    } else if let Some(minutes) = s.strip_suffix('m') {
        (minutes, 60_000)
    } else if let Some(hours) = s.strip_suffix('h') {
        (hours, 3_600_000)
    } else {
        (s, 1_000)
    };

    let n: u64 = digits.trim().parse().map_err(|_| invalid())?;
    n.checked_mul(unit_ms)
        .map(Duration::from_millis)
        .ok_or_else(invalid)
}
