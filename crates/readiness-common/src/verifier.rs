//! Readiness verifier
//!
//! Drives repeated fetch + evaluate + wait until a resource is ready, the
//! retry policy is exhausted, a fetch fails, or the run is cancelled.
//!
//! ```text
//!            ┌──────────── not ready, attempts remain (wait) ───┐
//!            ▼                                                  │
//!        Pending ── fetch ok ── evaluate ───────────────────────┘
//!            │          │           │
//!            │          │           ├── ready ──────────▶ Ready
//!            │          │           └── no attempts left ▶ TimedOut
//!            │          └── fetch error ────────────────▶ FetchFailed
//!            └── cancelled (before fetch / during wait) ▶ Cancelled
//! ```
//!
//! Fetch failures are never retried. An unreachable backend is a different
//! problem from a resource that is not ready yet, and only the latter is
//! governed by the retry policy.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::backoff::{BackoffScheduler, NextStep, RetryPolicy};
use crate::condition::{find_condition, ConditionStatus, CONDITION_READY};
use crate::lifecycle::{ResourceHandle, ResourceLifecycle};
use crate::{Error, Result};

/// Terminal result of one verification run
#[derive(Clone, Debug, PartialEq)]
pub enum VerificationOutcome {
    /// The target condition reported True
    Ready {
        /// Evaluations performed, including the successful one
        attempts: u32,
    },
    /// Every permitted attempt was used without readiness
    TimedOut {
        /// Evaluations performed
        attempts: u32,
    },
    /// A fetch failed; the run stopped immediately
    FetchFailed {
        /// Attempt on which the fetch failed
        attempt: u32,
        /// The underlying fetch error
        error: Error,
    },
    /// The run was cancelled before reaching a verdict
    Cancelled {
        /// Evaluations completed before cancellation
        attempts: u32,
    },
}

impl VerificationOutcome {
    /// Whether the resource became ready
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready { .. })
    }

    /// Number of evaluations completed, or the failing attempt for `FetchFailed`
    ///
    /// A fetch interrupted by cancellation is not counted.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Ready { attempts } | Self::TimedOut { attempts } | Self::Cancelled { attempts } => {
                *attempts
            }
            Self::FetchFailed { attempt, .. } => *attempt,
        }
    }

    /// Convert into a typed result for the caller
    pub fn into_result(self, handle: &ResourceHandle) -> Result<()> {
        match self {
            Self::Ready { .. } => Ok(()),
            Self::TimedOut { attempts } => Err(Error::ReadinessTimeout {
                resource: handle.to_string(),
                attempts,
            }),
            Self::FetchFailed { error, .. } => Err(error),
            Self::Cancelled { attempts } => Err(Error::Cancelled {
                resource: handle.to_string(),
                attempts,
            }),
        }
    }
}

impl std::fmt::Display for VerificationOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready { attempts } => write!(f, "Ready after {} attempt(s)", attempts),
            Self::TimedOut { attempts } => write!(f, "TimedOut after {} attempt(s)", attempts),
            Self::FetchFailed { attempt, error } => {
                write!(f, "FetchFailed on attempt {}: {}", attempt, error)
            }
            Self::Cancelled { attempts } => write!(f, "Cancelled after {} attempt(s)", attempts),
        }
    }
}

/// Progress report emitted after each evaluation
#[derive(Clone, Debug, PartialEq)]
pub struct AttemptEvent<'a> {
    /// Resource being verified
    pub resource: &'a ResourceHandle,
    /// Attempt just evaluated (1-based)
    pub attempt: u32,
    /// Attempts permitted by the policy
    pub max_attempts: u32,
    /// Status of the target condition, `None` when absent
    pub status: Option<ConditionStatus>,
    /// Whether the resource is ready
    pub ready: bool,
    /// Scheduled wait before the next attempt, `None` when this was the last
    pub next_wait: Option<Duration>,
}

/// Receives advisory progress notifications
///
/// Observers cannot influence the run: they get a borrowed event and
/// return nothing.
pub trait ProgressObserver: Send + Sync {
    /// Called after every evaluation
    fn on_attempt(&self, event: &AttemptEvent<'_>);
}

/// Observer that reports progress through `tracing`
#[derive(Clone, Debug, Default)]
pub struct TracingObserver;

impl ProgressObserver for TracingObserver {
    fn on_attempt(&self, event: &AttemptEvent<'_>) {
        let status = event.status.map(|s| s.as_str()).unwrap_or("absent");
        match event.next_wait {
            Some(wait) => info!(
                resource = %event.resource,
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                status,
                wait_ms = wait.as_millis() as u64,
                "Resource not ready, waiting before next attempt"
            ),
            None => debug!(
                resource = %event.resource,
                attempt = event.attempt,
                max_attempts = event.max_attempts,
                status,
                ready = event.ready,
                "Final evaluation"
            ),
        }
    }
}

/// Verifies that a resource reaches a target condition
#[derive(Clone)]
pub struct ReadinessVerifier {
    policy: RetryPolicy,
    condition_type: String,
    observer: Arc<dyn ProgressObserver>,
}

impl std::fmt::Debug for ReadinessVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadinessVerifier")
            .field("policy", &self.policy)
            .field("condition_type", &self.condition_type)
            .finish_non_exhaustive()
    }
}

impl ReadinessVerifier {
    /// Verifier for an arbitrary condition type
    pub fn new(policy: RetryPolicy, condition_type: impl Into<String>) -> Self {
        Self {
            policy,
            condition_type: condition_type.into(),
            observer: Arc::new(TracingObserver),
        }
    }

    /// Verifier for the standard "Ready" condition
    pub fn ready(policy: RetryPolicy) -> Self {
        Self::new(policy, CONDITION_READY)
    }

    /// Replace the progress observer
    pub fn with_observer(mut self, observer: Arc<dyn ProgressObserver>) -> Self {
        self.observer = observer;
        self
    }

    /// The retry policy in use
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// The condition type that signals readiness
    pub fn condition_type(&self) -> &str {
        &self.condition_type
    }

    /// Run verification against `handle` until a terminal outcome
    ///
    /// Cancellation is honored before every fetch, while a fetch is in
    /// flight, and during every wait. Once cancelled no further fetch is
    /// issued.
    pub async fn verify<L>(
        &self,
        lifecycle: &L,
        handle: &ResourceHandle,
        cancel: &CancellationToken,
    ) -> VerificationOutcome
    where
        L: ResourceLifecycle + ?Sized,
    {
        let mut scheduler = BackoffScheduler::new(&self.policy);

        loop {
            let attempt = scheduler.attempt();
            let completed = attempt - 1;

            if cancel.is_cancelled() {
                return self.cancelled(handle, completed);
            }

            let fetched = tokio::select! {
                biased;
                _ = cancel.cancelled() => return self.cancelled(handle, completed),
                result = lifecycle.fetch(handle) => result,
            };

            let state = match fetched {
                Ok(state) => state,
                Err(e) => {
                    let error = stamp_fetch_error(e, handle, attempt);
                    warn!(
                        resource = %handle,
                        attempt,
                        error = %error,
                        "Fetch failed, aborting verification"
                    );
                    return VerificationOutcome::FetchFailed { attempt, error };
                }
            };

            let status = find_condition(&state.conditions, &self.condition_type).map(|c| c.status);
            let ready = status == Some(ConditionStatus::True);

            if ready {
                self.notify(handle, attempt, status, true, None);
                info!(
                    resource = %handle,
                    attempt,
                    condition = %self.condition_type,
                    "Resource is ready"
                );
                return VerificationOutcome::Ready { attempts: attempt };
            }

            match scheduler.advance() {
                NextStep::Exhausted => {
                    self.notify(handle, attempt, status, false, None);
                    warn!(
                        resource = %handle,
                        attempts = attempt,
                        condition = %self.condition_type,
                        "Resource not ready after final attempt"
                    );
                    return VerificationOutcome::TimedOut { attempts: attempt };
                }
                NextStep::Retry { wait, .. } => {
                    self.notify(handle, attempt, status, false, Some(wait));
                    let sleep_for = self.policy.sleep_duration(wait);
                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return self.cancelled(handle, attempt),
                        _ = tokio::time::sleep(sleep_for) => {}
                    }
                }
            }
        }
    }

    fn notify(
        &self,
        resource: &ResourceHandle,
        attempt: u32,
        status: Option<ConditionStatus>,
        ready: bool,
        next_wait: Option<Duration>,
    ) {
        let event = AttemptEvent {
            resource,
            attempt,
            max_attempts: self.policy.max_attempts(),
            status,
            ready,
            next_wait,
        };
        // Observers are advisory; a panicking one must not abort the run
        if catch_unwind(AssertUnwindSafe(|| self.observer.on_attempt(&event))).is_err() {
            warn!(resource = %resource, attempt, "Progress observer panicked, ignoring");
        }
    }

    fn cancelled(&self, handle: &ResourceHandle, attempts: u32) -> VerificationOutcome {
        info!(resource = %handle, attempts, "Verification cancelled");
        VerificationOutcome::Cancelled { attempts }
    }
}

/// Normalize any backend error into a fetch error carrying the attempt
fn stamp_fetch_error(error: Error, handle: &ResourceHandle, attempt: u32) -> Error {
    match error {
        Error::Fetch {
            resource, message, ..
        } => Error::Fetch {
            resource,
            attempt,
            message,
        },
        other => Error::Fetch {
            resource: handle.to_string(),
            attempt,
            message: other.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use tokio::time::Instant;

    use super::*;
    use crate::condition::Condition;
    use crate::lifecycle::{MockResourceLifecycle, ResourceState};

    fn handle() -> ResourceHandle {
        ResourceHandle::namespaced("Certificate", "default", "test-certificate")
    }

    fn default_policy() -> RetryPolicy {
        RetryPolicy::new(3, Duration::from_secs(30), 2.0).expect("valid policy")
    }

    fn state(status: ConditionStatus) -> ResourceState {
        ResourceState::with_conditions(vec![
            Condition::new("Issuing", ConditionStatus::True),
            Condition::new(CONDITION_READY, status),
        ])
    }

    #[derive(Default)]
    struct Recorder {
        events: Mutex<Vec<(u32, Option<ConditionStatus>, Option<Duration>)>>,
    }

    impl ProgressObserver for Recorder {
        fn on_attempt(&self, event: &AttemptEvent<'_>) {
            self.events
                .lock()
                .expect("recorder lock")
                .push((event.attempt, event.status, event.next_wait));
        }
    }

    /// Story: a certificate is issued between the first and second check
    #[tokio::test(start_paused = true)]
    async fn story_ready_on_second_attempt() {
        let mut mock = MockResourceLifecycle::new();
        let mut calls = 0;
        mock.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(state(ConditionStatus::False))
            } else {
                Ok(state(ConditionStatus::True))
            }
        });

        let recorder = Arc::new(Recorder::default());
        let verifier = ReadinessVerifier::ready(default_policy()).with_observer(recorder.clone());

        let start = Instant::now();
        let outcome = verifier
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, VerificationOutcome::Ready { attempts: 2 });
        assert_eq!(start.elapsed(), Duration::from_secs(30));
        assert_eq!(
            *recorder.events.lock().expect("recorder lock"),
            vec![
                (1, Some(ConditionStatus::False), Some(Duration::from_secs(30))),
                (2, Some(ConditionStatus::True), None),
            ]
        );
    }

    /// Story: a certificate that never issues exhausts the policy
    ///
    /// Attempts happen at t=0s, 30s and 90s; no wait follows the last one.
    #[tokio::test(start_paused = true)]
    async fn story_never_ready_exhausts_attempts() {
        let fetch_times = Arc::new(Mutex::new(Vec::new()));
        let start = Instant::now();

        let mut mock = MockResourceLifecycle::new();
        let times = fetch_times.clone();
        mock.expect_fetch().times(3).returning(move |_| {
            times
                .lock()
                .expect("times lock")
                .push(start.elapsed().as_secs());
            Ok(state(ConditionStatus::False))
        });

        let verifier = ReadinessVerifier::ready(default_policy());
        let outcome = verifier
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, VerificationOutcome::TimedOut { attempts: 3 });
        assert_eq!(*fetch_times.lock().expect("times lock"), vec![0, 30, 90]);
        assert_eq!(start.elapsed(), Duration::from_secs(90));
        assert_eq!(
            start.elapsed(),
            verifier.policy().worst_case_total_wait()
        );
    }

    /// Story: the backend is unreachable on the very first check
    #[tokio::test(start_paused = true)]
    async fn story_fetch_failure_aborts_without_waiting() {
        let mut mock = MockResourceLifecycle::new();
        mock.expect_fetch()
            .times(1)
            .returning(|h| Err(Error::fetch_for(h.to_string(), "connection refused")));

        let start = Instant::now();
        let outcome = ReadinessVerifier::ready(default_policy())
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        assert_eq!(start.elapsed(), Duration::ZERO);
        match outcome {
            VerificationOutcome::FetchFailed { attempt, error } => {
                assert_eq!(attempt, 1);
                assert!(matches!(error, Error::Fetch { attempt: 1, .. }));
                assert!(error.to_string().contains("connection refused"));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_failure_after_pending_keeps_attempt_number() {
        let mut mock = MockResourceLifecycle::new();
        let mut calls = 0;
        mock.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            if calls == 1 {
                Ok(state(ConditionStatus::Unknown))
            } else {
                Err(Error::configuration("credentials expired"))
            }
        });

        let outcome = ReadinessVerifier::ready(default_policy())
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        match outcome {
            VerificationOutcome::FetchFailed { attempt, error } => {
                assert_eq!(attempt, 2);
                assert_eq!(error.resource(), Some("Certificate default/test-certificate"));
                assert!(error.to_string().contains("credentials expired"));
            }
            other => panic!("expected FetchFailed, got {other:?}"),
        }
    }

    /// Story: an operator hits Ctrl-C while the verifier is waiting
    #[tokio::test(start_paused = true)]
    async fn story_cancel_during_wait_stops_promptly() {
        let mut mock = MockResourceLifecycle::new();
        mock.expect_fetch()
            .times(1)
            .returning(|_| Ok(state(ConditionStatus::False)));

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(10)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let outcome = ReadinessVerifier::ready(default_policy())
            .verify(&mock, &handle(), &cancel)
            .await;

        assert_eq!(outcome, VerificationOutcome::Cancelled { attempts: 1 });
        assert_eq!(start.elapsed(), Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_before_start_never_fetches() {
        let mut mock = MockResourceLifecycle::new();
        mock.expect_fetch().never();

        let cancel = CancellationToken::new();
        cancel.cancel();

        let outcome = ReadinessVerifier::ready(default_policy())
            .verify(&mock, &handle(), &cancel)
            .await;

        assert_eq!(outcome, VerificationOutcome::Cancelled { attempts: 0 });
        assert_eq!(outcome.attempts(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_missing_target_condition_is_pending() {
        let mut mock = MockResourceLifecycle::new();
        mock.expect_fetch()
            .times(2)
            .returning(|_| Ok(ResourceState::default()));

        let recorder = Arc::new(Recorder::default());
        let policy = RetryPolicy::new(2, Duration::from_secs(1), 1.0).expect("valid policy");
        let outcome = ReadinessVerifier::ready(policy)
            .with_observer(recorder.clone())
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, VerificationOutcome::TimedOut { attempts: 2 });
        let events = recorder.events.lock().expect("recorder lock");
        assert!(events.iter().all(|(_, status, _)| status.is_none()));
    }

    #[tokio::test(start_paused = true)]
    async fn test_custom_condition_type() {
        let mut mock = MockResourceLifecycle::new();
        mock.expect_fetch().times(1).returning(|_| {
            Ok(ResourceState::with_conditions(vec![Condition::new(
                "Available",
                ConditionStatus::True,
            )]))
        });

        let verifier = ReadinessVerifier::new(default_policy(), "Available");
        assert_eq!(verifier.condition_type(), "Available");

        let outcome = verifier
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;
        assert!(outcome.is_ready());
    }

    #[test]
    fn test_outcome_into_result() {
        let h = handle();
        assert!(VerificationOutcome::Ready { attempts: 1 }
            .into_result(&h)
            .is_ok());
        assert!(matches!(
            VerificationOutcome::TimedOut { attempts: 3 }.into_result(&h),
            Err(Error::ReadinessTimeout { attempts: 3, .. })
        ));
        assert!(matches!(
            VerificationOutcome::Cancelled { attempts: 1 }.into_result(&h),
            Err(Error::Cancelled { attempts: 1, .. })
        ));
        let fetch = Error::fetch_for(h.to_string(), "boom");
        assert_eq!(
            VerificationOutcome::FetchFailed {
                attempt: 1,
                error: fetch.clone()
            }
            .into_result(&h),
            Err(fetch)
        );
    }

    #[test]
    fn test_outcome_display() {
        assert_eq!(
            VerificationOutcome::Ready { attempts: 2 }.to_string(),
            "Ready after 2 attempt(s)"
        );
        assert_eq!(
            VerificationOutcome::TimedOut { attempts: 3 }.to_string(),
            "TimedOut after 3 attempt(s)"
        );
    }

    /// Lifecycle whose fetch takes longer than any test waits
    struct SlowFetch;

    #[async_trait::async_trait]
    impl ResourceLifecycle for SlowFetch {
        type Spec = ();

        async fn create(&self, _spec: &()) -> Result<ResourceHandle> {
            Ok(handle())
        }

        async fn fetch(&self, _handle: &ResourceHandle) -> Result<ResourceState> {
            tokio::time::sleep(Duration::from_secs(100)).await;
            Ok(state(ConditionStatus::True))
        }

        async fn delete(&self, _handle: &ResourceHandle) -> Result<()> {
            Ok(())
        }
    }

    /// Story: the API server hangs and the operator gives up mid-request
    #[tokio::test(start_paused = true)]
    async fn story_cancel_interrupts_in_flight_fetch() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            trigger.cancel();
        });

        let start = Instant::now();
        let outcome = ReadinessVerifier::ready(default_policy())
            .verify(&SlowFetch, &handle(), &cancel)
            .await;

        assert_eq!(outcome, VerificationOutcome::Cancelled { attempts: 0 });
        assert_eq!(start.elapsed(), Duration::from_secs(5));
    }

    struct PanickingObserver;

    impl ProgressObserver for PanickingObserver {
        fn on_attempt(&self, _event: &AttemptEvent<'_>) {
            panic!("observer failure");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_panicking_observer_does_not_change_outcome() {
        let mut mock = MockResourceLifecycle::new();
        let mut calls = 0;
        mock.expect_fetch().times(2).returning(move |_| {
            calls += 1;
            Ok(state(if calls == 1 {
                ConditionStatus::False
            } else {
                ConditionStatus::True
            }))
        });

        let outcome = ReadinessVerifier::ready(default_policy())
            .with_observer(Arc::new(PanickingObserver))
            .verify(&mock, &handle(), &CancellationToken::new())
            .await;

        assert_eq!(outcome, VerificationOutcome::Ready { attempts: 2 });
    }

    /// Story: two certificates are verified at once with one shared verifier
    #[tokio::test(start_paused = true)]
    async fn story_concurrent_runs_keep_separate_attempt_counts() {
        let mut fast = MockResourceLifecycle::new();
        fast.expect_fetch()
            .times(1)
            .returning(|_| Ok(state(ConditionStatus::True)));

        let mut slow = MockResourceLifecycle::new();
        let mut calls = 0;
        slow.expect_fetch().times(3).returning(move |_| {
            calls += 1;
            Ok(state(if calls < 3 {
                ConditionStatus::False
            } else {
                ConditionStatus::True
            }))
        });

        let verifier = ReadinessVerifier::ready(default_policy());
        let other = verifier.clone();
        let cancel = CancellationToken::new();
        let fast_handle = ResourceHandle::namespaced("Certificate", "default", "fast");
        let slow_handle = ResourceHandle::namespaced("Certificate", "default", "slow");

        let start = Instant::now();
        let (fast_outcome, slow_outcome) = tokio::join!(
            verifier.verify(&fast, &fast_handle, &cancel),
            other.verify(&slow, &slow_handle, &cancel),
        );

        assert_eq!(fast_outcome, VerificationOutcome::Ready { attempts: 1 });
        assert_eq!(slow_outcome, VerificationOutcome::Ready { attempts: 3 });
        assert_eq!(start.elapsed(), Duration::from_secs(90));
    }
}
