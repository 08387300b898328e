//! Retry policy and exponential backoff scheduling
//!
//! A [`RetryPolicy`] bounds how many times a resource is evaluated and how
//! long to wait between evaluations. No wait precedes the first attempt; the
//! wait before attempt `k` (k >= 2) is `initial_wait * multiplier^(k-2)`.
//!
//! Every computed wait saturates at [`WAIT_CEILING`], and at the policy's
//! optional `max_wait` when one is configured, so large attempt counts can
//! never overflow a `Duration` or stall a run for days.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use readiness_common::backoff::RetryPolicy;
//!
//! let policy = RetryPolicy::new(3, Duration::from_secs(30), 2.0).unwrap();
//! assert_eq!(policy.wait_before(1), None);
//! assert_eq!(policy.wait_before(2), Some(Duration::from_secs(30)));
//! assert_eq!(policy.wait_before(3), Some(Duration::from_secs(60)));
//! assert_eq!(policy.wait_before(4), None);
//! ```

use std::time::Duration;

use rand::Rng;

use crate::{Error, Result};

/// Largest wait the scheduler will ever produce (24 hours)
pub const WAIT_CEILING: Duration = Duration::from_secs(24 * 60 * 60);

/// Default number of evaluations per run
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
/// Default wait before the second evaluation
pub const DEFAULT_INITIAL_WAIT: Duration = Duration::from_secs(30);
/// Default growth factor between consecutive waits
pub const DEFAULT_BACKOFF_MULTIPLIER: f64 = 2.0;

/// Timing and termination policy for a verification run.
///
/// Immutable once built: fields are private and every constructor validates.
#[derive(Clone, Debug, PartialEq)]
pub struct RetryPolicy {
    max_attempts: u32,
    initial_wait: Duration,
    backoff_multiplier: f64,
    max_wait: Option<Duration>,
    jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_wait: DEFAULT_INITIAL_WAIT,
            backoff_multiplier: DEFAULT_BACKOFF_MULTIPLIER,
            max_wait: None,
            jitter: false,
        }
    }
}

impl RetryPolicy {
    /// Create a validated policy
    ///
    /// `max_attempts` must be at least 1 and `backoff_multiplier` must be a
    /// finite number >= 1.
    pub fn new(max_attempts: u32, initial_wait: Duration, backoff_multiplier: f64) -> Result<Self> {
        if max_attempts == 0 {
            return Err(Error::configuration("max attempts must be at least 1"));
        }
        if !backoff_multiplier.is_finite() || backoff_multiplier < 1.0 {
            return Err(Error::configuration(format!(
                "backoff multiplier must be a finite number >= 1 (got {})",
                backoff_multiplier
            )));
        }
        Ok(Self {
            max_attempts,
            initial_wait,
            backoff_multiplier,
            max_wait: None,
            jitter: false,
        })
    }

    /// Cap each individual wait at `max_wait`
    pub fn with_max_wait(mut self, max_wait: Duration) -> Result<Self> {
        if max_wait < self.initial_wait {
            return Err(Error::configuration(format!(
                "max wait {:?} is shorter than initial wait {:?}",
                max_wait, self.initial_wait
            )));
        }
        self.max_wait = Some(max_wait);
        Ok(self)
    }

    /// Randomize slept durations to 0.5x-1.5x of the scheduled wait
    ///
    /// Useful when many runs poll the same backend at once. Scheduled waits
    /// reported to observers are unaffected.
    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    /// Maximum number of evaluations
    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Wait before the second evaluation
    pub fn initial_wait(&self) -> Duration {
        self.initial_wait
    }

    /// Growth factor between consecutive waits
    pub fn backoff_multiplier(&self) -> f64 {
        self.backoff_multiplier
    }

    /// Per-wait ceiling, if configured
    pub fn max_wait(&self) -> Option<Duration> {
        self.max_wait
    }

    /// Whether slept durations are jittered
    pub fn jitter(&self) -> bool {
        self.jitter
    }

    /// Whether attempt `attempt` (1-based) is permitted
    pub fn permits(&self, attempt: u32) -> bool {
        (1..=self.max_attempts).contains(&attempt)
    }

    /// Wait to apply before attempt `attempt` (1-based)
    ///
    /// Returns `None` for the first attempt and for attempts beyond
    /// `max_attempts`.
    pub fn wait_before(&self, attempt: u32) -> Option<Duration> {
        if attempt < 2 || !self.permits(attempt) {
            return None;
        }

        let ceiling = self.ceiling();
        let exponent = i32::try_from(attempt - 2).unwrap_or(i32::MAX);
        let nanos = self.initial_wait.as_nanos() as f64 * self.backoff_multiplier.powi(exponent);

        if !nanos.is_finite() || nanos >= ceiling.as_nanos() as f64 {
            return Some(ceiling);
        }
        Some(Duration::from_nanos(nanos.round() as u64))
    }

    /// Decide what follows a failed attempt `attempt` (1-based)
    pub fn next_step(&self, attempt: u32) -> NextStep {
        let next = attempt.saturating_add(1);
        match self.wait_before(next) {
            Some(wait) => NextStep::Retry {
                attempt: next,
                wait,
            },
            None => NextStep::Exhausted,
        }
    }

    /// Every scheduled wait, in order (length `max_attempts - 1`)
    pub fn schedule(&self) -> impl Iterator<Item = Duration> + '_ {
        (2..=self.max_attempts).filter_map(move |attempt| self.wait_before(attempt))
    }

    /// Total time spent waiting if every attempt fails
    pub fn worst_case_total_wait(&self) -> Duration {
        self.schedule()
            .fold(Duration::ZERO, |total, wait| total.saturating_add(wait))
    }

    /// Duration to actually sleep for a scheduled wait
    ///
    /// Identity unless jitter is enabled; never exceeds the ceiling.
    pub fn sleep_duration(&self, scheduled: Duration) -> Duration {
        if !self.jitter {
            return scheduled;
        }
        let factor = rand::thread_rng().gen_range(0.5..1.5);
        Duration::from_secs_f64(scheduled.as_secs_f64() * factor).min(self.ceiling())
    }

    fn ceiling(&self) -> Duration {
        self.max_wait.unwrap_or(WAIT_CEILING).min(WAIT_CEILING)
    }
}

/// What the scheduler decided after an unsuccessful attempt
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NextStep {
    /// Wait, then perform `attempt`
    Retry {
        /// The attempt about to be made (1-based)
        attempt: u32,
        /// Scheduled wait before it
        wait: Duration,
    },
    /// The last permitted attempt has been used
    Exhausted,
}

/// Per-run attempt counter driven by a [`RetryPolicy`]
///
/// Holds nothing but the current attempt number; the counter only ever
/// increases and never passes `max_attempts`.
#[derive(Debug)]
pub struct BackoffScheduler<'a> {
    policy: &'a RetryPolicy,
    attempt: u32,
}

impl<'a> BackoffScheduler<'a> {
    /// Start a scheduler positioned at the first attempt
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self { policy, attempt: 1 }
    }

    /// The attempt currently being made (1-based)
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// The policy driving this scheduler
    pub fn policy(&self) -> &RetryPolicy {
        self.policy
    }

    /// Record the current attempt as unsuccessful and decide what's next
    pub fn advance(&mut self) -> NextStep {
        let step = self.policy.next_step(self.attempt);
        if let NextStep::Retry { attempt, .. } = step {
            self.attempt = attempt;
        }
        step
    }
}
