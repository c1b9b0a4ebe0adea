use std::time::{Duration, Instant};

/// Attempt budget and backoff curve for a retried operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_attempts(mut self, attempts: u32) -> Self {
        self.max_attempts = attempts.max(1);
        self
    }

    pub fn with_base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = delay;
        self
    }

    pub fn with_max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = delay;
        self
    }

    /// Delay after the `attempt`-th failure (1-based): base * 2^(attempt-1), capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let base = self.base_delay.as_millis() as u64;
        let cap = self.max_delay.as_millis() as u64;
        let shift = attempt.saturating_sub(1).min(32);
        let delay = base.saturating_mul(1u64 << shift).min(cap);
        Duration::from_millis(delay)
    }
}

/// Retry progress for one fetch cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RetryState {
    #[default]
    Idle,
    /// Attempt `n` (1-based) is in flight.
    Attempting(u32),
    /// Attempt `attempt` failed; the next step is allowed at `deadline`.
    Backoff { attempt: u32, deadline: Instant },
    Exhausted,
}

impl RetryState {
    /// Start a new cycle.
    pub fn begin() -> Self {
        RetryState::Attempting(1)
    }

    /// Transition after the in-flight attempt failed. Returns the delay to wait.
    pub fn on_failure(&mut self, policy: &RetryPolicy, now: Instant) -> Option<Duration> {
        match *self {
            RetryState::Attempting(n) => {
                let delay = policy.backoff(n);
                *self = RetryState::Backoff {
                    attempt: n,
                    deadline: now + delay,
                };
                Some(delay)
            }
            _ => None,
        }
    }

    /// Transition once the backoff delay has elapsed. Returns the next attempt
    /// number, or `None` when the budget is spent.
    pub fn on_backoff_elapsed(&mut self, policy: &RetryPolicy) -> Option<u32> {
        match *self {
            RetryState::Backoff { attempt, .. } if attempt < policy.max_attempts => {
                *self = RetryState::Attempting(attempt + 1);
                Some(attempt + 1)
            }
            RetryState::Backoff { .. } => {
                *self = RetryState::Exhausted;
                None
            }
            _ => None,
        }
    }

    pub fn on_success(&mut self) {
        *self = RetryState::Idle;
    }

    pub fn attempt(&self) -> Option<u32> {
        match *self {
            RetryState::Attempting(n) => Some(n),
            RetryState::Backoff { attempt, .. } => Some(attempt),
            _ => None,
        }
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, RetryState::Exhausted)
    }
}
