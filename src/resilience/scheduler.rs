use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Clock and sleep source.
///
/// Everything that reasons about elapsed time (cache TTL, catalog TTL,
/// backoff) goes through this trait so tests can drive time by hand.
#[async_trait]
pub trait Scheduler: Send + Sync {
    /// Monotonic "now".
    fn now(&self) -> Instant;

    /// Wall clock in milliseconds since the Unix epoch, for timestamps that
    /// leave the process.
    fn epoch_millis(&self) -> u64;

    async fn sleep(&self, duration: Duration);
}

#[derive(Debug, Default, Clone, Copy)]
pub struct TokioScheduler;

#[async_trait]
impl Scheduler for TokioScheduler {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn epoch_millis(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }

    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

pub fn default_scheduler() -> Arc<dyn Scheduler> {
    Arc::new(TokioScheduler)
}

/// Scheduler whose clock only moves when told to.
///
/// `sleep` records the requested duration, advances the clock by it and
/// yields once, so code under test never actually waits.
#[derive(Debug)]
pub struct ManualScheduler {
    origin: Instant,
    origin_epoch_ms: u64,
    state: Mutex<ManualState>,
}

#[derive(Debug, Default)]
struct ManualState {
    offset: Duration,
    sleeps: Vec<Duration>,
}

impl ManualScheduler {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            origin_epoch_ms: TokioScheduler.epoch_millis(),
            state: Mutex::new(ManualState::default()),
        }
    }

    pub fn advance(&self, by: Duration) {
        let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
        st.offset += by;
    }

    /// Every duration passed to `sleep`, in call order.
    pub fn sleeps(&self) -> Vec<Duration> {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .sleeps
            .clone()
    }

    pub fn elapsed(&self) -> Duration {
        self.state
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .offset
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Scheduler for ManualScheduler {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn epoch_millis(&self) -> u64 {
        self.origin_epoch_ms + self.elapsed().as_millis() as u64
    }

    async fn sleep(&self, duration: Duration) {
        {
            let mut st = self.state.lock().unwrap_or_else(PoisonError::into_inner);
            st.sleeps.push(duration);
            st.offset += duration;
        }
        tokio::task::yield_now().await;
    }
}
