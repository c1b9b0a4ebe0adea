//! 弹性模块：可注入的时钟/休眠调度器与显式重试状态机。
//!
//! # Resilience Primitives Module
//!
//! Time and retry building blocks used by the catalog resolver and the cache.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`Scheduler`] | Injectable clock and sleep source |
//! | [`TokioScheduler`] | Production scheduler backed by `tokio::time` |
//! | [`ManualScheduler`] | Hand-driven clock for deterministic tests and demos |
//! | [`RetryPolicy`] | Attempt budget and exponential backoff schedule |
//! | [`RetryState`] | `Idle → Attempting(n) → Backoff(n) → … → Exhausted` |
//!
//! ## Backoff schedule
//!
//! With the default policy (3 attempts, 1s base) a failing upstream is
//! attempted three times with 1s, 2s and 4s of backoff after each failure;
//! the final backoff elapses before the state becomes `Exhausted`.
//!
//! ```rust
//! use imagegen_core::resilience::RetryPolicy;
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.backoff(1), Duration::from_secs(1));
//! assert_eq!(policy.backoff(3), Duration::from_secs(4));
//! ```

pub mod retry;
pub mod scheduler;

pub use retry::{RetryPolicy, RetryState};
pub use scheduler::{default_scheduler, ManualScheduler, Scheduler, TokioScheduler};
