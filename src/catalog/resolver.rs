use super::aggregator::CatalogEndpoint;
use super::{fallback_entries, is_disallowed, ModelEntry};
use crate::resilience::{RetryPolicy, RetryState, Scheduler};
use crate::transport::TransportError;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogConfig {
    /// Local consumer cache lifetime.
    pub local_ttl: Duration,
    /// Lifetime of the in-process aggregator cache.
    pub upstream_ttl: Duration,
    /// Hard limit for one attempt.
    pub attempt_timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            local_ttl: Duration::from_secs(30 * 60),
            upstream_ttl: Duration::from_secs(60 * 60),
            attempt_timeout: Duration::from_secs(10),
            retry: RetryPolicy::default(),
        }
    }
}

impl CatalogConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_local_ttl(mut self, ttl: Duration) -> Self {
        self.local_ttl = ttl;
        self
    }

    pub fn with_upstream_ttl(mut self, ttl: Duration) -> Self {
        self.upstream_ttl = ttl;
        self
    }

    pub fn with_attempt_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }
}

/// Resolved model list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    pub models: Vec<ModelEntry>,
    /// Served from the local or the upstream cache.
    pub cached: bool,
    /// The fixed fallback set was substituted.
    pub fallback: bool,
    /// Why the fallback was used, when a fetch failed.
    pub last_error: Option<String>,
    pub fetched_at_ms: u64,
}

impl Catalog {
    pub fn ids(&self) -> Vec<&str> {
        self.models.iter().map(|m| m.id.as_str()).collect()
    }
}

struct LocalCache {
    models: Vec<ModelEntry>,
    stored_at: Instant,
    fetched_at_ms: u64,
}

struct ResolverState {
    retry: RetryState,
    local: Option<LocalCache>,
    last_error: Option<String>,
    cancel: CancellationToken,
}

enum AttemptOutcome {
    Success(Catalog),
    Failure(String),
    Cancelled,
}

/// Fetches the model catalog with retry, backoff and a local cache.
///
/// Fetch cycles are serialized: concurrent callers wait for the running cycle
/// and then usually find its result in the local cache. `refetch()` cancels a
/// cycle stuck in backoff, resets the retry state and starts over without
/// consulting the local cache.
pub struct ModelCatalogResolver {
    endpoint: Arc<dyn CatalogEndpoint>,
    scheduler: Arc<dyn Scheduler>,
    config: CatalogConfig,
    state: Mutex<ResolverState>,
    cycle: tokio::sync::Mutex<()>,
}

impl ModelCatalogResolver {
    pub fn new(
        endpoint: Arc<dyn CatalogEndpoint>,
        scheduler: Arc<dyn Scheduler>,
        config: CatalogConfig,
    ) -> Self {
        Self {
            endpoint,
            scheduler,
            config,
            state: Mutex::new(ResolverState {
                retry: RetryState::Idle,
                local: None,
                last_error: None,
                cancel: CancellationToken::new(),
            }),
            cycle: tokio::sync::Mutex::new(()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, ResolverState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    pub fn retry_state(&self) -> RetryState {
        self.lock().retry
    }

    pub fn last_error(&self) -> Option<String> {
        self.lock().last_error.clone()
    }

    /// Resolve the catalog. Never fails: exhausted retries yield the fallback set.
    pub async fn fetch(&self) -> Catalog {
        if let Some(hit) = self.local_hit() {
            return hit;
        }
        let _cycle = self.cycle.lock().await;
        if let Some(hit) = self.local_hit() {
            return hit;
        }
        let token = self.lock().cancel.clone();
        self.run_cycle(token).await
    }

    /// Reset retry state and fetch again, bypassing the local cache.
    pub async fn refetch(&self) -> Catalog {
        {
            let mut st = self.lock();
            st.cancel.cancel();
            st.cancel = CancellationToken::new();
            st.retry = RetryState::Idle;
        }
        debug!("catalog refetch requested");
        let _cycle = self.cycle.lock().await;
        let token = self.lock().cancel.clone();
        self.run_cycle(token).await
    }

    fn local_hit(&self) -> Option<Catalog> {
        let now = self.scheduler.now();
        let st = self.lock();
        st.local
            .as_ref()
            .filter(|c| now.saturating_duration_since(c.stored_at) < self.config.local_ttl)
            .map(|c| Catalog {
                models: c.models.clone(),
                cached: true,
                fallback: false,
                last_error: None,
                fetched_at_ms: c.fetched_at_ms,
            })
    }

    async fn run_cycle(&self, token: CancellationToken) -> Catalog {
        let policy = self.config.retry;
        self.lock().retry = RetryState::begin();

        loop {
            let attempt = self.lock().retry.attempt().unwrap_or(1);
            let error = match self.attempt(&token).await {
                AttemptOutcome::Success(catalog) => {
                    let mut st = self.lock();
                    st.retry.on_success();
                    st.last_error = None;
                    if !catalog.fallback {
                        st.local = Some(LocalCache {
                            models: catalog.models.clone(),
                            stored_at: self.scheduler.now(),
                            fetched_at_ms: catalog.fetched_at_ms,
                        });
                    }
                    info!(
                        count = catalog.models.len(),
                        cached = catalog.cached,
                        attempt,
                        "model catalog loaded"
                    );
                    return catalog;
                }
                AttemptOutcome::Cancelled => return self.cancelled(),
                AttemptOutcome::Failure(error) => error,
            };

            warn!(attempt, error = %error, "catalog attempt failed");
            let delay = {
                let mut st = self.lock();
                st.last_error = Some(error);
                st.retry
                    .on_failure(&policy, self.scheduler.now())
                    .unwrap_or_else(|| policy.backoff(attempt))
            };

            tokio::select! {
                biased;
                _ = token.cancelled() => return self.cancelled(),
                _ = self.scheduler.sleep(delay) => {}
            }

            let next = self.lock().retry.on_backoff_elapsed(&policy);
            if next.is_none() {
                let last_error = self.last_error();
                warn!(
                    attempts = policy.max_attempts,
                    error = last_error.as_deref().unwrap_or("unknown"),
                    "catalog retries exhausted, using fallback models"
                );
                return self.fallback(last_error);
            }
        }
    }

    async fn attempt(&self, token: &CancellationToken) -> AttemptOutcome {
        let timeout = self.config.attempt_timeout;
        let result = tokio::select! {
            biased;
            _ = token.cancelled() => return AttemptOutcome::Cancelled,
            r = tokio::time::timeout(timeout, self.endpoint.models()) => r,
        };

        let response = match result {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => return AttemptOutcome::Failure(e.to_string()),
            Err(_) => return AttemptOutcome::Failure(TransportError::timeout(timeout).to_string()),
        };
        if !response.success {
            return AttemptOutcome::Failure(
                response
                    .error
                    .unwrap_or_else(|| "catalog endpoint reported failure".to_string()),
            );
        }

        let mut models: Vec<ModelEntry> = response
            .models
            .iter()
            .map(|id| id.trim())
            .filter(|id| !id.is_empty() && !is_disallowed(id))
            .map(ModelEntry::from_id)
            .collect();
        let mut fallback = response.fallback;
        if models.is_empty() {
            models = fallback_entries();
            fallback = true;
        }

        AttemptOutcome::Success(Catalog {
            models,
            cached: response.cached,
            fallback,
            last_error: None,
            fetched_at_ms: self.scheduler.epoch_millis(),
        })
    }

    fn cancelled(&self) -> Catalog {
        debug!("catalog cycle cancelled");
        let last_error = self
            .last_error()
            .or_else(|| Some("catalog fetch cancelled".to_string()));
        self.fallback(last_error)
    }

    fn fallback(&self, last_error: Option<String>) -> Catalog {
        Catalog {
            models: fallback_entries(),
            cached: false,
            fallback: true,
            last_error,
            fetched_at_ms: self.scheduler.epoch_millis(),
        }
    }
}
