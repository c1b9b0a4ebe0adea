//! Fingerprinted result store.

use super::key::{Fingerprint, FingerprintInputs};
use crate::config::{env_parse, env_secs};
use crate::resilience::Scheduler;
use crate::resources::{Owner, ResourceHandle, ResourceLifecycleManager};
use crate::types::RequestParams;
use crate::{Error, ErrorContext, Result};
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    pub capacity: usize,
    pub max_age: Duration,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            capacity: 50,
            max_age: Duration::from_secs(3600),
        }
    }
}

impl CacheConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Defaults overridden by `IMAGEGEN_CACHE_CAPACITY` and `IMAGEGEN_CACHE_MAX_AGE_SECS`.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            capacity: env_parse("IMAGEGEN_CACHE_CAPACITY").unwrap_or(defaults.capacity),
            max_age: env_secs("IMAGEGEN_CACHE_MAX_AGE_SECS").unwrap_or(defaults.max_age),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = max_age;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CacheStats {
    pub size: usize,
    pub capacity: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

impl CacheStats {
    pub fn hit_ratio(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}

/// Everything stored alongside the handle, minus bookkeeping fields.
#[derive(Debug, Clone)]
pub struct CacheMetadata {
    pub final_prompt: String,
    pub model_id: String,
    pub request_snapshot: RequestParams,
}

#[derive(Debug, Clone)]
pub struct CacheEntry {
    pub fingerprint: Fingerprint,
    pub resource_handle: ResourceHandle,
    pub final_prompt: String,
    pub model_id: String,
    pub request_snapshot: RequestParams,
    pub created_at: Instant,
    /// Wall-clock creation time, milliseconds since the Unix epoch.
    pub created_at_ms: u64,
}

struct StoreState {
    // Read only through `peek`, so iteration order stays insertion order.
    entries: LruCache<Fingerprint, CacheEntry>,
    hits: u64,
    misses: u64,
    evictions: u64,
}

impl StoreState {
    fn holds(&self, handle: ResourceHandle) -> bool {
        self.entries.iter().any(|(_, e)| e.resource_handle == handle)
    }
}

/// TTL- and capacity-bounded cache of generated images.
///
/// Eviction is first-in-first-out: a hit never refreshes an entry's
/// position. Expired entries are removed lazily when looked up.
pub struct CacheStore {
    config: CacheConfig,
    resources: Arc<ResourceLifecycleManager>,
    scheduler: Arc<dyn Scheduler>,
    state: Mutex<StoreState>,
}

impl CacheStore {
    pub fn new(
        config: CacheConfig,
        resources: Arc<ResourceLifecycleManager>,
        scheduler: Arc<dyn Scheduler>,
    ) -> Result<Self> {
        let capacity = NonZeroUsize::new(config.capacity).ok_or_else(|| {
            Error::configuration_with_context(
                "cache capacity must be at least 1",
                ErrorContext::new()
                    .with_field_path("cache.capacity")
                    .with_source("cache_store"),
            )
        })?;
        Ok(Self {
            config,
            resources,
            scheduler,
            state: Mutex::new(StoreState {
                entries: LruCache::new(capacity),
                hits: 0,
                misses: 0,
                evictions: 0,
            }),
        })
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    pub fn get(&self, inputs: &FingerprintInputs<'_>) -> Option<CacheEntry> {
        let fp = inputs.fingerprint();
        let now = self.scheduler.now();
        let mut st = self.lock();

        let expired = st
            .entries
            .peek(&fp)
            .map(|entry| now.saturating_duration_since(entry.created_at) >= self.config.max_age);

        let Some(expired) = expired else {
            st.misses += 1;
            debug!(fingerprint = %fp, "cache miss");
            return None;
        };

        if expired {
            st.misses += 1;
            if let Some(entry) = st.entries.pop(&fp) {
                debug!(fingerprint = %fp, "cache entry expired");
                if !st.holds(entry.resource_handle) {
                    self.resources.detach(entry.resource_handle, Owner::Cache);
                }
            }
            return None;
        }

        st.hits += 1;
        debug!(fingerprint = %fp, "cache hit");
        st.entries.peek(&fp).cloned()
    }

    /// Insert a result, evicting the earliest-inserted entry first when full.
    pub fn set(
        &self,
        inputs: &FingerprintInputs<'_>,
        handle: ResourceHandle,
        metadata: CacheMetadata,
    ) -> CacheEntry {
        let fp = inputs.fingerprint();
        let entry = CacheEntry {
            fingerprint: fp.clone(),
            resource_handle: handle,
            final_prompt: metadata.final_prompt,
            model_id: metadata.model_id,
            request_snapshot: metadata.request_snapshot,
            created_at: self.scheduler.now(),
            created_at_ms: self.scheduler.epoch_millis(),
        };

        let mut st = self.lock();
        self.resources.attach(handle, Owner::Cache);

        // Overwriting a key counts as a fresh insertion.
        if let Some(old) = st.entries.pop(&fp) {
            if old.resource_handle != handle && !st.holds(old.resource_handle) {
                self.resources.detach(old.resource_handle, Owner::Cache);
            }
        }

        while st.entries.len() >= self.config.capacity {
            let Some((evicted_fp, evicted)) = st.entries.pop_lru() else {
                break;
            };
            st.evictions += 1;
            debug!(fingerprint = %evicted_fp, "cache eviction");
            if evicted.resource_handle != handle && !st.holds(evicted.resource_handle) {
                self.resources.detach(evicted.resource_handle, Owner::Cache);
            }
        }

        st.entries.push(fp, entry.clone());
        entry
    }

    /// Drop every entry and let go of every cached handle.
    pub fn clear(&self) {
        let mut st = self.lock();
        while let Some((_, entry)) = st.entries.pop_lru() {
            if !st.holds(entry.resource_handle) {
                self.resources.detach(entry.resource_handle, Owner::Cache);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let st = self.lock();
        CacheStats {
            size: st.entries.len(),
            capacity: self.config.capacity,
            hits: st.hits,
            misses: st.misses,
            evictions: st.evictions,
        }
    }
}
