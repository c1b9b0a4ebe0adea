use super::source::ModelListSource;
use super::{fallback_ids, filter_model_ids};
use crate::resilience::Scheduler;
use crate::transport::{HttpTransport, TransportError};
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};
use url::Url;

/// Envelope returned by the catalog aggregator.
///
/// Failures are reported in-band: `success: false`, `fallback: true`, the
/// fallback ids in `models` and the reason in `error`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatorResponse {
    pub success: bool,
    /// Non-string, empty and disallowed entries are dropped on the way in.
    #[serde(deserialize_with = "deserialize_model_ids")]
    pub models: Vec<String>,
    #[serde(default)]
    pub cached: bool,
    pub timestamp: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub fallback: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
}

fn deserialize_model_ids<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Vec::<serde_json::Value>::deserialize(deserializer)?;
    Ok(filter_model_ids(&raw))
}

/// Anything that answers with an [`AggregatorResponse`].
#[async_trait]
pub trait CatalogEndpoint: Send + Sync {
    async fn models(&self) -> Result<AggregatorResponse>;
}

struct CachedList {
    models: Vec<String>,
    stored_at: Instant,
}

/// In-process aggregator over an upstream model list.
///
/// Successful lists are cached for `ttl`; fallback data is never cached.
/// `models()` never returns `Err`.
pub struct CatalogAggregator {
    source: Arc<dyn ModelListSource>,
    scheduler: Arc<dyn Scheduler>,
    ttl: Duration,
    timeout: Duration,
    cache: Mutex<Option<CachedList>>,
}

impl CatalogAggregator {
    pub fn new(
        source: Arc<dyn ModelListSource>,
        scheduler: Arc<dyn Scheduler>,
        ttl: Duration,
        timeout: Duration,
    ) -> Self {
        Self {
            source,
            scheduler,
            ttl,
            timeout,
            cache: Mutex::new(None),
        }
    }

    fn cached(&self) -> Option<Vec<String>> {
        let now = self.scheduler.now();
        let guard = self.cache.lock().unwrap_or_else(PoisonError::into_inner);
        guard
            .as_ref()
            .filter(|c| now.saturating_duration_since(c.stored_at) < self.ttl)
            .map(|c| c.models.clone())
    }

    async fn fetch_upstream(&self) -> Result<Vec<String>> {
        let raw = match tokio::time::timeout(self.timeout, self.source.fetch_model_list()).await {
            Ok(result) => result?,
            Err(_) => return Err(TransportError::timeout(self.timeout).into()),
        };
        let list = raw.as_array().ok_or_else(|| {
            Error::runtime_with_context(
                "invalid response format from models API",
                ErrorContext::new()
                    .with_details("expected a JSON array")
                    .with_source("catalog_aggregator"),
            )
        })?;
        Ok(filter_model_ids(list))
    }
}

#[async_trait]
impl CatalogEndpoint for CatalogAggregator {
    async fn models(&self) -> Result<AggregatorResponse> {
        let timestamp = self.scheduler.epoch_millis();
        if let Some(models) = self.cached() {
            debug!(count = models.len(), "aggregator cache hit");
            return Ok(AggregatorResponse {
                success: true,
                models,
                cached: true,
                timestamp,
                error: None,
                fallback: false,
                source: None,
            });
        }

        match self.fetch_upstream().await {
            Ok(models) if !models.is_empty() => {
                info!(count = models.len(), "fetched model list from upstream");
                *self.cache.lock().unwrap_or_else(PoisonError::into_inner) = Some(CachedList {
                    models: models.clone(),
                    stored_at: self.scheduler.now(),
                });
                Ok(AggregatorResponse {
                    success: true,
                    models,
                    cached: false,
                    timestamp,
                    error: None,
                    fallback: false,
                    source: Some("upstream".to_string()),
                })
            }
            Ok(_) => {
                warn!("upstream model list empty after filtering, serving core set");
                Ok(AggregatorResponse {
                    success: true,
                    models: fallback_ids(),
                    cached: false,
                    timestamp,
                    error: None,
                    fallback: true,
                    source: Some("fallback".to_string()),
                })
            }
            Err(e) => {
                warn!(error = %e, "model list fetch failed, serving fallback");
                Ok(AggregatorResponse {
                    success: false,
                    models: fallback_ids(),
                    cached: false,
                    timestamp,
                    error: Some(e.to_string()),
                    fallback: true,
                    source: None,
                })
            }
        }
    }
}

/// Remote aggregator reached over HTTP.
pub struct HttpCatalogEndpoint {
    transport: Arc<HttpTransport>,
    url: Url,
    timeout: Duration,
}

impl HttpCatalogEndpoint {
    pub fn new(transport: Arc<HttpTransport>, url: Url, timeout: Duration) -> Self {
        Self {
            transport,
            url,
            timeout,
        }
    }
}

#[async_trait]
impl CatalogEndpoint for HttpCatalogEndpoint {
    async fn models(&self) -> Result<AggregatorResponse> {
        let value = self.transport.get_json(&self.url, self.timeout).await?;
        Ok(serde_json::from_value(value)?)
    }
}
