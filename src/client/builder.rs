use crate::cache::{CacheConfig, CacheStore};
use crate::catalog::{
    CatalogAggregator, CatalogConfig, CatalogEndpoint, HttpCatalogEndpoint, HttpModelList,
    ModelCatalogResolver,
};
use crate::client::core::ImageClient;
use crate::client::orchestrator::ImageRequestOrchestrator;
use crate::config::{EndpointConfig, HistoryConfig, TimeoutConfig};
use crate::enhance::{HttpPromptEnhancer, PromptEnhancer};
use crate::resilience::{default_scheduler, Scheduler};
use crate::resources::ResourceLifecycleManager;
use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use url::Url;

/// Builder for [`ImageClient`].
///
/// Every store is created exactly once here and shared by reference.
pub struct ImageClientBuilder {
    endpoints: EndpointConfig,
    timeouts: TimeoutConfig,
    cache: CacheConfig,
    catalog: CatalogConfig,
    history: HistoryConfig,
    scheduler: Arc<dyn Scheduler>,
    enhancer: Option<Arc<dyn PromptEnhancer>>,
    catalog_endpoint: Option<Arc<dyn CatalogEndpoint>>,
}

impl ImageClientBuilder {
    pub fn new() -> Self {
        Self {
            endpoints: EndpointConfig::default(),
            timeouts: TimeoutConfig::default(),
            cache: CacheConfig::default(),
            catalog: CatalogConfig::default(),
            history: HistoryConfig::default(),
            scheduler: default_scheduler(),
            enhancer: None,
            catalog_endpoint: None,
        }
    }

    /// Start from the `IMAGEGEN_*` environment variables.
    pub fn from_env() -> Self {
        Self {
            endpoints: EndpointConfig::from_env(),
            timeouts: TimeoutConfig::from_env(),
            cache: CacheConfig::from_env(),
            history: HistoryConfig::from_env(),
            ..Self::new()
        }
    }

    pub fn with_endpoints(mut self, endpoints: EndpointConfig) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Point both the image and the text service at one host.
    ///
    /// This is primarily for testing with mock servers.
    pub fn base_url_override(mut self, base_url: impl Into<String>) -> Self {
        let base = base_url.into();
        self.endpoints.image_base_url = base.clone();
        self.endpoints.text_base_url = base;
        self
    }

    pub fn text_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.endpoints.text_base_url = base_url.into();
        self
    }

    pub fn with_timeouts(mut self, timeouts: TimeoutConfig) -> Self {
        self.timeouts = timeouts;
        self
    }

    pub fn with_cache(mut self, cache: CacheConfig) -> Self {
        self.cache = cache;
        self
    }

    /// Catalog cache and retry settings. The per-attempt timeout always comes
    /// from [`TimeoutConfig::catalog`], whatever order the setters run in.
    pub fn with_catalog(mut self, catalog: CatalogConfig) -> Self {
        self.catalog = catalog;
        self
    }

    pub fn with_history(mut self, history: HistoryConfig) -> Self {
        self.history = history;
        self
    }

    /// Inject a clock; tests use [`ManualScheduler`](crate::resilience::ManualScheduler).
    pub fn with_scheduler(mut self, scheduler: Arc<dyn Scheduler>) -> Self {
        self.scheduler = scheduler;
        self
    }

    /// Replace the HTTP prompt enhancer.
    pub fn with_enhancer(mut self, enhancer: Arc<dyn PromptEnhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    /// Replace the catalog source entirely.
    pub fn with_catalog_endpoint(mut self, endpoint: Arc<dyn CatalogEndpoint>) -> Self {
        self.catalog_endpoint = Some(endpoint);
        self
    }

    pub fn build(self) -> Result<ImageClient> {
        self.history.validate()?;
        let image_base = parse_base_url(&self.endpoints.image_base_url, "endpoints.image_base_url")?;
        let text_base = parse_base_url(&self.endpoints.text_base_url, "endpoints.text_base_url")?;

        let transport = Arc::new(HttpTransport::new(&self.endpoints)?);
        let resources = Arc::new(ResourceLifecycleManager::new(self.history.capacity));
        let catalog_config = self.catalog.with_attempt_timeout(self.timeouts.catalog);
        let cache = Arc::new(CacheStore::new(
            self.cache,
            Arc::clone(&resources),
            Arc::clone(&self.scheduler),
        )?);

        let endpoint: Arc<dyn CatalogEndpoint> = match (self.catalog_endpoint, &self.endpoints.aggregator_url) {
            (Some(endpoint), _) => endpoint,
            (None, Some(url)) => {
                let url = parse_url(url, "endpoints.aggregator_url")?;
                Arc::new(HttpCatalogEndpoint::new(
                    Arc::clone(&transport),
                    url,
                    catalog_config.attempt_timeout,
                ))
            }
            (None, None) => {
                let source = HttpModelList::new(
                    Arc::clone(&transport),
                    &image_base,
                    catalog_config.attempt_timeout,
                )?;
                Arc::new(CatalogAggregator::new(
                    Arc::new(source),
                    Arc::clone(&self.scheduler),
                    catalog_config.upstream_ttl,
                    catalog_config.attempt_timeout,
                ))
            }
        };
        let catalog = Arc::new(ModelCatalogResolver::new(
            endpoint,
            Arc::clone(&self.scheduler),
            catalog_config,
        ));

        let enhancer: Arc<dyn PromptEnhancer> = match self.enhancer {
            Some(enhancer) => enhancer,
            None => Arc::new(HttpPromptEnhancer::new(
                Arc::clone(&transport),
                text_base,
                self.timeouts.enhancement,
            )),
        };

        let orchestrator = ImageRequestOrchestrator::new(
            transport,
            image_base,
            self.timeouts,
            Arc::clone(&cache),
            Arc::clone(&resources),
            Some(enhancer),
        );

        Ok(ImageClient {
            orchestrator,
            catalog,
            cache,
            resources,
        })
    }
}

impl Default for ImageClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}

fn parse_url(raw: &str, field: &str) -> Result<Url> {
    Url::parse(raw.trim()).map_err(|e| {
        Error::configuration_with_context(
            format!("invalid url '{}': {}", raw, e),
            ErrorContext::new()
                .with_field_path(field)
                .with_source("client_builder"),
        )
    })
}

/// Parse a base URL and make sure it ends with `/` so relative joins keep its path.
fn parse_base_url(raw: &str, field: &str) -> Result<Url> {
    let mut url = parse_url(raw, field)?;
    if url.cannot_be_a_base() {
        return Err(Error::configuration_with_context(
            format!("'{}' cannot be used as a base url", raw),
            ErrorContext::new()
                .with_field_path(field)
                .with_source("client_builder"),
        ));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}
