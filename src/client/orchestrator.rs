use crate::cache::{CacheMetadata, CacheStore, FingerprintInputs};
use crate::config::TimeoutConfig;
use crate::enhance::PromptEnhancer;
use crate::resources::ResourceLifecycleManager;
use crate::transport::HttpTransport;
use crate::types::{GeneratedImage, RequestParams};
use crate::{Error, ErrorContext, Result};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

/// Composes, validates and dispatches generation requests.
///
/// Validation and transport failures are returned; enhancement failures are
/// logged and otherwise ignored. A failed request leaves the cache untouched.
pub struct ImageRequestOrchestrator {
    transport: Arc<HttpTransport>,
    image_base_url: Url,
    timeouts: TimeoutConfig,
    cache: Arc<CacheStore>,
    resources: Arc<ResourceLifecycleManager>,
    enhancer: Option<Arc<dyn PromptEnhancer>>,
}

impl ImageRequestOrchestrator {
    pub fn new(
        transport: Arc<HttpTransport>,
        image_base_url: Url,
        timeouts: TimeoutConfig,
        cache: Arc<CacheStore>,
        resources: Arc<ResourceLifecycleManager>,
        enhancer: Option<Arc<dyn PromptEnhancer>>,
    ) -> Self {
        Self {
            transport,
            image_base_url,
            timeouts,
            cache,
            resources,
            enhancer,
        }
    }

    pub async fn generate(&self, request: &RequestParams) -> Result<GeneratedImage> {
        request.validate()?;
        let composed = request.compose_prompt();

        let inputs = FingerprintInputs::new(
            &composed,
            &request.model_id,
            request.width,
            request.height,
        )
        .with_seed(request.seed);

        if let Some(entry) = self.cache.get(&inputs) {
            debug!(model = %entry.model_id, "serving generation from cache");
            return Ok(GeneratedImage {
                resource_handle: entry.resource_handle,
                final_prompt: entry.final_prompt,
                model_id: entry.model_id,
                request_snapshot: entry.request_snapshot,
                created_at_ms: entry.created_at_ms,
                from_cache: true,
            });
        }

        let final_prompt = if request.enhance {
            self.enhance_or_keep(&composed).await
        } else {
            composed.clone()
        };

        let url = self.build_image_url(&final_prompt, request)?;
        let payload = self
            .transport
            .get_bytes(&url, self.timeouts.generation)
            .await?;
        let handle = self
            .resources
            .decode(payload.body, payload.content_type.as_deref())?;

        let entry = self.cache.set(
            &inputs,
            handle,
            CacheMetadata {
                final_prompt: final_prompt.clone(),
                model_id: request.model_id.clone(),
                request_snapshot: request.clone(),
            },
        );

        info!(
            model = %request.model_id,
            width = request.width,
            height = request.height,
            enhanced = final_prompt != composed,
            resource = %handle,
            "image generated"
        );

        Ok(GeneratedImage {
            resource_handle: handle,
            final_prompt,
            model_id: request.model_id.clone(),
            request_snapshot: request.clone(),
            created_at_ms: entry.created_at_ms,
            from_cache: false,
        })
    }

    async fn enhance_or_keep(&self, composed: &str) -> String {
        let Some(enhancer) = &self.enhancer else {
            return composed.to_string();
        };
        let timeout = self.timeouts.enhancement;
        match tokio::time::timeout(timeout, enhancer.enhance(composed)).await {
            Ok(Ok(enhanced)) => {
                debug!(original = composed, enhanced = %enhanced, "prompt enhanced");
                enhanced
            }
            Ok(Err(e)) => {
                warn!(error = %e, "prompt enhancement failed, using original prompt");
                composed.to_string()
            }
            Err(_) => {
                warn!(
                    timeout_ms = timeout.as_millis() as u64,
                    "prompt enhancement timed out, using original prompt"
                );
                composed.to_string()
            }
        }
    }

    /// `{image_base}/prompt/{prompt}?model&width&height[&seed]&nologo&safe`
    pub fn build_image_url(&self, prompt: &str, request: &RequestParams) -> Result<Url> {
        let mut url = self.image_base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::configuration_with_context(
                    "image base url cannot carry a path",
                    ErrorContext::new()
                        .with_field_path("endpoints.image_base_url")
                        .with_source("orchestrator"),
                )
            })?
            .pop_if_empty()
            .push("prompt")
            .push(prompt);
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("model", &request.model_id)
                .append_pair("width", &request.width.to_string())
                .append_pair("height", &request.height.to_string());
            if let Some(seed) = request.seed {
                query.append_pair("seed", &seed.to_string());
            }
            query
                .append_pair("nologo", bool_str(request.no_logo))
                .append_pair("safe", bool_str(request.safe_mode));
        }
        Ok(url)
    }
}

fn bool_str(v: bool) -> &'static str {
    if v {
        "true"
    } else {
        "false"
    }
}
