use crate::cache::{CacheStats, CacheStore};
use crate::catalog::{Catalog, ModelCatalogResolver};
use crate::client::orchestrator::ImageRequestOrchestrator;
use crate::resources::{DecodedImage, ResourceHandle, ResourceLifecycleManager, ResourceStats};
use crate::types::{GeneratedImage, RequestParams};
use crate::{Error, ErrorContext, Result};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

/// Entry point tying the cache, catalog, orchestrator and resource manager together.
///
/// Built once by [`ImageClientBuilder`](crate::client::ImageClientBuilder);
/// every component is shared through `Arc`, so the client is cheap to share
/// across tasks behind an `Arc` of its own.
pub struct ImageClient {
    pub(crate) orchestrator: ImageRequestOrchestrator,
    pub(crate) catalog: Arc<ModelCatalogResolver>,
    pub(crate) cache: Arc<CacheStore>,
    pub(crate) resources: Arc<ResourceLifecycleManager>,
}

impl ImageClient {
    pub fn builder() -> crate::client::ImageClientBuilder {
        crate::client::ImageClientBuilder::new()
    }

    /// Generate an image, record it in history and make it the displayed one.
    pub async fn generate(&self, request: &RequestParams) -> Result<GeneratedImage> {
        let image = self.orchestrator.generate(request).await?;
        self.resources.push_history(image.clone());
        self.resources.set_display(Some(image.clone()));
        Ok(image)
    }

    /// Available models. Never fails; falls back to the built-in set.
    pub async fn models(&self) -> Catalog {
        self.catalog.fetch().await
    }

    pub async fn refetch_models(&self) -> Catalog {
        self.catalog.refetch().await
    }

    /// Newest first.
    pub fn history(&self) -> Vec<GeneratedImage> {
        self.resources.history()
    }

    pub fn display(&self) -> Option<GeneratedImage> {
        self.resources.display()
    }

    pub fn clear_display(&self) {
        self.resources.set_display(None);
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn clear_history(&self) {
        self.resources.clear_history();
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    pub fn resource_stats(&self) -> ResourceStats {
        self.resources.stats()
    }

    /// Bytes and metadata of a live resource.
    pub fn image(&self, handle: ResourceHandle) -> Option<Arc<DecodedImage>> {
        self.resources.get(handle)
    }

    /// Write a generated image to disk.
    ///
    /// When `path` is a directory the file is named
    /// `generated-image-{created_at_ms}.{ext}` inside it.
    pub async fn save_image(&self, image: &GeneratedImage, path: impl AsRef<Path>) -> Result<PathBuf> {
        let decoded = self.resources.get(image.resource_handle).ok_or_else(|| {
            Error::runtime_with_context(
                "image resource has been released",
                ErrorContext::new()
                    .with_details(image.resource_handle.uri())
                    .with_source("image_client"),
            )
        })?;

        let path = path.as_ref();
        let target = if tokio::fs::metadata(path)
            .await
            .map(|m| m.is_dir())
            .unwrap_or(false)
        {
            path.join(format!(
                "generated-image-{}.{}",
                image.created_at_ms,
                decoded.extension()
            ))
        } else {
            path.to_path_buf()
        };

        tokio::fs::write(&target, &decoded.bytes).await?;
        info!(path = %target.display(), bytes = decoded.len(), "image saved");
        Ok(target)
    }
}
