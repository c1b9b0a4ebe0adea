use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

/// Raw upstream model list (`GET {image_base}/models`).
#[async_trait]
pub trait ModelListSource: Send + Sync {
    async fn fetch_model_list(&self) -> Result<serde_json::Value>;
}

pub struct HttpModelList {
    transport: Arc<HttpTransport>,
    url: Url,
    timeout: Duration,
}

impl HttpModelList {
    pub fn new(transport: Arc<HttpTransport>, image_base_url: &Url, timeout: Duration) -> Result<Self> {
        let url = image_base_url.join("models").map_err(|e| {
            Error::configuration_with_context(
                format!("cannot build models url: {}", e),
                ErrorContext::new()
                    .with_field_path("endpoints.image_base_url")
                    .with_source("catalog"),
            )
        })?;
        Ok(Self {
            transport,
            url,
            timeout,
        })
    }
}

#[async_trait]
impl ModelListSource for HttpModelList {
    async fn fetch_model_list(&self) -> Result<serde_json::Value> {
        self.transport.get_json(&self.url, self.timeout).await
    }
}
