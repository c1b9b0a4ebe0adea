use crate::config::EndpointConfig;
use crate::transport::TransportError;
use crate::{Error, ErrorContext, Result};
use bytes::Bytes;
use reqwest::Proxy;
use std::time::Duration;
use url::Url;

/// Raw successful response body plus the headers we care about.
#[derive(Debug, Clone)]
pub struct HttpPayload {
    pub content_type: Option<String>,
    pub body: Bytes,
}

pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &EndpointConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .user_agent(config.user_agent.as_str())
            .pool_max_idle_per_host(16)
            .pool_idle_timeout(Some(Duration::from_secs(90)));

        if let Some(proxy_url) = &config.proxy_url {
            let proxy = Proxy::all(proxy_url).map_err(|e| {
                Error::configuration_with_context(
                    format!("invalid proxy url: {}", e),
                    ErrorContext::new()
                        .with_field_path("endpoints.proxy_url")
                        .with_source("http_transport"),
                )
            })?;
            builder = builder.proxy(proxy);
        }

        let client = builder.build().map_err(|e| {
            Error::configuration_with_context(
                format!("failed to build HTTP client: {}", e),
                ErrorContext::new().with_source("http_transport"),
            )
        })?;

        Ok(Self { client })
    }

    /// GET a binary body. Non-2xx statuses are reported as [`TransportError`].
    pub async fn get_bytes(&self, url: &Url, timeout: Duration) -> Result<HttpPayload> {
        let response = self.send(url, timeout, "*/*").await?;
        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|h| h.to_str().ok())
            .map(|s| s.to_string());
        let body = response
            .bytes()
            .await
            .map_err(|e| Self::map_reqwest(e, timeout))?;
        Ok(HttpPayload {
            content_type,
            body,
        })
    }

    /// GET a JSON document.
    ///
    /// Some upstreams answer with a JSON document encoded as a JSON string;
    /// that extra layer is unwrapped here.
    pub async fn get_json(&self, url: &Url, timeout: Duration) -> Result<serde_json::Value> {
        let response = self.send(url, timeout, "application/json").await?;
        let text = response
            .text()
            .await
            .map_err(|e| Self::map_reqwest(e, timeout))?;
        let value: serde_json::Value = serde_json::from_str(&text)?;
        match value {
            serde_json::Value::String(inner) => match serde_json::from_str(&inner) {
                Ok(nested) => Ok(nested),
                Err(_) => Ok(serde_json::Value::String(inner)),
            },
            other => Ok(other),
        }
    }

    async fn send(&self, url: &Url, timeout: Duration, accept: &str) -> Result<reqwest::Response> {
        let response = self
            .client
            .get(url.clone())
            .header(reqwest::header::ACCEPT, accept)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| Self::map_reqwest(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or("upstream error");
            return Err(TransportError::new(Some(status.as_u16()), reason).into());
        }
        Ok(response)
    }

    fn map_reqwest(err: reqwest::Error, timeout: Duration) -> Error {
        if err.is_timeout() {
            Error::Transport(TransportError::timeout(timeout))
        } else {
            Error::Transport(TransportError::from(err))
        }
    }
}
