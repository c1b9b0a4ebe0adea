//! 运行配置：端点、超时与历史缓冲区设置，支持环境变量覆盖。
//!
//! Runtime configuration for endpoints, timeouts and the history buffer.
//!
//! Every struct has production defaults and `with_*` setters. `from_env()`
//! layers the following variables on top of the defaults:
//!
//! | Variable | Effect |
//! |----------|--------|
//! | `IMAGEGEN_IMAGE_BASE_URL` | Base URL of the image service |
//! | `IMAGEGEN_TEXT_BASE_URL` | Base URL of the prompt enhancement service |
//! | `IMAGEGEN_AGGREGATOR_URL` | Fetch the catalog from a remote aggregator instead of in-process |
//! | `IMAGEGEN_PROXY_URL` | Route all traffic through a proxy |
//! | `IMAGEGEN_CATALOG_TIMEOUT_SECS` | Per-attempt catalog timeout |
//! | `IMAGEGEN_GENERATION_TIMEOUT_SECS` | Image download timeout |
//! | `IMAGEGEN_ENHANCE_TIMEOUT_SECS` | Prompt enhancement timeout |
//! | `IMAGEGEN_HISTORY_CAPACITY` | History ring buffer size |

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::{Error, ErrorContext, Result};

pub const DEFAULT_IMAGE_BASE_URL: &str = "https://image.pollinations.ai";
pub const DEFAULT_TEXT_BASE_URL: &str = "https://text.pollinations.ai";
pub const DEFAULT_USER_AGENT: &str = concat!("imagegen-core/", env!("CARGO_PKG_VERSION"));

/// Read and parse an environment variable, ignoring unset or malformed values.
pub(crate) fn env_parse<T: FromStr>(name: &str) -> Option<T> {
    env::var(name).ok().and_then(|s| s.trim().parse::<T>().ok())
}

pub(crate) fn env_secs(name: &str) -> Option<Duration> {
    env_parse::<u64>(name)
        .filter(|secs| *secs > 0)
        .map(Duration::from_secs)
}

/// Remote endpoints and HTTP client identity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointConfig {
    pub image_base_url: String,
    pub text_base_url: String,
    /// When set, the catalog is read from this aggregator endpoint instead of
    /// an in-process aggregator over `{image_base_url}/models`.
    pub aggregator_url: Option<String>,
    pub user_agent: String,
    pub proxy_url: Option<String>,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            image_base_url: DEFAULT_IMAGE_BASE_URL.to_string(),
            text_base_url: DEFAULT_TEXT_BASE_URL.to_string(),
            aggregator_url: None,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            proxy_url: None,
        }
    }
}

impl EndpointConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(url) = env::var("IMAGEGEN_IMAGE_BASE_URL") {
            cfg.image_base_url = url;
        }
        if let Ok(url) = env::var("IMAGEGEN_TEXT_BASE_URL") {
            cfg.text_base_url = url;
        }
        cfg.aggregator_url = env::var("IMAGEGEN_AGGREGATOR_URL").ok();
        cfg.proxy_url = env::var("IMAGEGEN_PROXY_URL").ok();
        cfg
    }

    pub fn with_image_base_url(mut self, url: impl Into<String>) -> Self {
        self.image_base_url = url.into();
        self
    }

    pub fn with_text_base_url(mut self, url: impl Into<String>) -> Self {
        self.text_base_url = url.into();
        self
    }

    pub fn with_aggregator_url(mut self, url: impl Into<String>) -> Self {
        self.aggregator_url = Some(url.into());
        self
    }

    pub fn with_user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = agent.into();
        self
    }

    pub fn with_proxy_url(mut self, url: impl Into<String>) -> Self {
        self.proxy_url = Some(url.into());
        self
    }
}

/// Bounds applied to each kind of outbound call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutConfig {
    /// Hard limit for a single catalog attempt.
    pub catalog: Duration,
    /// Limit for downloading one generated image.
    pub generation: Duration,
    /// Limit for one prompt enhancement call.
    pub enhancement: Duration,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            catalog: Duration::from_secs(10),
            generation: Duration::from_secs(10),
            enhancement: Duration::from_secs(15),
        }
    }
}

impl TimeoutConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            catalog: env_secs("IMAGEGEN_CATALOG_TIMEOUT_SECS").unwrap_or(defaults.catalog),
            generation: env_secs("IMAGEGEN_GENERATION_TIMEOUT_SECS")
                .unwrap_or(defaults.generation),
            enhancement: env_secs("IMAGEGEN_ENHANCE_TIMEOUT_SECS").unwrap_or(defaults.enhancement),
        }
    }

    pub fn with_catalog(mut self, timeout: Duration) -> Self {
        self.catalog = timeout;
        self
    }

    pub fn with_generation(mut self, timeout: Duration) -> Self {
        self.generation = timeout;
        self
    }

    pub fn with_enhancement(mut self, timeout: Duration) -> Self {
        self.enhancement = timeout;
        self
    }
}

/// Size of the history ring buffer kept by the resource manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HistoryConfig {
    pub capacity: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self { capacity: 20 }
    }
}

impl HistoryConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_env() -> Self {
        Self {
            capacity: env_parse("IMAGEGEN_HISTORY_CAPACITY").unwrap_or(Self::default().capacity),
        }
    }

    pub fn with_capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.capacity == 0 {
            return Err(Error::configuration_with_context(
                "history capacity must be at least 1",
                ErrorContext::new()
                    .with_field_path("history.capacity")
                    .with_source("client_builder"),
            ));
        }
        Ok(())
    }
}
