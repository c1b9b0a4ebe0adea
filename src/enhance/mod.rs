//! 提示词增强模块：调用文本服务扩写图像提示词。
//!
//! # Prompt Enhancement
//!
//! Asks a text model to rewrite a prompt into a more detailed one. Failures
//! here are always absorbed by the caller; a request never fails because
//! enhancement did.

use crate::transport::HttpTransport;
use crate::{Error, ErrorContext, Result};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

const TEXT_MODEL: &str = "openai";

/// Rewrites prompts into more descriptive ones.
#[async_trait]
pub trait PromptEnhancer: Send + Sync {
    async fn enhance(&self, prompt: &str) -> Result<String>;
}

/// Instruction sent to the text model.
pub fn enhancement_instruction(prompt: &str) -> String {
    format!(
        "Enhance this image prompt to be more detailed and visually descriptive: \"{}\". Return only the enhanced prompt without quotes.",
        prompt
    )
}

/// Pull the enhanced prompt out of a `{ "response": ... }` document.
pub fn parse_enhancement(value: &serde_json::Value) -> Result<String> {
    let text = value
        .get("response")
        .and_then(|r| r.as_str())
        .map(str::trim)
        .unwrap_or("");
    if text.is_empty() {
        return Err(Error::runtime_with_context(
            "enhancement returned no text",
            ErrorContext::new()
                .with_field_path("response")
                .with_source("prompt_enhancer"),
        ));
    }
    Ok(text.to_string())
}

/// Enhancer backed by `GET {text_base}/{instruction}?model=openai&json=true`.
pub struct HttpPromptEnhancer {
    transport: Arc<HttpTransport>,
    base_url: Url,
    timeout: Duration,
}

impl HttpPromptEnhancer {
    pub fn new(transport: Arc<HttpTransport>, base_url: Url, timeout: Duration) -> Self {
        Self {
            transport,
            base_url,
            timeout,
        }
    }

    pub fn request_url(&self, prompt: &str) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| {
                Error::configuration_with_context(
                    "text base url cannot carry a path",
                    ErrorContext::new()
                        .with_field_path("endpoints.text_base_url")
                        .with_source("prompt_enhancer"),
                )
            })?
            .pop_if_empty()
            .push(&enhancement_instruction(prompt));
        url.query_pairs_mut()
            .append_pair("model", TEXT_MODEL)
            .append_pair("json", "true");
        Ok(url)
    }
}

#[async_trait]
impl PromptEnhancer for HttpPromptEnhancer {
    async fn enhance(&self, prompt: &str) -> Result<String> {
        let url = self.request_url(prompt)?;
        let value = self.transport.get_json(&url, self.timeout).await?;
        parse_enhancement(&value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::EndpointConfig;
    use serde_json::json;

    #[test]
    fn test_instruction_template() {
        assert_eq!(
            enhancement_instruction("a cat"),
            "Enhance this image prompt to be more detailed and visually descriptive: \"a cat\". Return only the enhanced prompt without quotes."
        );
    }

    #[test]
    fn test_parse_trims_response() {
        let text = parse_enhancement(&json!({"response": "  a fluffy cat  "})).unwrap();
        assert_eq!(text, "a fluffy cat");
    }

    #[test]
    fn test_parse_rejects_empty_or_missing() {
        assert!(parse_enhancement(&json!({"response": "   "})).is_err());
        assert!(parse_enhancement(&json!({"text": "x"})).is_err());
        assert!(parse_enhancement(&json!("just a string")).is_err());
    }

    #[test]
    fn test_request_url_encodes_instruction() {
        let transport = Arc::new(HttpTransport::new(&EndpointConfig::default()).unwrap());
        let enhancer = HttpPromptEnhancer::new(
            transport,
            Url::parse("https://text.example.com/").unwrap(),
            Duration::from_secs(15),
        );
        let url = enhancer.request_url("a cat & a dog").unwrap();
        assert!(url.path().starts_with("/Enhance%20this%20image%20prompt"));
        assert!(url.path().contains("a%20cat%20&%20a%20dog"));
        assert_eq!(url.query(), Some("model=openai&json=true"));
    }
}
