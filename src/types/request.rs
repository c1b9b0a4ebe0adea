use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_MODEL: &str = "turbo";
pub const MAX_PROMPT_CHARS: usize = 1000;
pub const MAX_NEGATIVE_PROMPT_CHARS: usize = 500;
pub const MIN_DIMENSION: u32 = 256;
pub const MAX_DIMENSION: u32 = 2048;
const DEFAULT_DIMENSION: u32 = 1024;

/// Visual style preset. Each one contributes a fixed suffix to the prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StyleTag {
    #[default]
    Photorealistic,
    Anime,
    FantasyArt,
    Abstract,
}

impl StyleTag {
    pub const ALL: [StyleTag; 4] = [
        StyleTag::Photorealistic,
        StyleTag::Anime,
        StyleTag::FantasyArt,
        StyleTag::Abstract,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StyleTag::Photorealistic => "photorealistic",
            StyleTag::Anime => "anime",
            StyleTag::FantasyArt => "fantasy-art",
            StyleTag::Abstract => "abstract",
        }
    }

    pub fn suffix(&self) -> &'static str {
        match self {
            StyleTag::Photorealistic => ", photo, detailed, 4k",
            StyleTag::Anime => ", anime, vibrant",
            StyleTag::FantasyArt => ", fantasy, magical",
            StyleTag::Abstract => ", abstract, artistic",
        }
    }
}

impl fmt::Display for StyleTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StyleTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let wanted = s.trim().to_ascii_lowercase();
        StyleTag::ALL
            .into_iter()
            .find(|tag| tag.as_str() == wanted)
            .ok_or_else(|| {
                Error::validation_with_context(
                    format!("unknown style '{}'", s),
                    ErrorContext::new()
                        .with_field_path("request.style_tag")
                        .with_details("expected one of photorealistic, anime, fantasy-art, abstract")
                        .with_source("request_validator"),
                )
            })
    }
}

/// One image generation request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestParams {
    pub prompt_text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub negative_prompt_text: Option<String>,
    #[serde(default)]
    pub style_tag: StyleTag,
    #[serde(default = "default_model")]
    pub model_id: String,
    #[serde(default = "default_dimension")]
    pub width: u32,
    #[serde(default = "default_dimension")]
    pub height: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub seed: Option<u64>,
    #[serde(default)]
    pub enhance: bool,
    #[serde(default = "default_true")]
    pub safe_mode: bool,
    #[serde(default = "default_true")]
    pub no_logo: bool,
}

fn default_model() -> String {
    DEFAULT_MODEL.to_string()
}

fn default_dimension() -> u32 {
    DEFAULT_DIMENSION
}

fn default_true() -> bool {
    true
}

impl RequestParams {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt_text: prompt.into(),
            negative_prompt_text: None,
            style_tag: StyleTag::default(),
            model_id: default_model(),
            width: DEFAULT_DIMENSION,
            height: DEFAULT_DIMENSION,
            seed: None,
            enhance: false,
            safe_mode: true,
            no_logo: true,
        }
    }

    pub fn with_negative_prompt(mut self, text: impl Into<String>) -> Self {
        self.negative_prompt_text = Some(text.into());
        self
    }

    pub fn with_style(mut self, style: StyleTag) -> Self {
        self.style_tag = style;
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_id = model.into();
        self
    }

    pub fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_enhance(mut self, enhance: bool) -> Self {
        self.enhance = enhance;
        self
    }

    pub fn with_safe_mode(mut self, safe: bool) -> Self {
        self.safe_mode = safe;
        self
    }

    pub fn with_no_logo(mut self, no_logo: bool) -> Self {
        self.no_logo = no_logo;
        self
    }

    /// Check every field constraint. Lengths are counted in characters.
    pub fn validate(&self) -> Result<()> {
        let prompt = self.prompt_text.trim();
        if prompt.is_empty() {
            return Err(invalid("prompt must not be empty", "request.prompt_text", None));
        }
        let prompt_len = self.prompt_text.chars().count();
        if prompt_len > MAX_PROMPT_CHARS {
            return Err(invalid(
                "prompt is too long",
                "request.prompt_text",
                Some(format!("{} chars, max {}", prompt_len, MAX_PROMPT_CHARS)),
            ));
        }
        if let Some(neg) = &self.negative_prompt_text {
            let neg_len = neg.chars().count();
            if neg_len > MAX_NEGATIVE_PROMPT_CHARS {
                return Err(invalid(
                    "negative prompt is too long",
                    "request.negative_prompt_text",
                    Some(format!("{} chars, max {}", neg_len, MAX_NEGATIVE_PROMPT_CHARS)),
                ));
            }
        }
        if self.model_id.trim().is_empty() {
            return Err(invalid("model must not be empty", "request.model_id", None));
        }
        for (field, value) in [("request.width", self.width), ("request.height", self.height)] {
            if !(MIN_DIMENSION..=MAX_DIMENSION).contains(&value) {
                return Err(invalid(
                    "dimension out of range",
                    field,
                    Some(format!(
                        "got {}, allowed {}..={}",
                        value, MIN_DIMENSION, MAX_DIMENSION
                    )),
                ));
            }
        }
        Ok(())
    }

    /// Trimmed prompt, then ", negative" when present, then the style suffix.
    pub fn compose_prompt(&self) -> String {
        let mut out = self.prompt_text.trim().to_string();
        if let Some(neg) = self.negative_prompt_text.as_deref().map(str::trim) {
            if !neg.is_empty() {
                out.push_str(", ");
                out.push_str(neg);
            }
        }
        out.push_str(self.style_tag.suffix());
        out
    }
}

fn invalid(message: &str, field: &str, details: Option<String>) -> Error {
    let mut ctx = ErrorContext::new()
        .with_field_path(field)
        .with_source("request_validator");
    if let Some(d) = details {
        ctx = ctx.with_details(d);
    }
    Error::validation_with_context(message, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::{assert_err, assert_ok};

    #[test]
    fn test_defaults() {
        let req = RequestParams::new("a cat");
        assert_eq!(req.model_id, "turbo");
        assert_eq!((req.width, req.height), (1024, 1024));
        assert_eq!(req.style_tag, StyleTag::Photorealistic);
        assert!(!req.enhance);
        assert!(req.safe_mode);
        assert!(req.no_logo);
        assert!(req.seed.is_none());
        assert!(req.negative_prompt_text.is_none());
    }

    #[test]
    fn test_compose_prompt() {
        let req = RequestParams::new("  a cat ");
        assert_eq!(req.compose_prompt(), "a cat, photo, detailed, 4k");

        let req = RequestParams::new("castle")
            .with_negative_prompt("  fog ")
            .with_style(StyleTag::FantasyArt);
        assert_eq!(req.compose_prompt(), "castle, fog, fantasy, magical");

        let req = RequestParams::new("shapes")
            .with_negative_prompt("   ")
            .with_style(StyleTag::Abstract);
        assert_eq!(req.compose_prompt(), "shapes, abstract, artistic");
    }

    #[test]
    fn test_empty_prompt_rejected() {
        let err = RequestParams::new("   ").validate().unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.prompt_text")
        );
    }

    #[test]
    fn test_length_limits() {
        assert_ok!(RequestParams::new("x".repeat(1000)).validate());
        assert_err!(RequestParams::new("x".repeat(1001)).validate());
        // multi-byte characters count once each
        assert_ok!(RequestParams::new("é".repeat(1000)).validate());

        let ok = RequestParams::new("a").with_negative_prompt("n".repeat(500));
        assert_ok!(ok.validate());
        let err = RequestParams::new("a")
            .with_negative_prompt("n".repeat(501))
            .validate()
            .unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.negative_prompt_text")
        );
    }

    #[test]
    fn test_dimension_bounds() {
        assert!(RequestParams::new("a").with_size(256, 2048).validate().is_ok());
        let err = RequestParams::new("a").with_size(255, 1024).validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.width")
        );
        let err = RequestParams::new("a").with_size(1024, 4096).validate().unwrap_err();
        assert_eq!(
            err.context().and_then(|c| c.field_path.as_deref()),
            Some("request.height")
        );
    }

    #[test]
    fn test_deserialize_applies_defaults() {
        let req: RequestParams = serde_json::from_str(r#"{"prompt_text": "a cat"}"#).unwrap();
        assert_eq!(req, RequestParams::new("a cat"));

        let req: RequestParams = serde_json::from_value(serde_json::json!({
            "prompt_text": "a cat",
            "style_tag": "anime",
            "width": 512,
            "safe_mode": false
        }))
        .unwrap();
        assert_eq!(req.style_tag, StyleTag::Anime);
        assert_eq!((req.width, req.height), (512, 1024));
        assert!(!req.safe_mode);
        assert!(req.no_logo);
        assert_eq!(req.model_id, "turbo");
    }

    #[test]
    fn test_style_parse_and_serde() {
        assert_eq!("Fantasy-Art".parse::<StyleTag>().unwrap(), StyleTag::FantasyArt);
        assert!("watercolor".parse::<StyleTag>().is_err());
        assert_eq!(
            serde_json::to_value(StyleTag::FantasyArt).unwrap(),
            serde_json::json!("fantasy-art")
        );
    }
}
