//! 类型模块：生成请求参数与生成结果。
//!
//! # Types Module
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RequestParams`] | One generation request, with defaults and validation |
//! | [`StyleTag`] | Visual style preset appended to the prompt |
//! | [`GeneratedImage`] | Result of `generate`, pointing at a live resource |
//!
//! ## Example
//!
//! ```rust
//! use imagegen_core::types::{RequestParams, StyleTag};
//!
//! let req = RequestParams::new("  a cat  ")
//!     .with_negative_prompt("blurry")
//!     .with_style(StyleTag::Anime);
//! assert!(req.validate().is_ok());
//! assert_eq!(req.compose_prompt(), "a cat, blurry, anime, vibrant");
//! ```

pub mod image;
pub mod request;

pub use image::GeneratedImage;
pub use request::{
    RequestParams, StyleTag, DEFAULT_MODEL, MAX_DIMENSION, MAX_NEGATIVE_PROMPT_CHARS,
    MAX_PROMPT_CHARS, MIN_DIMENSION,
};
