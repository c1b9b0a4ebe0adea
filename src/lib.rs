//! # imagegen-core
//!
//! 远程 AI 图像生成的弹性获取与缓存编排层。
//!
//! Resilient fetch-and-cache orchestration for a remote AI image generation
//! service that is slow, rate-limited and sometimes down.
//!
//! ## Overview
//!
//! The crate turns "generate an image for this prompt" into a reliable
//! operation:
//!
//! - **Fingerprinted cache**: repeated requests are served from memory with
//!   no network access, bounded by a TTL and a FIFO capacity limit
//! - **Resilient catalog**: the model list is retried with exponential
//!   backoff and falls back to a fixed set instead of failing
//! - **Graceful enhancement**: optional prompt enhancement never fails a request
//! - **Owned resources**: decoded images are released exactly once, when the
//!   cache, history and display slot have all let go
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use imagegen_core::{ImageClientBuilder, RequestParams, StyleTag};
//!
//! #[tokio::main]
//! async fn main() -> imagegen_core::Result<()> {
//!     let client = ImageClientBuilder::from_env().build()?;
//!
//!     let catalog = client.models().await;
//!     println!("models: {:?}", catalog.ids());
//!
//!     let request = RequestParams::new("a lighthouse at dusk")
//!         .with_style(StyleTag::FantasyArt)
//!         .with_model("flux");
//!     let image = client.generate(&request).await?;
//!     client.save_image(&image, ".").await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`client`] | `ImageClient`, its builder and the request orchestrator |
//! | [`cache`] | Fingerprinted TTL/capacity-bounded result store |
//! | [`catalog`] | Model catalog aggregator and retrying resolver |
//! | [`resources`] | Decoded image handles, history buffer, display slot |
//! | [`enhance`] | Prompt enhancement through a text model |
//! | [`resilience`] | Injectable scheduler and retry state machine |
//! | [`transport`] | HTTP transport and transport errors |
//! | [`types`] | Request parameters and generation results |
//! | [`config`] | Endpoint, timeout and history configuration |

pub mod cache;
pub mod catalog;
pub mod client;
pub mod config;
pub mod enhance;
pub mod resilience;
pub mod resources;
pub mod transport;
pub mod types;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheStats};
pub use catalog::{Catalog, CatalogConfig, ModelEntry};
pub use client::{ImageClient, ImageClientBuilder};
pub use config::{EndpointConfig, HistoryConfig, TimeoutConfig};
pub use resources::ResourceHandle;
pub use types::{GeneratedImage, RequestParams, StyleTag};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
