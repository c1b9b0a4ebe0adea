//! Client facade for image generation.
//!
//! Keep the public surface small: build an [`ImageClient`] once, share it,
//! and call `generate` / `models`. Implementation details live in
//! submodules under `src/client/`.

pub mod builder;
pub mod core;
pub mod orchestrator;

pub use builder::ImageClientBuilder;
pub use core::ImageClient;
pub use orchestrator::ImageRequestOrchestrator;
