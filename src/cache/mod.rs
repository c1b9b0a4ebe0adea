//! 结果缓存模块：按请求指纹缓存生成结果，支持 TTL 与容量淘汰。
//!
//! # Result Cache Module
//!
//! Maps a generation request to a previously obtained image so that
//! repeating a request costs no network access.
//!
//! ## Key Components
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`CacheStore`] | TTL- and capacity-bounded store with FIFO eviction |
//! | [`CacheConfig`] | Capacity (default 50) and max age (default 1 hour) |
//! | [`FingerprintInputs`] | Request fields that decide cache identity |
//! | [`Fingerprint`] | 32-hex-char SHA-256 prefix |
//!
//! ## Cache Key Generation
//!
//! The fingerprint covers the prompt (trimmed, lowercased), model, width,
//! height and seed, with `"no-seed"` standing in for an absent seed.
//!
//! ```rust
//! use imagegen_core::cache::FingerprintInputs;
//!
//! let a = FingerprintInputs::new("A cat ", "turbo", 1024, 1024).fingerprint();
//! let b = FingerprintInputs::new("a cat", "turbo", 1024, 1024).fingerprint();
//! assert_eq!(a, b);
//! ```
//!
//! ## Ownership
//!
//! Each entry holds the [`Owner::Cache`](crate::resources::Owner) reference on
//! its resource. Expiry, eviction and `clear()` drop that reference, which
//! releases the image unless history or the display slot still holds it.

mod key;
mod store;

pub use key::{Fingerprint, FingerprintInputs, NO_SEED};
pub use store::{CacheConfig, CacheEntry, CacheMetadata, CacheStats, CacheStore};
