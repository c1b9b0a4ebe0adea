//! 模型目录模块：获取、过滤、缓存可用的生成模型列表，失败时回退到固定集合。
//!
//! # Model Catalog Module
//!
//! The set of generation models is read from the upstream `/models` endpoint
//! through two cache layers:
//!
//! | Layer | Component | TTL |
//! |-------|-----------|-----|
//! | Upstream aggregator | [`CatalogAggregator`] | 1 hour |
//! | Local consumer | [`ModelCatalogResolver`] | 30 minutes |
//!
//! Either layer serving a hit marks the result `cached: true`. The resolver
//! retries failed cycles with exponential backoff and, once the budget is
//! spent, returns the fixed fallback set together with the last error.
//!
//! ## Filtering
//!
//! Non-string and empty entries are dropped, as is anything matching a
//! disallowed id (case-insensitive). An empty result is replaced by
//! [`FALLBACK_MODELS`].
//!
//! ```rust
//! use imagegen_core::catalog::filter_model_ids;
//! use serde_json::json;
//!
//! let ids = filter_model_ids(&[json!("flux"), json!("NanoBanana"), json!(3), json!("turbo")]);
//! assert_eq!(ids, vec!["flux", "turbo"]);
//! ```

mod aggregator;
mod resolver;
mod source;

pub use aggregator::{AggregatorResponse, CatalogAggregator, CatalogEndpoint, HttpCatalogEndpoint};
pub use resolver::{Catalog, CatalogConfig, ModelCatalogResolver};
pub use source::{HttpModelList, ModelListSource};

use serde::{Deserialize, Serialize};

/// Model ids never offered to callers.
pub const DISALLOWED_MODELS: &[&str] = &["nanobanana"];

/// Served whenever the upstream list is unavailable or filters down to nothing.
pub const FALLBACK_MODELS: &[&str] = &["flux", "turbo", "kontext"];

const DEFAULT_DESCRIPTION: &str = "Advanced AI image generation model";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelEntry {
    pub id: String,
    pub display_name: String,
    pub description: String,
}

impl ModelEntry {
    pub fn from_id(id: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            display_name: display_name(&id),
            description: describe_model(&id).to_string(),
            id,
        }
    }
}

/// Short human-readable description of a known model.
pub fn describe_model(id: &str) -> &'static str {
    match id.to_ascii_lowercase().as_str() {
        "flux" => "High-quality image generation with excellent detail and coherence",
        "turbo" => "Fast image generation optimized for speed and efficiency",
        "kontext" => "Context-aware model that understands complex prompts better",
        _ => DEFAULT_DESCRIPTION,
    }
}

fn display_name(id: &str) -> String {
    let mut chars = id.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

pub fn is_disallowed(id: &str) -> bool {
    DISALLOWED_MODELS
        .iter()
        .any(|d| d.eq_ignore_ascii_case(id.trim()))
}

/// Keep non-empty string entries that are not disallowed, in order.
pub fn filter_model_ids(raw: &[serde_json::Value]) -> Vec<String> {
    raw.iter()
        .filter_map(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty() && !is_disallowed(s))
        .map(str::to_string)
        .collect()
}

pub fn fallback_ids() -> Vec<String> {
    FALLBACK_MODELS.iter().map(|s| s.to_string()).collect()
}

pub fn fallback_entries() -> Vec<ModelEntry> {
    FALLBACK_MODELS.iter().map(|id| ModelEntry::from_id(*id)).collect()
}
