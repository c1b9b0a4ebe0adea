use crate::resources::ResourceHandle;
use crate::types::RequestParams;
use serde::{Deserialize, Serialize};

/// Outcome of a successful `generate` call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedImage {
    pub resource_handle: ResourceHandle,
    /// Prompt actually sent upstream (after composition and enhancement).
    pub final_prompt: String,
    pub model_id: String,
    /// The request that produced the image. A cache hit carries the original
    /// request, which may differ from the current one in fields that do not
    /// affect the fingerprint (enhance, safe mode, logo).
    pub request_snapshot: RequestParams,
    /// Milliseconds since the Unix epoch when the payload was fetched.
    pub created_at_ms: u64,
    pub from_cache: bool,
}
