//! 资源生命周期模块：管理解码后图像的句柄、所有者集合与历史缓冲区。
//!
//! # Resource Lifecycle Module
//!
//! Decoded images live in memory behind opaque [`ResourceHandle`]s. A handle
//! can be owned at the same time by a cache entry, one or more history slots
//! and the display slot. It is released exactly once, when its last owner
//! lets go.
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`ResourceLifecycleManager`] | Owner bookkeeping, history ring buffer, display slot |
//! | [`DecodedImage`] | Bytes plus sniffed content type and dimensions |
//! | [`Owner`] | Which structure holds a reference |

mod decode;
mod manager;

pub use decode::DecodedImage;
pub use manager::{Owner, ResourceLifecycleManager, ResourceStats};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque reference to a decoded image held by the lifecycle manager.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ResourceHandle(u64);

impl ResourceHandle {
    pub(crate) fn from_raw(id: u64) -> Self {
        Self(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }

    /// Locally addressable URI for this resource.
    pub fn uri(&self) -> String {
        format!("resource://image/{}", self.0)
    }
}

impl fmt::Display for ResourceHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.uri())
    }
}
