//! HTTP transport shared by the catalog, enhancement and generation paths.

mod http;

pub use http::{HttpPayload, HttpTransport};

use std::time::Duration;

/// A failed upstream call: transport error, timeout, or non-2xx status.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", format_status(.status))]
pub struct TransportError {
    /// HTTP status, when the upstream answered at all.
    pub status: Option<u16>,
    pub message: String,
}

fn format_status(status: &Option<u16>) -> String {
    match status {
        Some(code) => format!("HTTP {}: ", code),
        None => String::new(),
    }
}

impl TransportError {
    pub fn new(status: Option<u16>, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
        }
    }

    pub fn timeout(after: Duration) -> Self {
        Self::new(None, format!("request timed out after {}ms", after.as_millis()))
    }

    pub fn is_timeout(&self) -> bool {
        self.status.is_none() && self.message.starts_with("request timed out")
    }
}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        Self::new(err.status().map(|s| s.as_u16()), err.to_string())
    }
}
