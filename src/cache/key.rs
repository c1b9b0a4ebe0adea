//! Cache key generation.

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fmt;

/// Sentinel mixed into the key when a request carries no seed.
pub const NO_SEED: &str = "no-seed";
const KEY_HEX_LEN: usize = 32;

/// Fixed-length request fingerprint: the first 32 hex chars of a SHA-256.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Fingerprint(String);

impl Fingerprint {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// The request fields that decide cache identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FingerprintInputs<'a> {
    pub prompt: &'a str,
    pub model_id: &'a str,
    pub width: u32,
    pub height: u32,
    pub seed: Option<u64>,
}

impl<'a> FingerprintInputs<'a> {
    pub fn new(prompt: &'a str, model_id: &'a str, width: u32, height: u32) -> Self {
        Self {
            prompt,
            model_id,
            width,
            height,
            seed: None,
        }
    }

    pub fn with_seed(mut self, seed: Option<u64>) -> Self {
        self.seed = seed;
        self
    }

    /// Prompt case and surrounding whitespace do not affect the key.
    pub fn fingerprint(&self) -> Fingerprint {
        let prompt = self.prompt.trim().to_lowercase();
        let seed = self
            .seed
            .map(|s| s.to_string())
            .unwrap_or_else(|| NO_SEED.to_string());

        let width = self.width.to_string();
        let height = self.height.to_string();

        let mut hasher = Sha256::new();
        for part in [
            prompt.as_str(),
            self.model_id,
            width.as_str(),
            height.as_str(),
            seed.as_str(),
        ] {
            hasher.update(part.as_bytes());
            // unit separator keeps ("ab","c") distinct from ("a","bc")
            hasher.update([0x1fu8]);
        }
        let hash: String = hasher
            .finalize()
            .iter()
            .map(|b| format!("{:02x}", b))
            .collect();
        Fingerprint(hash[..KEY_HEX_LEN].to_string())
    }
}
