use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Checksummed envelope for values stored in the list cache.
///
/// A value is serialized to JSON, hashed with SHA-256 and stored together with
/// the hex digest. On read the digest is recomputed; an entry that fails the
/// check is treated as a miss and the caller falls back to the store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ValidatedCacheEntry {
    /// The cached value as a JSON string
    pub data: String,
    /// SHA-256 checksum of `data` (hex encoded)
    pub checksum: String,
}

impl ValidatedCacheEntry {
    pub fn new(data: String) -> Self {
        let checksum = Self::compute_checksum(&data);
        Self { data, checksum }
    }

    /// Serializes `value` and wraps it in a checksummed envelope string.
    pub fn seal<T: Serialize>(value: &T) -> Result<String, serde_json::Error> {
        let data = serde_json::to_string(value)?;
        serde_json::to_string(&Self::new(data))
    }

    /// Validates and decodes an envelope produced by [`seal`](Self::seal).
    ///
    /// Returns `None` for malformed envelopes, checksum mismatches, or
    /// payloads that no longer decode into `T`.
    pub fn open<T: DeserializeOwned>(serialized: &str) -> Option<T> {
        let entry: ValidatedCacheEntry = serde_json::from_str(serialized).ok()?;

        if !entry.is_valid() {
            tracing::warn!(
                "Cache validation failed: checksum mismatch. Expected: {}, Data length: {}",
                entry.checksum,
                entry.data.len()
            );
            return None;
        }

        serde_json::from_str(&entry.data).ok()
    }

    fn compute_checksum(data: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data.as_bytes());
        hex::encode(hasher.finalize())
    }

    pub fn is_valid(&self) -> bool {
        Self::compute_checksum(&self.data) == self.checksum
    }
}
