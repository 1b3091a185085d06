
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use tracing::{debug, warn};

use super::write_atomic;
use crate::{CatalogError, Result};

/// SHA-256 of the raw source bytes, lower-case hex
#[inline]
pub fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

/// Source identifier -> content hash of the bytes that were last indexed.
///
/// An entry exists exactly when the source's chunk has a row in the vector index.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FingerprintStore {
    entries: BTreeMap<String, String>,
}

impl FingerprintStore {
    /// Load from disk. A missing or unreadable file yields an empty store, which only
    /// costs a reprocessing pass.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        match serde_json::from_str(&content) {
            Ok(store) => Ok(store),
            Err(e) => {
                warn!(
                    "Ignoring unreadable fingerprint file {}: {}",
                    path.display(),
                    e
                );
                Ok(Self::default())
            }
        }
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CatalogError::Storage(format!("Failed to encode fingerprints: {}", e)))?;
        write_atomic(path, content.as_bytes())?;
        debug!("Saved {} fingerprints to {}", self.len(), path.display());
        Ok(())
    }

    /// True when the source is unknown or its bytes changed since it was indexed
    #[inline]
    pub fn needs_processing(&self, source_id: &str, content_hash: &str) -> bool {
        self.entries
            .get(source_id)
            .is_none_or(|stored| stored != content_hash)
    }

    #[inline]
    pub fn record_processed(&mut self, source_id: &str, content_hash: &str) {
        self.entries
            .insert(source_id.to_string(), content_hash.to_string());
    }

    #[inline]
    pub fn remove(&mut self, source_id: &str) -> Option<String> {
        self.entries.remove(source_id)
    }

    #[inline]
    pub fn get(&self, source_id: &str) -> Option<&str> {
        self.entries.get(source_id).map(String::as_str)
    }

    #[inline]
    pub fn source_ids(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}
