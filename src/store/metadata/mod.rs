#[cfg(test)]
mod tests;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use tracing::debug;

use super::write_atomic;
use crate::catalog::{ProductChunk, ProductMetadata};
use crate::{CatalogError, Result};

/// Persisted record for one vector index row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetadataEntry {
    /// Source file the chunk came from
    pub doc: String,
    /// Normalized chunk text that was embedded
    pub chunk: String,
    pub product_id: String,
    #[serde(deserialize_with = "structured_or_encoded")]
    pub metadata: ProductMetadata,
}

impl MetadataEntry {
    #[inline]
    pub fn from_chunk(doc: &str, chunk: &ProductChunk) -> Self {
        Self {
            doc: doc.to_string(),
            chunk: chunk.content.clone(),
            product_id: chunk.id.to_string(),
            metadata: chunk.metadata.clone(),
        }
    }

    /// Rebuild the chunk this entry was created from
    #[inline]
    pub fn to_chunk(&self) -> Result<ProductChunk> {
        let id = self.product_id.trim().parse().map_err(|_| {
            CatalogError::IndexCorruption(format!(
                "metadata entry for {} has invalid product id {:?}",
                self.doc, self.product_id
            ))
        })?;

        Ok(ProductChunk {
            id,
            content: self.chunk.clone(),
            metadata: self.metadata.clone(),
        })
    }
}

/// Metadata is written as a nested object. Older lists stored it as a JSON-encoded
/// string, which is still accepted on load.
fn structured_or_encoded<'de, D>(deserializer: D) -> std::result::Result<ProductMetadata, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(encoded) => serde_json::from_str(&encoded).map_err(serde::de::Error::custom),
        other => serde_json::from_value(other).map_err(serde::de::Error::custom),
    }
}

/// Ordered metadata entries; entry `i` describes vector index row `i`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetadataList {
    entries: Vec<MetadataEntry>,
}

impl MetadataList {
    /// Load from disk; a missing file is an empty list. A file that exists but does not
    /// parse cannot be realigned with the index and is reported as corruption.
    #[inline]
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| {
            CatalogError::IndexCorruption(format!(
                "Failed to parse metadata list {}: {}",
                path.display(),
                e
            ))
        })
    }

    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| CatalogError::Storage(format!("Failed to encode metadata: {}", e)))?;
        write_atomic(path, content.as_bytes())?;
        debug!("Saved {} metadata entries to {}", self.len(), path.display());
        Ok(())
    }

    #[inline]
    pub fn push(&mut self, entry: MetadataEntry) {
        self.entries.push(entry);
    }

    #[inline]
    pub fn get(&self, row: usize) -> Option<&MetadataEntry> {
        self.entries.get(row)
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, MetadataEntry> {
        self.entries.iter()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rows whose entry came from `doc`
    #[inline]
    pub fn rows_for_doc(&self, doc: &str) -> Vec<usize> {
        self.rows_where(|entry| entry.doc == doc)
    }

    #[inline]
    pub fn rows_where<F>(&self, mut predicate: F) -> Vec<usize>
    where
        F: FnMut(&MetadataEntry) -> bool,
    {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| predicate(entry))
            .map(|(row, _)| row)
            .collect()
    }

    /// Drop the given rows, keeping the relative order of the rest
    #[inline]
    pub fn remove_rows(&mut self, rows: &BTreeSet<usize>) {
        if rows.is_empty() {
            return;
        }
        let mut row = 0;
        self.entries.retain(|_| {
            let keep = !rows.contains(&row);
            row += 1;
            keep
        });
    }

    #[inline]
    pub fn truncate(&mut self, len: usize) {
        self.entries.truncate(len);
    }

    #[inline]
    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

impl<'a> IntoIterator for &'a MetadataList {
    type Item = &'a MetadataEntry;
    type IntoIter = std::slice::Iter<'a, MetadataEntry>;

    #[inline]
    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
