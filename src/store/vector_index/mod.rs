
use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::debug;
use usearch::{Index, IndexOptions, MetricKind, ScalarKind};

use crate::{CatalogError, Result};

/// Smallest capacity reserved when the index has to grow
const MIN_CAPACITY: usize = 16;

/// One nearest-neighbor hit
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub row: usize,
    /// Squared Euclidean distance to the query
    pub distance: f32,
}

/// Exact L2 similarity index over fixed-dimension vectors, backed by usearch.
///
/// Every vector is keyed by its row, the insertion position, so keys stay dense
/// (`0..len`) and line up with the metadata list. Removing rows rekeys the
/// survivors to keep that property.
pub struct VectorIndex {
    inner: Index,
}

impl fmt::Debug for VectorIndex {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VectorIndex")
            .field("dimension", &self.dimension())
            .field("len", &self.len())
            .finish()
    }
}

fn options(dimension: usize) -> IndexOptions {
    IndexOptions {
        dimensions: dimension,
        metric: MetricKind::L2sq,
        quantization: ScalarKind::F32,
        ..IndexOptions::default()
    }
}

fn usearch_error(action: &str, e: impl fmt::Display) -> CatalogError {
    CatalogError::IndexCorruption(format!("Failed to {}: {}", action, e))
}

impl VectorIndex {
    #[inline]
    pub fn new(dimension: usize) -> Result<Self> {
        if dimension == 0 {
            return Err(CatalogError::IndexCorruption(
                "vector dimension must be greater than zero".to_string(),
            ));
        }
        let inner =
            Index::new(&options(dimension)).map_err(|e| usearch_error("create vector index", e))?;
        Ok(Self { inner })
    }

    #[inline]
    pub fn dimension(&self) -> usize {
        self.inner.dimensions()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.size()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of the vector stored at `row`
    #[inline]
    pub fn row(&self, row: usize) -> Option<Vec<f32>> {
        let key = u64::try_from(row).ok()?;
        let mut buffer = vec![0.0_f32; self.dimension()];
        match self.inner.get(key, &mut buffer) {
            Ok(found) if found > 0 => Some(buffer),
            _ => None,
        }
    }

    #[inline]
    pub fn check_dimension(&self, vector: &[f32]) -> Result<()> {
        let dimension = self.dimension();
        if vector.len() == dimension {
            Ok(())
        } else {
            Err(CatalogError::DimensionMismatch {
                expected: dimension,
                actual: vector.len(),
            })
        }
    }

    /// Append a vector and return its row
    #[inline]
    pub fn add(&mut self, vector: &[f32]) -> Result<usize> {
        self.check_dimension(vector)?;

        let row = self.len();
        if row >= self.inner.capacity() {
            let capacity = (row * 2).max(MIN_CAPACITY);
            self.inner
                .reserve(capacity)
                .map_err(|e| usearch_error("reserve index capacity", e))?;
        }
        self.inner
            .add(row_key(row)?, vector)
            .map_err(|e| usearch_error("add vector", e))?;
        Ok(row)
    }

    /// The `k` rows closest to `query`, nearest first. Fewer than `k` rows in the
    /// index simply yields fewer results.
    #[inline]
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<Neighbor>> {
        self.check_dimension(query)?;

        let k = k.min(self.len());
        if k == 0 {
            return Ok(Vec::new());
        }

        let matches = self
            .inner
            .exact_search(query, k)
            .map_err(|e| usearch_error("search vector index", e))?;

        let mut neighbors = matches
            .keys
            .into_iter()
            .zip(matches.distances)
            .map(|(key, distance)| {
                let row = usize::try_from(key).map_err(|_| {
                    CatalogError::IndexCorruption(format!("vector key {} is out of range", key))
                })?;
                Ok(Neighbor { row, distance })
            })
            .collect::<Result<Vec<_>>>()?;

        // equal distances come back in arbitrary order
        neighbors.sort_by(|a, b| a.distance.total_cmp(&b.distance).then(a.row.cmp(&b.row)));
        Ok(neighbors)
    }

    /// Drop the given rows; later rows shift down to stay dense
    #[inline]
    pub fn remove_rows(&mut self, rows: &BTreeSet<usize>) -> Result<()> {
        if rows.is_empty() {
            return Ok(());
        }

        let mut rebuilt = Self::new(self.dimension())?;
        let survivors = self.len().saturating_sub(rows.len());
        rebuilt
            .inner
            .reserve(survivors.max(MIN_CAPACITY))
            .map_err(|e| usearch_error("reserve index capacity", e))?;

        for row in (0..self.len()).filter(|row| !rows.contains(row)) {
            let vector = self.row(row).ok_or_else(|| {
                CatalogError::IndexCorruption(format!("vector index has no row {}", row))
            })?;
            rebuilt.add(&vector)?;
        }

        debug!(
            "Removed {} rows from vector index, {} remain",
            self.len() - rebuilt.len(),
            rebuilt.len()
        );
        *self = rebuilt;
        Ok(())
    }

    /// Keep only the first `rows` rows
    #[inline]
    pub fn truncate(&mut self, rows: usize) -> Result<()> {
        let dropped: BTreeSet<usize> = (rows..self.len()).collect();
        self.remove_rows(&dropped)
    }

    /// Load an index file. `Ok(None)` when the file does not exist; a file that exists
    /// but cannot be read back as a dense L2 index is corruption.
    #[inline]
    pub fn load(path: &Path) -> Result<Option<Self>> {
        if !path.exists() {
            return Ok(None);
        }
        let path_str = utf8_path(path)?;

        // dimensions and metric come from the file header
        let inner = Index::new(&IndexOptions::default())
            .map_err(|e| usearch_error("create vector index", e))?;
        inner.load(path_str).map_err(|e| {
            CatalogError::IndexCorruption(format!(
                "Failed to load vector index {}: {}",
                path.display(),
                e
            ))
        })?;

        let index = Self { inner };
        if index.dimension() == 0 {
            return Err(CatalogError::IndexCorruption(format!(
                "Vector index {} has zero dimensions",
                path.display()
            )));
        }
        if let Some(missing) = (0..index.len()).find(|&row| !index.contains_row(row)) {
            return Err(CatalogError::IndexCorruption(format!(
                "Vector index {} has {} rows but no row {}",
                path.display(),
                index.len(),
                missing
            )));
        }

        debug!(
            "Loaded vector index with {} rows of dimension {}",
            index.len(),
            index.dimension()
        );
        Ok(Some(index))
    }

    /// Save through a temp file in the target directory, renamed over `path`
    #[inline]
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path.parent().unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)
            .map_err(|e| CatalogError::Storage(format!("{}: {}", parent.display(), e)))?;

        let temp_file = NamedTempFile::new_in(parent)
            .map_err(|e| CatalogError::Storage(format!("{}: {}", parent.display(), e)))?;
        self.inner
            .save(utf8_path(temp_file.path())?)
            .map_err(|e| CatalogError::Storage(format!("Failed to save vector index: {}", e)))?;
        temp_file
            .persist(path)
            .map_err(|e| CatalogError::Storage(format!("{}: {}", path.display(), e.error)))?;

        debug!(
            "Saved vector index with {} rows to {}",
            self.len(),
            path.display()
        );
        Ok(())
    }

    fn contains_row(&self, row: usize) -> bool {
        u64::try_from(row).is_ok_and(|key| self.inner.contains(key))
    }
}

fn row_key(row: usize) -> Result<u64> {
    u64::try_from(row)
        .map_err(|_| CatalogError::IndexCorruption(format!("row {} does not fit a key", row)))
}

fn utf8_path(path: &Path) -> Result<&str> {
    path.to_str().ok_or_else(|| {
        CatalogError::Storage(format!("{} is not a UTF-8 path", path.display()))
    })
}
