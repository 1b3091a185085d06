pub mod fingerprint;
pub mod metadata;
pub mod vector_index;


pub use fingerprint::{FingerprintStore, content_hash};
pub use metadata::{MetadataEntry, MetadataList};
pub use vector_index::{Neighbor, VectorIndex};

use std::fs;
use std::io::Write as _;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::{CatalogError, Result};

const INDEX_FILE: &str = "index.bin";
const METADATA_FILE: &str = "metadata.json";
const FINGERPRINTS_FILE: &str = "fingerprints.json";

/// Everything the pipelines read and write, loaded together
#[derive(Debug, Default)]
pub struct StoreState {
    pub fingerprints: FingerprintStore,
    pub metadata: MetadataList,
    /// `None` until the first vector fixes the dimension
    pub index: Option<VectorIndex>,
}

impl StoreState {
    #[inline]
    pub fn index_len(&self) -> usize {
        self.index.as_ref().map_or(0, VectorIndex::len)
    }
}

/// The three persisted artifacts under one directory
#[derive(Debug, Clone)]
pub struct RetrievalStore {
    root: PathBuf,
}

impl RetrievalStore {
    #[inline]
    pub fn open(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[inline]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[inline]
    pub fn index_path(&self) -> PathBuf {
        self.root.join(INDEX_FILE)
    }

    #[inline]
    pub fn metadata_path(&self) -> PathBuf {
        self.root.join(METADATA_FILE)
    }

    #[inline]
    pub fn fingerprints_path(&self) -> PathBuf {
        self.root.join(FINGERPRINTS_FILE)
    }

    /// A usable index needs both the vectors and their metadata
    #[inline]
    pub fn index_exists(&self) -> bool {
        self.index_path().exists() && self.metadata_path().exists()
    }

    #[inline]
    pub fn load_index(&self) -> Result<Option<VectorIndex>> {
        VectorIndex::load(&self.index_path())
    }

    #[inline]
    pub fn load_metadata(&self) -> Result<MetadataList> {
        MetadataList::load(&self.metadata_path())
    }

    #[inline]
    pub fn load_fingerprints(&self) -> Result<FingerprintStore> {
        FingerprintStore::load(&self.fingerprints_path())
    }

    #[inline]
    pub fn load_state(&self) -> Result<StoreState> {
        let state = StoreState {
            fingerprints: self.load_fingerprints()?,
            metadata: self.load_metadata()?,
            index: self.load_index()?,
        };
        debug!(
            "Loaded store from {}: {} vectors, {} metadata entries, {} fingerprints",
            self.root.display(),
            state.index_len(),
            state.metadata.len(),
            state.fingerprints.len()
        );
        Ok(state)
    }

    /// Write index, then metadata, then fingerprints. Fingerprints go last so a crash
    /// part way through causes reprocessing rather than a skipped source with no row.
    ///
    /// An empty or absent index removes the index file, so a store repaired down to
    /// zero rows never reloads the vectors it dropped.
    #[inline]
    pub fn persist(&self, state: &StoreState) -> Result<()> {
        let index_path = self.index_path();
        match &state.index {
            Some(index) if !index.is_empty() => index.save(&index_path)?,
            _ if index_path.exists() => {
                debug!("No vectors left, removing {}", index_path.display());
                fs::remove_file(&index_path).map_err(|e| storage_error(&index_path, &e))?;
            }
            _ => debug!("No vectors to persist"),
        }
        state.metadata.save(&self.metadata_path())?;
        state.fingerprints.save(&self.fingerprints_path())?;

        info!(
            "Persisted {} vectors and {} metadata entries to {}",
            state.index_len(),
            state.metadata.len(),
            self.root.display()
        );
        Ok(())
    }

    /// Remove every artifact; used when the stored state cannot be repaired
    #[inline]
    pub fn clear(&self) -> Result<()> {
        for path in [
            self.index_path(),
            self.metadata_path(),
            self.fingerprints_path(),
        ] {
            if path.exists() {
                fs::remove_file(&path).map_err(|e| storage_error(&path, &e))?;
            }
        }
        Ok(())
    }
}

/// Write through a temp file in the target directory and rename it over the target
pub(crate) fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    let parent = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(parent).map_err(|e| storage_error(parent, &e))?;

    let mut temp_file = NamedTempFile::new_in(parent).map_err(|e| storage_error(parent, &e))?;
    temp_file
        .write_all(bytes)
        .and_then(|()| temp_file.as_file().sync_all())
        .map_err(|e| storage_error(temp_file.path(), &e))?;
    temp_file
        .persist(path)
        .map_err(|e| storage_error(path, &e.error))?;
    Ok(())
}

fn storage_error(path: &Path, e: &std::io::Error) -> CatalogError {
    CatalogError::Storage(format!("{}: {}", path.display(), e))
}
