// Indexer module
// Turns a directory of product records into vectors, metadata and fingerprints

pub mod consistency;


use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::catalog::{ProductChunk, normalize};
use crate::config::CorpusConfig;
use crate::embeddings::EmbeddingProvider;
use crate::store::{MetadataEntry, RetrievalStore, StoreState, VectorIndex, content_hash};
use crate::{CatalogError, Result};

pub use consistency::ConsistencyReport;

/// Which files count as source records and how progress is shown
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexingOptions {
    /// File extension of source records, without the dot
    pub extension: String,
    pub show_progress: bool,
}

impl Default for IndexingOptions {
    #[inline]
    fn default() -> Self {
        Self {
            extension: "json".to_string(),
            show_progress: true,
        }
    }
}

impl From<&CorpusConfig> for IndexingOptions {
    #[inline]
    fn from(corpus: &CorpusConfig) -> Self {
        Self {
            extension: corpus.extension.clone(),
            ..Self::default()
        }
    }
}

/// Counters for one pass over the corpus
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IndexingStats {
    pub records_seen: usize,
    /// Records embedded and written this run, including replacements
    pub records_indexed: usize,
    /// Indexed records that replaced an older version of the same source
    pub records_replaced: usize,
    /// Unchanged records
    pub records_skipped: usize,
    /// Unreadable or malformed records
    pub records_failed: usize,
    pub embedding_failures: usize,
}

impl IndexingStats {
    #[inline]
    pub fn summary(&self) -> String {
        format!(
            "{} records: {} indexed ({} replaced), {} unchanged, {} failed, {} embedding failures",
            self.records_seen,
            self.records_indexed,
            self.records_replaced,
            self.records_skipped,
            self.records_failed,
            self.embedding_failures
        )
    }
}

enum Outcome {
    Skipped,
    Indexed { replaced: bool },
    Failed,
    EmbeddingFailed,
}

/// Incremental corpus indexer over a [`RetrievalStore`]
pub struct IndexingPipeline<'a, E> {
    store: &'a RetrievalStore,
    embedder: &'a E,
    options: IndexingOptions,
}

impl<'a, E: EmbeddingProvider> IndexingPipeline<'a, E> {
    #[inline]
    pub fn new(store: &'a RetrievalStore, embedder: &'a E) -> Self {
        Self {
            store,
            embedder,
            options: IndexingOptions::default(),
        }
    }

    #[inline]
    #[must_use]
    pub fn with_options(mut self, options: IndexingOptions) -> Self {
        self.options = options;
        self
    }

    /// Bring the store up to date with every record under `source_dir`.
    ///
    /// Unchanged records are skipped without an embedding call. A record that cannot be
    /// read, normalized or embedded is logged and skipped; the pass continues. Storage
    /// failures and an embedding whose dimension disagrees with the index abort the
    /// pass before anything is persisted.
    #[inline]
    pub fn reindex_corpus(&self, source_dir: &Path) -> Result<IndexingStats> {
        let mut state = self.store.load_state()?;
        let repaired = !consistency::reconcile(&mut state)?.is_consistent;

        let sources = self.list_sources(source_dir)?;
        let live: BTreeSet<String> = sources.iter().map(|path| source_id(path)).collect();
        info!(
            "Indexing {} records from {}",
            sources.len(),
            source_dir.display()
        );

        let bar = self.progress_bar(sources.len());
        let mut stats = IndexingStats::default();

        for path in &sources {
            let source_id = source_id(path);
            bar.set_message(source_id.clone());
            stats.records_seen += 1;

            match self.process_source(&mut state, path, &source_id, &live) {
                Ok(Outcome::Skipped) => stats.records_skipped += 1,
                Ok(Outcome::Indexed { replaced }) => {
                    stats.records_indexed += 1;
                    if replaced {
                        stats.records_replaced += 1;
                    }
                }
                Ok(Outcome::Failed) => stats.records_failed += 1,
                Ok(Outcome::EmbeddingFailed) => stats.embedding_failures += 1,
                Err(e) => {
                    bar.abandon();
                    error!("Aborting indexing at {}: {}", source_id, e);
                    return Err(e);
                }
            }
            bar.inc(1);
        }
        bar.finish_and_clear();

        if repaired || stats.records_indexed > 0 || !self.store.metadata_path().exists() {
            self.store.persist(&state)?;
        } else {
            debug!("Nothing changed, leaving stored artifacts as they are");
        }
        info!("Indexing complete: {}", stats.summary());
        Ok(stats)
    }

    fn process_source(
        &self,
        state: &mut StoreState,
        path: &Path,
        source_id: &str,
        live: &BTreeSet<String>,
    ) -> Result<Outcome> {
        let bytes = match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!("Failed to read {}: {}", path.display(), e);
                return Ok(Outcome::Failed);
            }
        };

        let hash = content_hash(&bytes);
        if !state.fingerprints.needs_processing(source_id, &hash) {
            debug!("Unchanged, skipping {}", source_id);
            return Ok(Outcome::Skipped);
        }

        let chunk = match parse_record(&bytes) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Skipping {}: {}", source_id, e);
                return Ok(Outcome::Failed);
            }
        };

        let vector = match self.embedder.embed(&chunk.content) {
            Ok(vector) if !vector.is_empty() => vector,
            Ok(_) => {
                error!(
                    "Embedding service returned an empty vector for {} (product {})",
                    source_id, chunk.id
                );
                return Ok(Outcome::EmbeddingFailed);
            }
            Err(e) => {
                error!(
                    "Failed to embed {} (product {}): {}",
                    source_id, chunk.id, e
                );
                return Ok(Outcome::EmbeddingFailed);
            }
        };

        let mut index = match state.index.take() {
            Some(index) => index,
            None => {
                info!("Creating vector index with dimension {}", vector.len());
                VectorIndex::new(vector.len())?
            }
        };
        index.check_dimension(&vector)?;

        let product_id = chunk.id.to_string();
        let mut stale: BTreeSet<usize> =
            state.metadata.rows_for_doc(source_id).into_iter().collect();

        // the same product under a source that left the corpus was renamed or moved
        let moved_from: BTreeSet<String> = state
            .metadata
            .iter()
            .filter(|entry| {
                entry.product_id == product_id
                    && entry.doc != source_id
                    && !live.contains(&entry.doc)
            })
            .map(|entry| entry.doc.clone())
            .collect();
        for doc in &moved_from {
            info!("Product {} moved from {} to {}", product_id, doc, source_id);
            stale.extend(state.metadata.rows_for_doc(doc));
            state.fingerprints.remove(doc);
        }

        let replaced = !stale.is_empty();
        if replaced {
            debug!("Replacing {} stale rows for {}", stale.len(), source_id);
            index.remove_rows(&stale)?;
            state.metadata.remove_rows(&stale);
        }

        if let Some(other) = state
            .metadata
            .iter()
            .find(|entry| entry.product_id == product_id)
        {
            warn!(
                "Product {} from {} is already indexed from {}",
                product_id, source_id, other.doc
            );
        }

        index.add(&vector)?;
        state.index = Some(index);
        state
            .metadata
            .push(MetadataEntry::from_chunk(source_id, &chunk));
        state.fingerprints.record_processed(source_id, &hash);

        Ok(Outcome::Indexed { replaced })
    }

    /// Source files in a fixed order so an interrupted pass resumes predictably
    fn list_sources(&self, source_dir: &Path) -> Result<Vec<PathBuf>> {
        if !source_dir.exists() {
            warn!(
                "Corpus directory {} does not exist, nothing to index",
                source_dir.display()
            );
            return Ok(Vec::new());
        }

        let mut sources = Vec::new();
        for entry in fs::read_dir(source_dir)? {
            let path = entry?.path();
            let matches = path.is_file()
                && path
                    .extension()
                    .and_then(|ext| ext.to_str())
                    .is_some_and(|ext| ext.eq_ignore_ascii_case(&self.options.extension));
            if matches {
                sources.push(path);
            }
        }
        sources.sort();
        Ok(sources)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        let bar = if self.options.show_progress && console::user_attended_stderr() {
            ProgressBar::new(len as u64).with_style(
                ProgressStyle::with_template("{spinner} [{pos}/{len}] Indexing {msg}")
                    .expect("style template is valid"),
            )
        } else {
            ProgressBar::hidden()
        };
        bar.set_position(0);
        bar
    }
}

fn parse_record(bytes: &[u8]) -> Result<ProductChunk> {
    let raw: Value = serde_json::from_slice(bytes)
        .map_err(|e| CatalogError::Normalization(format!("invalid JSON: {}", e)))?;
    normalize(&raw)
}

fn source_id(path: &Path) -> String {
    path.file_name()
        .map_or_else(String::new, |name| name.to_string_lossy().into_owned())
}
