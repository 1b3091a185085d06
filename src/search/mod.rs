// Search module
// Nearest-neighbor lookup over the indexed catalog, joined back to product metadata


use std::path::Path;
use tracing::{debug, error, info, warn};

use crate::catalog::ProductChunk;
use crate::embeddings::EmbeddingProvider;
use crate::indexer::{IndexingOptions, IndexingPipeline, IndexingStats};
use crate::store::RetrievalStore;
use crate::Result;

/// What [`QueryPipeline::ensure_ready`] found
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Readiness {
    /// Index and metadata were already on disk
    Present,
    /// They were missing and a full corpus pass was run
    Built(IndexingStats),
}

/// One search result with its distance to the query
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    pub chunk: ProductChunk,
    pub distance: f32,
}

pub struct QueryPipeline<'a, E> {
    store: &'a RetrievalStore,
    embedder: &'a E,
    corpus_dir: &'a Path,
    indexing: IndexingOptions,
}

impl<'a, E: EmbeddingProvider> QueryPipeline<'a, E> {
    #[inline]
    pub fn new(store: &'a RetrievalStore, embedder: &'a E, corpus_dir: &'a Path) -> Self {
        Self {
            store,
            embedder,
            corpus_dir,
            indexing: IndexingOptions::default(),
        }
    }

    /// Options for the corpus pass run by [`Self::ensure_ready`]
    #[inline]
    #[must_use]
    pub fn with_indexing_options(mut self, options: IndexingOptions) -> Self {
        self.indexing = options;
        self
    }

    /// Build the index from the corpus if it is not on disk yet
    #[inline]
    pub fn ensure_ready(&self) -> Result<Readiness> {
        if self.store.index_exists() {
            return Ok(Readiness::Present);
        }

        info!(
            "No index found in {}, indexing {}",
            self.store.root().display(),
            self.corpus_dir.display()
        );
        let stats = IndexingPipeline::new(self.store, self.embedder)
            .with_options(self.indexing.clone())
            .reindex_corpus(self.corpus_dir)?;
        Ok(Readiness::Built(stats))
    }

    /// Up to `k` products nearest to `query`, closest first.
    ///
    /// The query text goes to the embedder unchanged; empty or whitespace-only text
    /// is embedded like any other string.
    #[inline]
    pub fn try_search(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        if k == 0 {
            return Ok(Vec::new());
        }

        self.ensure_ready()?;

        let Some(index) = self.store.load_index()? else {
            debug!("Index holds no vectors, returning no results");
            return Ok(Vec::new());
        };
        let metadata = self.store.load_metadata()?;

        let query_vector = self.embedder.embed(query)?;
        let neighbors = index.search(&query_vector, k)?;

        let mut hits = Vec::with_capacity(neighbors.len());
        for neighbor in neighbors {
            let Some(entry) = metadata.get(neighbor.row) else {
                warn!(
                    "Dropping result row {} beyond metadata length {}; index and metadata are out of sync",
                    neighbor.row,
                    metadata.len()
                );
                continue;
            };
            hits.push(SearchHit {
                chunk: entry.to_chunk()?,
                distance: neighbor.distance,
            });
        }

        debug!("Query {:?} matched {} products", query, hits.len());
        Ok(hits)
    }

    /// Like [`Self::try_search`], but any failure is logged and yields no results
    #[inline]
    pub fn search(&self, query: &str, k: usize) -> Vec<ProductChunk> {
        match self.try_search(query, k) {
            Ok(hits) => hits.into_iter().map(|hit| hit.chunk).collect(),
            Err(e) => {
                error!("Search failed for {:?}: {}", query, e);
                Vec::new()
            }
        }
    }
}
