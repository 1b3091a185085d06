// Consistency validation between the vector index, metadata list and fingerprints

#[cfg(test)]
mod tests;

use std::collections::BTreeSet;
use tracing::{info, warn};

use crate::Result;
use crate::store::StoreState;

/// Snapshot of how well the three stored artifacts agree
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsistencyReport {
    /// Rows in the vector index
    pub vectors: usize,
    /// Entries in the metadata list
    pub metadata_entries: usize,
    /// Entries in the fingerprint store
    pub fingerprints: usize,
    /// Fingerprinted sources with no metadata entry; these would never be retried
    pub orphaned_fingerprints: Vec<String>,
    /// Sources with a metadata entry but no fingerprint; they get reprocessed next run
    pub unfingerprinted_docs: Vec<String>,
    pub is_consistent: bool,
}

impl ConsistencyReport {
    #[inline]
    pub fn summary(&self) -> String {
        if self.is_consistent {
            format!(
                "Store is consistent: {} vectors, {} metadata entries, {} fingerprints",
                self.vectors, self.metadata_entries, self.fingerprints
            )
        } else {
            format!(
                "Store inconsistencies found: {} vectors vs {} metadata entries, {} orphaned fingerprints, {} unfingerprinted sources",
                self.vectors,
                self.metadata_entries,
                self.orphaned_fingerprints.len(),
                self.unfingerprinted_docs.len()
            )
        }
    }

    #[inline]
    pub fn total_issues(&self) -> usize {
        usize::from(self.vectors != self.metadata_entries)
            + self.orphaned_fingerprints.len()
            + self.unfingerprinted_docs.len()
    }
}

/// Compare the artifacts without changing them
#[inline]
pub fn check(state: &StoreState) -> ConsistencyReport {
    let docs: BTreeSet<&str> = state.metadata.iter().map(|e| e.doc.as_str()).collect();
    let fingerprinted: BTreeSet<&str> = state.fingerprints.source_ids().collect();

    let orphaned_fingerprints: Vec<String> = fingerprinted
        .difference(&docs)
        .map(|doc| (*doc).to_string())
        .collect();
    let unfingerprinted_docs: Vec<String> = docs
        .difference(&fingerprinted)
        .map(|doc| (*doc).to_string())
        .collect();

    let vectors = state.index_len();
    let metadata_entries = state.metadata.len();
    let is_consistent = vectors == metadata_entries
        && orphaned_fingerprints.is_empty()
        && unfingerprinted_docs.is_empty();

    ConsistencyReport {
        vectors,
        metadata_entries,
        fingerprints: state.fingerprints.len(),
        orphaned_fingerprints,
        unfingerprinted_docs,
        is_consistent,
    }
}

/// Repair a partially written store so indexing can resume from it.
///
/// Index and metadata are cut back to their common prefix, and any fingerprint that no
/// longer has a metadata entry is dropped so its source is embedded again. Returns the
/// report taken before repair.
#[inline]
pub fn reconcile(state: &mut StoreState) -> Result<ConsistencyReport> {
    let report = check(state);
    if report.is_consistent {
        return Ok(report);
    }
    log_consistency_issues(&report);

    if report.vectors == 0 && report.metadata_entries > 0 {
        warn!("Vector index is missing; discarding metadata and fingerprints to rebuild");
        state.metadata.clear();
        state.fingerprints.clear();
        state.index = None;
        return Ok(report);
    }

    if report.vectors != report.metadata_entries {
        let keep = report.vectors.min(report.metadata_entries);
        warn!(
            "Truncating vector index and metadata to their first {} aligned rows",
            keep
        );
        state.metadata.truncate(keep);
        if let Some(index) = state.index.as_mut() {
            index.truncate(keep)?;
        }
    }

    let docs: BTreeSet<String> = state.metadata.iter().map(|e| e.doc.clone()).collect();
    let orphaned: Vec<String> = state
        .fingerprints
        .source_ids()
        .filter(|id| !docs.contains(*id))
        .map(str::to_string)
        .collect();
    for source_id in &orphaned {
        state.fingerprints.remove(source_id);
    }
    if !orphaned.is_empty() {
        info!("Dropped {} fingerprints without an index row", orphaned.len());
    }

    Ok(report)
}

fn log_consistency_issues(report: &ConsistencyReport) {
    if report.vectors != report.metadata_entries {
        warn!(
            "Vector index has {} rows but metadata list has {} entries",
            report.vectors, report.metadata_entries
        );
    }

    if !report.orphaned_fingerprints.is_empty() {
        warn!(
            "Found {} fingerprints with no metadata entry",
            report.orphaned_fingerprints.len()
        );
    }

    if !report.unfingerprinted_docs.is_empty() {
        warn!(
            "Found {} metadata sources with no fingerprint",
            report.unfingerprinted_docs.len()
        );
    }
}
