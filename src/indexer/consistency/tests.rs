use super::*;
use crate::catalog::{ProductChunk, ProductMetadata};
use crate::store::{MetadataEntry, VectorIndex};

fn entry(doc: &str, id: i64) -> MetadataEntry {
    MetadataEntry::from_chunk(
        doc,
        &ProductChunk {
            id,
            content: format!("productDisplayName: Product {}.", id),
            metadata: ProductMetadata::with_id(id),
        },
    )
}

/// A store with `vectors` index rows and one metadata entry + fingerprint per doc
fn state_with(vectors: usize, docs: &[&str]) -> StoreState {
    let mut state = StoreState::default();
    if vectors > 0 {
        let mut index = VectorIndex::new(2).expect("should create index");
        for _ in 0..vectors {
            index.add(&[1.0, 2.0]).expect("should add");
        }
        state.index = Some(index);
    }
    for (id, doc) in (1_i64..).zip(docs) {
        state.metadata.push(entry(doc, id));
        state.fingerprints.record_processed(doc, "hash");
    }
    state
}

#[test]
fn aligned_store_is_consistent() {
    let mut state = state_with(2, &["a.json", "b.json"]);
    let report = reconcile(&mut state).expect("should reconcile");

    assert!(report.is_consistent);
    assert_eq!(report.total_issues(), 0);
    assert!(report.summary().contains("Store is consistent"));
    assert_eq!(state.metadata.len(), 2);
    assert_eq!(state.fingerprints.len(), 2);
}

#[test]
fn empty_store_is_consistent() {
    let report = check(&StoreState::default());
    assert!(report.is_consistent);
    assert_eq!(report.vectors, 0);
}

#[test]
fn missing_index_resets_everything() {
    let mut state = state_with(0, &["a.json", "b.json"]);
    let report = reconcile(&mut state).expect("should reconcile");

    assert!(!report.is_consistent);
    assert_eq!(report.metadata_entries, 2);
    assert!(state.metadata.is_empty());
    assert!(state.fingerprints.is_empty());
    assert!(state.index.is_none());
}

#[test]
fn longer_metadata_is_truncated_and_fingerprints_follow() {
    let mut state = state_with(2, &["a.json", "b.json", "c.json"]);
    let report = reconcile(&mut state).expect("should reconcile");

    assert_eq!(report.vectors, 2);
    assert_eq!(report.metadata_entries, 3);
    assert_eq!(state.metadata.len(), 2);
    assert_eq!(state.index_len(), 2);
    assert_eq!(state.fingerprints.get("c.json"), None);
    assert!(state.fingerprints.get("a.json").is_some());
    assert!(check(&state).is_consistent);
}

#[test]
fn longer_index_is_truncated() {
    let mut state = state_with(4, &["a.json", "b.json"]);
    reconcile(&mut state).expect("should reconcile");

    assert_eq!(state.index_len(), 2);
    assert_eq!(state.metadata.len(), 2);
    assert!(check(&state).is_consistent);
}

#[test]
fn index_without_metadata_is_emptied() {
    let mut state = state_with(3, &[]);
    let report = reconcile(&mut state).expect("should reconcile");

    assert_eq!(report.vectors, 3);
    assert_eq!(state.index_len(), 0);
    assert!(state.metadata.is_empty());
    assert!(check(&state).is_consistent);
}

#[test]
fn orphaned_fingerprints_are_dropped() {
    let mut state = state_with(1, &["a.json"]);
    state.fingerprints.record_processed("ghost.json", "hash");

    let report = reconcile(&mut state).expect("should reconcile");
    assert_eq!(report.orphaned_fingerprints, vec!["ghost.json".to_string()]);
    assert_eq!(state.fingerprints.len(), 1);
    assert!(check(&state).is_consistent);
}

#[test]
fn unfingerprinted_docs_are_reported_but_kept() {
    let mut state = state_with(2, &["a.json", "b.json"]);
    state.fingerprints.remove("b.json");

    let report = reconcile(&mut state).expect("should reconcile");
    assert_eq!(report.unfingerprinted_docs, vec!["b.json".to_string()]);
    assert_eq!(report.total_issues(), 1);
    assert!(report.summary().contains("1 unfingerprinted sources"));
    assert_eq!(state.metadata.len(), 2);
}
