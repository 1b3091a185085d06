use super::*;
use serde_json::json;
use tempfile::TempDir;

fn entry(doc: &str, product_id: i64) -> MetadataEntry {
    MetadataEntry {
        doc: doc.to_string(),
        chunk: format!("productDisplayName: Product {}.", product_id),
        product_id: product_id.to_string(),
        metadata: ProductMetadata {
            brand_name: Some("Puma".to_string()),
            price: Some(1299.0),
            ..ProductMetadata::with_id(product_id)
        },
    }
}

#[test]
fn entry_from_chunk_and_back() {
    let chunk = ProductChunk {
        id: 15970,
        content: "productDisplayName: Turtle Check Men Navy Blue Shirt.".to_string(),
        metadata: ProductMetadata::with_id(15970),
    };

    let entry = MetadataEntry::from_chunk("15970.json", &chunk);
    assert_eq!(entry.doc, "15970.json");
    assert_eq!(entry.product_id, "15970");
    assert_eq!(entry.to_chunk().expect("should rebuild chunk"), chunk);
}

#[test]
fn invalid_product_id_is_corruption() {
    let mut broken = entry("a.json", 1);
    broken.product_id = "one".to_string();
    assert!(matches!(
        broken.to_chunk(),
        Err(CatalogError::IndexCorruption(_))
    ));
}

#[test]
fn metadata_is_persisted_as_nested_object() {
    let mut list = MetadataList::default();
    list.push(entry("a.json", 1));

    let value = serde_json::to_value(&list).expect("should serialize");
    assert_eq!(value[0]["doc"], "a.json");
    assert_eq!(value[0]["product_id"], "1");
    assert_eq!(value[0]["metadata"]["brandName"], "Puma");
    assert!(value[0]["metadata"].is_object());
}

#[test]
fn legacy_string_encoded_metadata_is_accepted() {
    let legacy = json!([{
        "doc": "7.json",
        "chunk": "productDisplayName: Legacy.",
        "product_id": "7",
        "metadata": "{\"id\": 7, \"brandName\": \"Adidas\", \"price\": 999}"
    }]);

    let list: MetadataList = serde_json::from_value(legacy).expect("legacy list should parse");
    let metadata = &list.get(0).expect("one entry").metadata;
    assert_eq!(metadata.id, 7);
    assert_eq!(metadata.brand_name.as_deref(), Some("Adidas"));
    assert_eq!(metadata.price, Some(999.0));
    assert_eq!(metadata.season, None);
}

#[test]
fn remove_rows_keeps_order() {
    let mut list = MetadataList::default();
    for id in 0..5 {
        list.push(entry(&format!("{}.json", id), id));
    }

    list.remove_rows(&BTreeSet::from([1, 3]));

    let ids: Vec<&str> = list.iter().map(|e| e.product_id.as_str()).collect();
    assert_eq!(ids, vec!["0", "2", "4"]);
}

#[test]
fn rows_for_doc_finds_all_matches() {
    let mut list = MetadataList::default();
    list.push(entry("a.json", 1));
    list.push(entry("b.json", 2));
    list.push(entry("a.json", 3));

    assert_eq!(list.rows_for_doc("a.json"), vec![0, 2]);
    assert!(list.rows_for_doc("c.json").is_empty());
}

#[test]
fn save_and_load_round_trip() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("metadata.json");

    let mut list = MetadataList::default();
    list.push(entry("a.json", 1));
    list.push(entry("b.json", 2));
    list.save(&path).expect("should save");

    let loaded = MetadataList::load(&path).expect("should load");
    assert_eq!(loaded, list);
}

#[test]
fn missing_file_is_empty_but_garbage_is_corruption() {
    let temp_dir = TempDir::new().expect("should create temp dir");
    let path = temp_dir.path().join("metadata.json");

    assert!(MetadataList::load(&path).expect("missing is empty").is_empty());

    std::fs::write(&path, "[{\"doc\": ").expect("should write");
    assert!(matches!(
        MetadataList::load(&path),
        Err(CatalogError::IndexCorruption(_))
    ));
}
