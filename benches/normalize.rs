use catalog_mcp::catalog::{clean_text, normalize};
use catalog_mcp::store::VectorIndex;
use criterion::{Criterion, criterion_group, criterion_main};
use serde_json::json;
use std::hint::black_box;

const DESCRIPTION: &str = "<p>Soft <strong>cotton</strong> polo with a ribbed collar&nbsp;&amp; \
    two-button placket.</p><ul><li>Regular fit</li><li>Machine wash&#39;s friendly</li></ul>\
    <br/>Material &ndash; 100% cotton &copy; brand";

pub fn criterion_benchmark(c: &mut Criterion) {
    let record = json!({
        "data": {
            "id": 15970,
            "productDisplayName": "Turtle Check Men Navy Blue Shirt",
            "brandName": "Turtle",
            "baseColour": "Navy Blue",
            "gender": "Men",
            "season": "Fall",
            "year": "2011",
            "usage": "Casual",
            "price": 1499,
            "articleType": {"typeName": "Shirts"},
            "subCategory": {"typeName": "Topwear"},
            "masterCategory": {"typeName": "Apparel"},
            "productDescriptors": {"description": {"value": DESCRIPTION}}
        }
    });

    c.bench_function("clean_text", |b| b.iter(|| clean_text(black_box(DESCRIPTION))));
    c.bench_function("normalize", |b| b.iter(|| normalize(black_box(&record))));

    let dimension = 64;
    let mut index = VectorIndex::new(dimension).expect("dimension is positive");
    let mut vector = vec![0.0_f32; dimension];
    for row in 0..2_000_u16 {
        vector[usize::from(row) % dimension] = f32::from(row);
        index.add(&vector).expect("dimension matches");
    }
    let query = vec![1.0_f32; dimension];
    c.bench_function("vector_search", |b| {
        b.iter(|| index.search(black_box(&query), black_box(10)))
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
