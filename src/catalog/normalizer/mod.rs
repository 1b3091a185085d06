
use fancy_regex::Regex;
use serde_json::{Map, Value};
use std::sync::LazyLock;
use tracing::debug;

use super::{ProductChunk, ProductMetadata};
use crate::{CatalogError, Result};

static HTML_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#\d+;").expect("valid regex"));
static NAMED_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&[a-zA-Z0-9]+;").expect("valid regex"));
static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("valid regex"));

/// Entities decoded by [`clean_text`]; any other entity reference is dropped.
/// `&amp;` goes first so double-escaped references decode one level only.
const HTML_ENTITIES: &[(&str, &str)] = &[
    ("&nbsp;", " "),
    ("&amp;", "&"),
    ("&lt;", "<"),
    ("&gt;", ">"),
    ("&quot;", "\""),
    ("&#39;", "'"),
    ("&ndash;", "-"),
    ("&mdash;", "-"),
    ("&bull;", "•"),
];

/// Strip HTML tags, decode the common entities, drop the rest and collapse whitespace
#[inline]
pub fn clean_text(text: &str) -> String {
    if text.is_empty() {
        return String::new();
    }

    let mut cleaned = HTML_TAG.replace_all(text, " ").into_owned();

    for &(entity, replacement) in HTML_ENTITIES {
        if cleaned.contains(entity) {
            cleaned = cleaned.replace(entity, replacement);
        }
    }

    let cleaned = NUMERIC_ENTITY.replace_all(&cleaned, "");
    let cleaned = NAMED_ENTITY.replace_all(&cleaned, "");
    let cleaned = WHITESPACE.replace_all(&cleaned, " ");

    cleaned.trim().to_string()
}

/// Convert one raw product document into a [`ProductChunk`].
///
/// The document's `data` object carries the product. Only a missing or non-numeric
/// `id` is an error; every other absent or oddly typed field becomes empty text in
/// the content and `None` in the metadata.
#[inline]
pub fn normalize(raw: &Value) -> Result<ProductChunk> {
    let empty = Map::new();
    let data = raw.get("data").and_then(Value::as_object).unwrap_or(&empty);

    let id = data.get("id").and_then(as_i64).ok_or_else(|| {
        CatalogError::Normalization("product record is missing a numeric `id`".to_string())
    })?;

    let display_name = clean_text(text_field(data, "productDisplayName").as_deref().unwrap_or(""));
    let display_categories =
        clean_text(text_field(data, "displayCategories").as_deref().unwrap_or(""));

    let content = format!(
        "productDisplayName: {display_name}. \
         displayCategories: {display_categories}. \
         Product Descriptors: {}. \
         Article Attributes: {}. \
         Master Category: {}. \
         Sub Category: {}. \
         Article Type: {}.",
        descriptors(data.get("productDescriptors")),
        flatten_attributes(data.get("articleAttributes"), false),
        flatten_attributes(data.get("masterCategory"), true),
        flatten_attributes(data.get("subCategory"), true),
        flatten_attributes(data.get("articleType"), true),
    );

    debug!("Normalized product {} ({} chars)", id, content.len());

    Ok(ProductChunk {
        id,
        content,
        metadata: extract_metadata(id, data),
    })
}

fn extract_metadata(id: i64, data: &Map<String, Value>) -> ProductMetadata {
    let number = |key: &str| data.get(key).and_then(as_f64);
    let integer = |key: &str| data.get(key).and_then(as_i64);
    let text = |key: &str| text_field(data, key);

    ProductMetadata {
        id,
        price: number("price"),
        discounted_price: number("discountedPrice"),
        style_type: text("styleType"),
        product_type_id: integer("productTypeId"),
        article_number: text("articleNumber"),
        product_display_name: text("productDisplayName"),
        variant_name: text("variantName"),
        myntra_rating: number("myntraRating"),
        catalog_add_date: integer("catalogAddDate"),
        brand_name: text("brandName"),
        age_group: text("ageGroup"),
        gender: text("gender"),
        base_colour: text("baseColour"),
        colour1: text("colour1"),
        colour2: text("colour2"),
        fashion_type: text("fashionType"),
        season: text("season"),
        year: text("year"),
        usage: text("usage"),
        vat: number("vat"),
        display_categories: text("displayCategories"),
    }
}

/// `"key: value"` pairs joined by `", "`. Nulls are skipped, and nested objects too when
/// `skip_nested` is set (category objects carry nested display metadata).
fn flatten_attributes(value: Option<&Value>, skip_nested: bool) -> String {
    let Some(object) = value.and_then(Value::as_object) else {
        return String::new();
    };

    object
        .iter()
        .filter(|(_, v)| !v.is_null() && !(skip_nested && v.is_object()))
        .map(|(key, v)| format!("{}: {}", key, clean_text(&render(v))))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Descriptors are objects of the form `{"descriptorType": {"value": "<p>html</p>", ...}}`;
/// entries whose value cleans down to nothing are left out.
fn descriptors(value: Option<&Value>) -> String {
    let Some(object) = value.and_then(Value::as_object) else {
        return String::new();
    };

    object
        .iter()
        .filter_map(|(key, descriptor)| {
            let text = clean_text(&render(descriptor.as_object()?.get("value")?));
            (!text.is_empty()).then(|| format!("{}: {}", key, text))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn text_field(data: &Map<String, Value>, key: &str) -> Option<String> {
    match data.get(key)? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn as_i64(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| {
            n.as_f64()
                .filter(|f| f.fract() == 0.0 && f.abs() < i64::MAX as f64)
                .map(|f| f as i64)
        }),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
