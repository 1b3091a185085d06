// Catalog module
// Product records and their normalized, embeddable form

pub mod normalizer;

use serde::{Deserialize, Serialize};

pub use normalizer::{clean_text, normalize};

/// Flat structured attributes of one product.
///
/// Every attribute except `id` may be absent in a source record and is then `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductMetadata {
    pub id: i64,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub discounted_price: Option<f64>,
    #[serde(default)]
    pub style_type: Option<String>,
    #[serde(default)]
    pub product_type_id: Option<i64>,
    #[serde(default)]
    pub article_number: Option<String>,
    #[serde(default)]
    pub product_display_name: Option<String>,
    #[serde(default)]
    pub variant_name: Option<String>,
    #[serde(default)]
    pub myntra_rating: Option<f64>,
    #[serde(default)]
    pub catalog_add_date: Option<i64>,
    #[serde(default)]
    pub brand_name: Option<String>,
    #[serde(default)]
    pub age_group: Option<String>,
    #[serde(default)]
    pub gender: Option<String>,
    #[serde(default)]
    pub base_colour: Option<String>,
    #[serde(default)]
    pub colour1: Option<String>,
    #[serde(default)]
    pub colour2: Option<String>,
    #[serde(default)]
    pub fashion_type: Option<String>,
    #[serde(default)]
    pub season: Option<String>,
    #[serde(default)]
    pub year: Option<String>,
    #[serde(default)]
    pub usage: Option<String>,
    #[serde(default)]
    pub vat: Option<f64>,
    #[serde(default)]
    pub display_categories: Option<String>,
}

impl ProductMetadata {
    /// Metadata with only the mandatory identifier set
    #[inline]
    pub fn with_id(id: i64) -> Self {
        Self {
            id,
            price: None,
            discounted_price: None,
            style_type: None,
            product_type_id: None,
            article_number: None,
            product_display_name: None,
            variant_name: None,
            myntra_rating: None,
            catalog_add_date: None,
            brand_name: None,
            age_group: None,
            gender: None,
            base_colour: None,
            colour1: None,
            colour2: None,
            fashion_type: None,
            season: None,
            year: None,
            usage: None,
            vat: None,
            display_categories: None,
        }
    }
}

/// The unit of indexing: one product's searchable text plus its metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProductChunk {
    pub id: i64,
    pub content: String,
    pub metadata: ProductMetadata,
}
