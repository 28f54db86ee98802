//! Shape-tolerant extraction of image records from captured payloads.
//!
//! There is no schema registry. Each [`ExtractorKind`] sniffs for the fields
//! of one known payload shape and reports [`ExtractResult::NoMatch`] when they
//! are absent, so a chain of kinds can be tried in a fixed priority order.
//! Missing fields inside a matched shape degrade to defaults instead of
//! failing.

mod products;
mod storefront;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;

use crate::error::Result;
use crate::types::{ProductRecord, StoreRecord};

pub use products::{extract_item_groups, extract_spu_tags, UNKNOWN_PRODUCT_NAME};
pub use storefront::{extract_storefront, UNKNOWN_STORE_ID, UNKNOWN_STORE_NAME};

/// Known payload shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractorKind {
    /// `poi_info` / `poi_base_info` storefront payloads
    Storefront,
    /// `food_spu_tags[].dynamic_spus[]` product payloads, keyed by id
    ProductTags,
    /// `itemGroups[].items[]` product payloads with image hashes, keyed by name
    ProductGroups,
}

/// Chain used for storefront files
pub const STOREFRONT_CHAIN: &[ExtractorKind] = &[ExtractorKind::Storefront];

/// Chain used for product files
pub const PRODUCT_CHAIN: &[ExtractorKind] =
    &[ExtractorKind::ProductTags, ExtractorKind::ProductGroups];

/// Inputs shared by every extractor for one run
#[derive(Debug, Clone)]
pub struct ExtractContext {
    /// Host used to expand image hashes
    pub cdn_host: String,
    /// Timestamp stamped on every record produced by the run
    pub now: DateTime<Utc>,
}

impl ExtractContext {
    pub fn new(cdn_host: impl Into<String>) -> Self {
        Self {
            cdn_host: cdn_host.into(),
            now: Utc::now(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub(crate) fn now_millis(&self) -> i64 {
        self.now.timestamp_millis()
    }
}

/// Products found by one run of a product extractor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProductBatch {
    pub kind: ExtractorKind,
    /// Entries examined, including skipped ones
    pub scanned: usize,
    pub records: Vec<ProductRecord>,
}

/// Output of a matched extractor
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", content = "result", rename_all = "snake_case")]
pub enum Extraction {
    Storefront(StoreRecord),
    Products(ProductBatch),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ExtractResult {
    Matched(Extraction),
    NoMatch,
}

impl ExtractResult {
    pub fn matched(self) -> Option<Extraction> {
        match self {
            ExtractResult::Matched(extraction) => Some(extraction),
            ExtractResult::NoMatch => None,
        }
    }
}

impl ExtractorKind {
    /// Run this extractor against a parsed document
    pub fn extract(self, doc: &Value, ctx: &ExtractContext) -> ExtractResult {
        let extraction = match self {
            ExtractorKind::Storefront => extract_storefront(doc, ctx).map(Extraction::Storefront),
            ExtractorKind::ProductTags => extract_spu_tags(doc, ctx).map(Extraction::Products),
            ExtractorKind::ProductGroups => {
                extract_item_groups(doc, ctx).map(Extraction::Products)
            }
        };

        match extraction {
            Some(extraction) => ExtractResult::Matched(extraction),
            None => ExtractResult::NoMatch,
        }
    }
}

/// Try each kind of `chain` in order; the first match wins
pub fn extract_with(doc: &Value, chain: &[ExtractorKind], ctx: &ExtractContext) -> ExtractResult {
    for kind in chain {
        if let ExtractResult::Matched(extraction) = kind.extract(doc, ctx) {
            log::debug!("Payload matched {:?} extractor", kind);
            return ExtractResult::Matched(extraction);
        }
    }
    ExtractResult::NoMatch
}

/// Parse a captured payload
pub fn parse_document(content: &str) -> Result<Value> {
    Ok(serde_json::from_str(content)?)
}

// -- Tolerant field access shared by the extractors --

/// String field, or "" when absent, null or not textual.
/// Numbers are rendered the way they appear in the payload.
pub(crate) fn text_field(value: &Value, key: &str) -> String {
    match value.get(key) {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Integer field, accepting numbers or numeric strings
pub(crate) fn int_field(value: &Value, key: &str) -> Option<i64> {
    match value.get(key)? {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Array field, or an empty slice
pub(crate) fn array_field<'a>(value: &'a Value, key: &str) -> &'a [Value] {
    value
        .get(key)
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// `Some(s)` unless `s` is empty
pub(crate) fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
