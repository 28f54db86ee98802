use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Normalized avatar/header/poster image set for one storefront
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreRecord {
    /// Storefront display name
    pub name: String,

    /// Platform storefront id
    pub id: String,

    /// Storefront avatar, resize directive removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,

    /// Storefront header banner, resize directive removed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header_url: Option<String>,

    /// Promotional posters in payload order, query string removed.
    /// `None` rather than an empty list when there are none.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_urls: Option<Vec<String>>,

    /// When this record was extracted
    pub update_time: DateTime<Utc>,
}

impl StoreRecord {
    /// Whether the record carries at least one image
    pub fn has_images(&self) -> bool {
        self.avatar_url.is_some()
            || self.header_url.is_some()
            || self.poster_urls.as_ref().is_some_and(|p| !p.is_empty())
    }

    /// Number of image URLs carried by the record
    pub fn image_count(&self) -> usize {
        self.avatar_url.iter().count()
            + self.header_url.iter().count()
            + self.poster_urls.as_ref().map_or(0, Vec::len)
    }
}

/// Identity of a product inside a collector.
///
/// Item-group payloads identify products by name while tag payloads use the
/// platform id. The two kinds never compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "lowercase")]
pub enum ProductKey {
    Name(String),
    Id(String),
}

impl fmt::Display for ProductKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProductKey::Name(name) => write!(f, "name:{}", name),
            ProductKey::Id(id) => write!(f, "id:{}", id),
        }
    }
}

/// Normalized single product image entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductRecord {
    pub id: String,
    pub name: String,
    pub image_url: String,

    /// Milliseconds since the Unix epoch
    pub timestamp: i64,

    /// Key used for deduplication
    pub key: ProductKey,
}
