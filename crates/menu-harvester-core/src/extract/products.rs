use rand::Rng;
use serde_json::Value;

use super::{array_field, int_field, non_empty, text_field, ExtractContext, ExtractorKind, ProductBatch};
use crate::image_url::{hash_to_url, remove_size_params};
use crate::types::{ProductKey, ProductRecord};

pub const UNKNOWN_PRODUCT_NAME: &str = "未知商品";

/// `itemType` of placeholder entries that carry no product
const PLACEHOLDER_ITEM_TYPE: i64 = -1;

const ID_SUFFIX_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// Extract products from `data.food_spu_tags[].dynamic_spus[]`.
///
/// Records are keyed by the platform id. Entries without a picture are
/// counted as scanned but produce nothing.
pub fn extract_spu_tags(doc: &Value, ctx: &ExtractContext) -> Option<ProductBatch> {
    let tags = doc
        .get("data")
        .map(|data| array_field(data, "food_spu_tags"))
        .filter(|tags| !tags.is_empty())?;

    let timestamp = ctx.now_millis();
    let mut scanned = 0;
    let mut records = Vec::new();

    for tag in tags {
        let spus = array_field(tag, "dynamic_spus");
        scanned += spus.len();

        for spu in spus {
            let picture = text_field(spu, "picture");
            if picture.is_empty() {
                continue;
            }

            let name = non_empty(text_field(spu, "name"))
                .unwrap_or_else(|| UNKNOWN_PRODUCT_NAME.to_string());
            let id = non_empty(text_field(spu, "id")).unwrap_or_else(|| timestamp.to_string());

            records.push(ProductRecord {
                key: ProductKey::Id(id.clone()),
                id,
                name,
                image_url: remove_size_params(&picture),
                timestamp,
            });
        }
    }

    Some(ProductBatch {
        kind: ExtractorKind::ProductTags,
        scanned,
        records,
    })
}

/// Extract products from `itemGroups[].items[]`, under `data` or at the root.
///
/// Images are expanded from `imageHash`. Records are keyed by name and get a
/// fresh synthetic id on every run.
pub fn extract_item_groups(doc: &Value, ctx: &ExtractContext) -> Option<ProductBatch> {
    let groups = doc
        .get("data")
        .map(|data| array_field(data, "itemGroups"))
        .filter(|groups| !groups.is_empty())
        .or_else(|| Some(array_field(doc, "itemGroups")).filter(|groups| !groups.is_empty()))?;

    let timestamp = ctx.now_millis();
    let mut rng = rand::thread_rng();
    let mut scanned = 0;
    let mut records = Vec::new();

    for group in groups {
        let items = array_field(group, "items");
        scanned += items.len();

        for item in items {
            if int_field(item, "itemType") == Some(PLACEHOLDER_ITEM_TYPE) {
                continue;
            }

            let name = text_field(item, "name");
            let hash = text_field(item, "imageHash");
            if name.is_empty() || hash.is_empty() {
                continue;
            }

            let image_url = hash_to_url(&hash, &ctx.cdn_host);
            if image_url.is_empty() {
                log::debug!("Skipping {}: image hash too short", name);
                continue;
            }

            records.push(ProductRecord {
                id: synthetic_id(&name, timestamp, &mut rng),
                key: ProductKey::Name(name.clone()),
                name,
                image_url,
                timestamp,
            });
        }
    }

    Some(ProductBatch {
        kind: ExtractorKind::ProductGroups,
        scanned,
        records,
    })
}

fn synthetic_id(name: &str, timestamp: i64, rng: &mut impl Rng) -> String {
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_SUFFIX_ALPHABET[rng.gen_range(0..ID_SUFFIX_ALPHABET.len())] as char)
        .collect();
    format!("{}_{}_{}", name, timestamp, suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn ctx() -> ExtractContext {
        ExtractContext::new("cube.elemecdn.com")
            .at(chrono::Utc.timestamp_millis_opt(1_700_000_000_000).unwrap())
    }

    #[test]
    fn test_item_groups_skip_placeholders() {
        let doc = json!({
            "data": {
                "itemGroups": [{
                    "items": [
                        { "itemType": -1, "name": "分组标题", "imageHash": "abcdef123png" },
                        { "itemType": 0, "name": "招牌面", "imageHash": "0a1b2c3d4e5png" }
                    ]
                }]
            }
        });

        let batch = extract_item_groups(&doc, &ctx()).unwrap();
        assert_eq!(batch.scanned, 2);
        assert_eq!(batch.records.len(), 1);

        let record = &batch.records[0];
        assert_eq!(record.name, "招牌面");
        assert_eq!(record.key, ProductKey::Name("招牌面".to_string()));
        assert_eq!(
            record.image_url,
            "https://cube.elemecdn.com/0/a1/b2c3d4e5png.png"
        );
        assert_eq!(record.timestamp, 1_700_000_000_000);
    }

    #[test]
    fn test_item_groups_skip_missing_name_or_hash() {
        let doc = json!({
            "itemGroups": [{
                "items": [
                    { "name": "", "imageHash": "abcdef123" },
                    { "name": "无图" },
                    { "imageHash": "abcdef123" },
                    { "name": "短", "imageHash": "abc" }
                ]
            }]
        });

        let batch = extract_item_groups(&doc, &ctx()).unwrap();
        assert_eq!(batch.scanned, 4);
        assert!(batch.records.is_empty());
    }

    #[test]
    fn test_item_groups_fresh_id_per_occurrence() {
        let doc = json!({
            "data": { "itemGroups": [
                { "items": [{ "name": "面", "imageHash": "abcdef123" }] },
                { "items": [{ "name": "面", "imageHash": "abcdef123" }] }
            ]}
        });

        let batch = extract_item_groups(&doc, &ctx()).unwrap();
        assert_eq!(batch.records.len(), 2);
        assert_ne!(batch.records[0].id, batch.records[1].id);
        assert!(batch.records[0].id.starts_with("面_1700000000000_"));
        assert_eq!(batch.records[0].key, batch.records[1].key);
    }

    #[test]
    fn test_item_groups_no_match_without_groups() {
        assert!(extract_item_groups(&json!({ "data": { "itemGroups": [] } }), &ctx()).is_none());
        assert!(extract_item_groups(&json!({ "data": {} }), &ctx()).is_none());
    }

    #[test]
    fn test_spu_tags_keyed_by_id() {
        let doc = json!({
            "data": {
                "food_spu_tags": [
                    { "dynamic_spus": [
                        { "id": 101, "name": "牛肉面", "picture": "http://p/1.jpg@300w_300h_1e_1c" },
                        { "id": "102", "name": "无图商品", "picture": "" }
                    ]},
                    { "dynamic_spus": [
                        { "name": "无名ID", "picture": "http://p/3.jpg" },
                        { "id": 104, "picture": "http://p/4.jpg" }
                    ]},
                    {}
                ]
            }
        });

        let batch = extract_spu_tags(&doc, &ctx()).unwrap();
        assert_eq!(batch.kind, ExtractorKind::ProductTags);
        assert_eq!(batch.scanned, 4);
        assert_eq!(batch.records.len(), 3);

        assert_eq!(batch.records[0].id, "101");
        assert_eq!(batch.records[0].key, ProductKey::Id("101".to_string()));
        assert_eq!(batch.records[0].image_url, "http://p/1.jpg");

        // Missing id falls back to the run timestamp
        assert_eq!(batch.records[1].id, "1700000000000");
        assert_eq!(batch.records[2].name, UNKNOWN_PRODUCT_NAME);
    }

    #[test]
    fn test_spu_tags_no_match_when_empty() {
        assert!(extract_spu_tags(&json!({ "data": { "food_spu_tags": [] } }), &ctx()).is_none());
        assert!(extract_spu_tags(&json!({ "food_spu_tags": [{}] }), &ctx()).is_none());
    }
}
