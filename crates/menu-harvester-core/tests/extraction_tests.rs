mod common;

use chrono::{TimeZone, Utc};
use serde_json::json;

use common::{item_group_payload, spu_payload, storefront_payload};
use menu_harvester_core::collector::ProductCollector;
use menu_harvester_core::extract::{
    extract_with, parse_document, ExtractContext, ExtractResult, Extraction, ExtractorKind,
    PRODUCT_CHAIN, STOREFRONT_CHAIN,
};
use menu_harvester_core::{ProductKey, DEFAULT_CDN_HOST};

fn ctx_at(millis: i64) -> ExtractContext {
    ExtractContext::new(DEFAULT_CDN_HOST).at(Utc.timestamp_millis_opt(millis).unwrap())
}

fn products(content: &str, millis: i64) -> (ExtractorKind, usize, Vec<menu_harvester_core::ProductRecord>) {
    let doc = parse_document(content).unwrap();
    match extract_with(&doc, PRODUCT_CHAIN, &ctx_at(millis)) {
        ExtractResult::Matched(Extraction::Products(batch)) => (batch.kind, batch.scanned, batch.records),
        other => panic!("expected products, got {:?}", other),
    }
}

#[test]
fn test_storefront_payload_end_to_end() {
    let doc = parse_document(&storefront_payload("Noodle House", "123")).unwrap();
    let record = match extract_with(&doc, STOREFRONT_CHAIN, &ctx_at(0)) {
        ExtractResult::Matched(Extraction::Storefront(record)) => record,
        other => panic!("expected storefront, got {:?}", other),
    };

    assert_eq!(record.name, "Noodle House");
    assert_eq!(record.id, "123");
    assert_eq!(record.avatar_url.as_deref(), Some("https://img.example.com/123/avatar.jpg"));
    assert_eq!(record.header_url.as_deref(), Some("https://img.example.com/123/head.jpg"));
    assert_eq!(
        record.poster_urls,
        Some(vec![
            "https://img.example.com/123/poster1.jpg".to_string(),
            "https://img.example.com/123/poster2.jpg".to_string(),
        ])
    );
}

#[test]
fn test_storefront_record_serializes_camel_case() {
    let doc = parse_document(&storefront_payload("A", "1")).unwrap();
    let extraction = extract_with(&doc, STOREFRONT_CHAIN, &ctx_at(0)).matched().unwrap();

    let value = serde_json::to_value(&extraction).unwrap();
    assert_eq!(value["type"], "storefront");
    assert_eq!(value["result"]["avatarUrl"], "https://img.example.com/1/avatar.jpg");
    assert_eq!(value["result"]["updateTime"], "1970-01-01T00:00:00Z");
}

#[test]
fn test_tag_payload_is_tried_before_item_groups() {
    let mut doc = json!({
        "data": {
            "food_spu_tags": [ { "dynamic_spus": [ { "id": 1, "name": "Tea", "picture": "http://x/t.jpg" } ] } ],
            "itemGroups": [ { "items": [ { "name": "Cake", "imageHash": "abcdef1234png" } ] } ]
        }
    });
    let extraction = extract_with(&doc, PRODUCT_CHAIN, &ctx_at(0)).matched().unwrap();
    let Extraction::Products(batch) = extraction else { panic!("expected products") };
    assert_eq!(batch.kind, ExtractorKind::ProductTags);

    // An empty tag list falls through to the item groups
    doc["data"]["food_spu_tags"] = json!([]);
    let extraction = extract_with(&doc, PRODUCT_CHAIN, &ctx_at(0)).matched().unwrap();
    let Extraction::Products(batch) = extraction else { panic!("expected products") };
    assert_eq!(batch.kind, ExtractorKind::ProductGroups);
    assert_eq!(
        batch.records[0].image_url,
        "https://cube.elemecdn.com/a/bc/def1234png.png"
    );
}

#[test]
fn test_storefront_only_payload_is_not_products() {
    let doc = parse_document(&storefront_payload("A", "1")).unwrap();
    assert_eq!(extract_with(&doc, PRODUCT_CHAIN, &ctx_at(0)), ExtractResult::NoMatch);
}

#[test]
fn test_tag_products_keyed_by_id() {
    let (kind, scanned, records) = products(
        &spu_payload(&[
            ("11", "Fried Rice", "http://x/rice.jpg@300w_300h_1e_1c"),
            ("12", "No Picture", ""),
        ]),
        5_000,
    );

    assert_eq!(kind, ExtractorKind::ProductTags);
    assert_eq!(scanned, 2);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].key, ProductKey::Id("11".to_string()));
    assert_eq!(records[0].image_url, "http://x/rice.jpg");
    assert_eq!(records[0].timestamp, 5_000);
}

#[test]
fn test_group_products_get_fresh_ids() {
    let payload = item_group_payload(&[("Dumplings", "0123456789abcdefjpeg")]);
    let (_, _, first) = products(&payload, 1_000);
    let (_, _, second) = products(&payload, 1_000);

    assert_eq!(first[0].key, ProductKey::Name("Dumplings".to_string()));
    assert!(first[0].id.starts_with("Dumplings_1000_"));
    assert_ne!(first[0].id, second[0].id);
    // jpeg is not sniffed, so the default extension applies
    assert!(first[0].image_url.ends_with(".jpg"));
}

#[test]
fn test_newer_extraction_wins_in_collector() {
    let mut collector = ProductCollector::new();

    let (_, _, old) = products(&item_group_payload(&[("Soup", "aaaaaaa1"), ("Bun", "bbbbbbb1")]), 1_000);
    let (_, _, new) = products(&item_group_payload(&[("Soup", "ccccccc1")]), 2_000);
    let (_, _, stale) = products(&item_group_payload(&[("Bun", "ddddddd1")]), 500);

    let stats = collector.merge(old);
    assert_eq!((stats.added, stats.replaced), (2, 0));

    let stats = collector.merge(new);
    assert_eq!((stats.added, stats.replaced), (0, 1));

    let stats = collector.merge(stale);
    assert_eq!(stats.kept, 1);

    let names: Vec<&str> = collector.records().iter().map(|r| r.name.as_str()).collect();
    assert_eq!(names, vec!["Soup", "Bun"]);
    assert!(collector.records()[0].image_url.contains("/c/cc/cccc1"));
    assert!(collector.records()[1].image_url.contains("/b/bb/bbbb1"));
}
