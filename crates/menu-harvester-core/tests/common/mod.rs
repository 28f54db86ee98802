#![allow(dead_code)]

use std::cell::RefCell;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{Duration, UNIX_EPOCH};

use serde_json::json;

use menu_harvester_core::download::ImageFetcher;
use menu_harvester_core::{Config, Error, Result};

/// Config pointing its state at `state_dir`, polling fast
pub fn test_config(state_dir: &Path) -> Config {
    Config {
        poll_interval_ms: 100,
        state_dir: Some(state_dir.to_path_buf()),
        ..Config::default()
    }
}

/// Write `content` to `dir/name` and pin its modification time
pub fn write_payload(dir: &Path, name: &str, content: &str, modified_secs: u64) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, content).unwrap();
    set_modified(&path, modified_secs);
    path
}

pub fn set_modified(path: &Path, secs: u64) {
    let time = UNIX_EPOCH + Duration::from_secs(1_700_000_000 + secs);
    File::options()
        .write(true)
        .open(path)
        .unwrap()
        .set_modified(time)
        .unwrap();
}

pub fn storefront_payload(name: &str, id: &str) -> String {
    json!({
        "code": 0,
        "data": {
            "poi_info": {
                "name": name,
                "poi_id_str": id,
                "pic_url": format!("https://img.example.com/{}/avatar.jpg@120w_120h_1e_1c", id),
                "head_pic_url": format!("https://img.example.com/{}/head.jpg@750w_300h_1e_1c", id),
            },
            "container_operation_source": {
                "operation_source_list": [
                    { "pic_url": format!("https://img.example.com/{}/poster1.jpg?v=2", id) },
                    { "pic_url": "https://img.example.com/fans_group_poster/qr.jpg" },
                    { "pic_url": format!("https://img.example.com/{}/poster2.jpg", id) }
                ]
            }
        }
    })
    .to_string()
}

/// Shape B payload from `(id, name, picture)` triples
pub fn spu_payload(spus: &[(&str, &str, &str)]) -> String {
    let spus: Vec<_> = spus
        .iter()
        .map(|(id, name, picture)| json!({ "id": id, "name": name, "picture": picture }))
        .collect();
    json!({ "data": { "food_spu_tags": [ { "tag_name": "Hot", "dynamic_spus": spus } ] } }).to_string()
}

/// Shape A payload from `(name, image hash)` pairs
pub fn item_group_payload(items: &[(&str, &str)]) -> String {
    let items: Vec<_> = items
        .iter()
        .map(|(name, hash)| json!({ "itemType": 0, "name": name, "imageHash": hash }))
        .collect();
    json!({ "data": { "itemGroups": [ { "name": "Menu", "items": items } ] } }).to_string()
}

/// Serves a generated PNG and records every URL it was asked for.
/// URLs containing `missing` fail.
#[derive(Default)]
pub struct PngFetcher {
    pub requests: RefCell<Vec<String>>,
}

impl ImageFetcher for PngFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        self.requests.borrow_mut().push(url.to_string());
        if url.contains("missing") {
            return Err(Error::Http(format!("404 Not Found: {}", url)));
        }

        let image = image::RgbImage::from_pixel(4, 3, image::Rgb([10, 120, 240]));
        let mut bytes = Vec::new();
        image::DynamicImage::ImageRgb8(image)
            .write_to(
                &mut std::io::Cursor::new(&mut bytes),
                image::ImageOutputFormat::Png,
            )
            .unwrap();
        Ok(bytes)
    }
}

pub fn file_names(dir: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(dir)
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}
