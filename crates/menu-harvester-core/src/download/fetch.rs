use std::io::Cursor;
use std::time::Duration;

use image::codecs::jpeg::JpegEncoder;
use log::debug;

use crate::error::{Error, Result};

/// Source of raw image bytes
pub trait ImageFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>>;
}

/// Fetches images over HTTP(S)
pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    /// `timeout` of `None` lets a request wait indefinitely
    pub fn new(timeout: Option<Duration>) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ImageFetcher for HttpFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        let url = cache_busted(url, chrono::Utc::now().timestamp_millis());
        debug!("GET {}", url);

        let response = self.client.get(&url).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

/// Append `_t=<millis>` so CDNs hand back a fresh copy
pub fn cache_busted(url: &str, millis: i64) -> String {
    let separator = if url.contains('?') { '&' } else { '?' };
    format!("{}{}_t={}", url, separator, millis)
}

/// Decode any supported image and re-encode it as RGB JPEG
pub fn reencode_jpeg(bytes: &[u8], quality: u8) -> Result<Vec<u8>> {
    let decoded = image::load_from_memory(bytes)?;
    let rgb = decoded.to_rgb8();

    let mut out = Cursor::new(Vec::new());
    let mut encoder = JpegEncoder::new_with_quality(&mut out, quality);
    encoder
        .encode(rgb.as_raw(), rgb.width(), rgb.height(), image::ColorType::Rgb8)
        .map_err(|e| Error::Image(format!("JPEG encoding failed: {}", e)))?;

    Ok(out.into_inner())
}
