//! Downloading harvested images.
//!
//! Items are fetched one after another, re-encoded as JPEG and written into
//! a directory the user picks. A failed item is logged and counted; the
//! batch only aborts when the directory selection itself is cancelled.
//! Saving a single image is a batch of one built by [`target_job`].

mod fetch;
mod progress;

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::Serialize;

use crate::activity::ActivityLog;
use crate::error::Result;
use crate::fs_access::FileAccess;
use crate::image_url::sanitize_file_name;
use crate::types::{ProductRecord, StoreRecord};

pub use fetch::{cache_busted, reencode_jpeg, HttpFetcher, ImageFetcher};
pub use progress::DownloadProgress;

/// Used when a storefront has no usable name
const FALLBACK_STORE_NAME: &str = "店铺";

/// One image to fetch and the file name to save it under
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DownloadJob {
    pub url: String,
    pub file_name: String,
}

impl DownloadJob {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            file_name: file_name.into(),
        }
    }
}

fn store_file_stem(record: &StoreRecord) -> String {
    let name = sanitize_file_name(&record.name);
    if name.is_empty() {
        FALLBACK_STORE_NAME.to_string()
    } else {
        name
    }
}

fn avatar_job(record: &StoreRecord, stem: &str) -> Option<DownloadJob> {
    let url = record.avatar_url.as_ref()?;
    Some(DownloadJob::new(url, format!("{}_头像.jpg", stem)))
}

fn header_job(record: &StoreRecord, stem: &str) -> Option<DownloadJob> {
    let url = record.header_url.as_ref()?;
    Some(DownloadJob::new(url, format!("{}_店招.jpg", stem)))
}

/// `number` counts from 1
fn poster_job(record: &StoreRecord, stem: &str, number: usize) -> Option<DownloadJob> {
    let url = record.poster_urls.as_ref()?.get(number.checked_sub(1)?)?;
    Some(DownloadJob::new(url, format!("{}_海报{}.jpg", stem, number)))
}

fn product_job(record: &ProductRecord) -> DownloadJob {
    DownloadJob::new(
        &record.image_url,
        format!("{}.jpg", sanitize_file_name(&record.name)),
    )
}

/// Jobs for a storefront's avatar, header and posters
pub fn store_jobs(record: &StoreRecord) -> Vec<DownloadJob> {
    let stem = store_file_stem(record);
    let posters = record.poster_urls.as_ref().map_or(0, Vec::len);

    avatar_job(record, &stem)
        .into_iter()
        .chain(header_job(record, &stem))
        .chain((1..=posters).filter_map(|n| poster_job(record, &stem, n)))
        .collect()
}

/// One job per product, named after the product
pub fn product_jobs(records: &[ProductRecord]) -> Vec<DownloadJob> {
    records.iter().map(product_job).collect()
}

/// A single harvested image, addressed by its role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImageTarget {
    Avatar,
    Header,
    /// Poster number, counting from 1
    Poster(usize),
    /// Product with this exact name
    Product(String),
}

impl fmt::Display for ImageTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImageTarget::Avatar => write!(f, "avatar"),
            ImageTarget::Header => write!(f, "header"),
            ImageTarget::Poster(n) => write!(f, "poster {}", n),
            ImageTarget::Product(name) => write!(f, "product {}", name),
        }
    }
}

/// Parses `avatar`, `header`, `poster N` or `product NAME`.
/// A colon may stand in for the first space, as in `poster:2`.
impl FromStr for ImageTarget {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let s = s.trim();
        let (role, arg) = match s.find(|c: char| c == ':' || c.is_whitespace()) {
            Some(at) => (&s[..at], s[at + 1..].trim()),
            None => (s, ""),
        };

        match (role, arg) {
            ("avatar", "") => Ok(ImageTarget::Avatar),
            ("header", "") => Ok(ImageTarget::Header),
            ("poster", n) => match n.parse::<usize>() {
                Ok(n) if n > 0 => Ok(ImageTarget::Poster(n)),
                _ => Err(format!("poster number must be 1 or more, got `{}`", n)),
            },
            ("product", name) if !name.is_empty() => Ok(ImageTarget::Product(name.to_string())),
            _ => Err(format!(
                "expected avatar, header, poster N or product NAME, got `{}`",
                s
            )),
        }
    }
}

/// The job saving `target`, if that image has been harvested
pub fn target_job(
    store: Option<&StoreRecord>,
    products: &[ProductRecord],
    target: &ImageTarget,
) -> Option<DownloadJob> {
    match target {
        ImageTarget::Product(name) => products.iter().find(|p| &p.name == name).map(product_job),
        ImageTarget::Avatar => store.and_then(|s| avatar_job(s, &store_file_stem(s))),
        ImageTarget::Header => store.and_then(|s| header_job(s, &store_file_stem(s))),
        ImageTarget::Poster(n) => store.and_then(|s| poster_job(s, &store_file_stem(s), *n)),
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct DownloadFailure {
    pub file_name: String,
    pub message: String,
}

/// Outcome of a bulk download
#[derive(Debug, Clone, Default, Serialize)]
pub struct DownloadReport {
    pub directory: Option<PathBuf>,
    pub total: usize,
    pub saved: usize,
    pub failures: Vec<DownloadFailure>,
}

impl DownloadReport {
    pub fn summary(&self) -> String {
        format!("{} of {} saved", self.saved, self.total)
    }
}

/// Runs a list of [`DownloadJob`]s sequentially
pub struct BulkDownloader<'a> {
    fetcher: &'a dyn ImageFetcher,
    jpeg_quality: u8,
    show_progress: bool,
}

impl<'a> BulkDownloader<'a> {
    pub fn new(fetcher: &'a dyn ImageFetcher, jpeg_quality: u8) -> Self {
        Self {
            fetcher,
            jpeg_quality,
            show_progress: false,
        }
    }

    /// Draw an indicatif progress bar while downloading
    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Ask for a destination directory, then fetch and save every job
    pub fn run(
        &self,
        jobs: &[DownloadJob],
        fs: &mut dyn FileAccess,
        activity: &mut ActivityLog,
    ) -> Result<DownloadReport> {
        if jobs.is_empty() {
            activity.warning("No images to download");
            return Ok(DownloadReport::default());
        }

        let directory = match fs.select_directory("Folder to save images in") {
            Ok(dir) => dir,
            Err(e) => {
                if e.is_cancelled() {
                    activity.warning("Folder selection cancelled");
                } else {
                    activity.error(format!("Cannot choose a folder: {}", e));
                }
                return Err(e);
            }
        };
        activity.success(format!("Saving {} images to {}", jobs.len(), directory.display()));

        let progress = DownloadProgress::new(jobs.len(), self.show_progress);
        let mut report = DownloadReport {
            directory: Some(directory.clone()),
            total: jobs.len(),
            ..DownloadReport::default()
        };

        for job in jobs {
            progress.start_item(&job.file_name);
            activity.info(format!("Downloading {}", job.file_name));

            let saved = self
                .fetcher
                .fetch(&job.url)
                .and_then(|bytes| reencode_jpeg(&bytes, self.jpeg_quality))
                .and_then(|jpeg| fs.write_file(&directory, &job.file_name, &jpeg));

            match saved {
                Ok(path) => {
                    report.saved += 1;
                    activity.success(format!("Saved {}", path.display()));
                }
                Err(e) => {
                    activity.error(format!("Download failed: {} - {}", job.file_name, e));
                    report.failures.push(DownloadFailure {
                        file_name: job.file_name.clone(),
                        message: e.to_string(),
                    });
                }
            }
            progress.finish_item();
        }

        progress.finish(report.saved, report.total);
        activity.success(format!(
            "Bulk download finished: {} to {}",
            report.summary(),
            directory.display()
        ));
        Ok(report)
    }
}
