use std::cell::RefCell;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use crate::download::ImageFetcher;
use crate::error::{Error, Result};
use crate::fs_access::{FileAccess, FileHandle};

struct MemoryFile {
    modified: SystemTime,
    content: String,
}

/// In-memory file system with explicit modification times
#[derive(Default)]
pub struct MemoryFileAccess {
    files: RefCell<HashMap<PathBuf, MemoryFile>>,
    written: RefCell<Vec<(PathBuf, Vec<u8>)>>,
    directory: Option<PathBuf>,
}

impl MemoryFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }

    /// Create or overwrite a file with the given modification second
    pub fn put(&self, path: impl Into<PathBuf>, content: &str, modified_secs: u64) {
        self.files.borrow_mut().insert(
            path.into(),
            MemoryFile {
                modified: UNIX_EPOCH + Duration::from_secs(modified_secs),
                content: content.to_string(),
            },
        );
    }

    pub fn remove(&self, path: impl AsRef<Path>) {
        self.files.borrow_mut().remove(path.as_ref());
    }

    pub fn written(&self) -> Vec<(PathBuf, Vec<u8>)> {
        self.written.borrow().clone()
    }
}

impl FileAccess for MemoryFileAccess {
    fn select_file(&mut self, prompt: &str) -> Result<FileHandle> {
        Err(Error::Cancelled(prompt.to_string()))
    }

    fn modified(&self, handle: &FileHandle) -> Result<SystemTime> {
        self.files
            .borrow()
            .get(handle.path())
            .map(|f| f.modified)
            .ok_or_else(|| Error::FileNotFound(handle.path().to_path_buf()))
    }

    fn read_file(&self, handle: &FileHandle) -> Result<String> {
        self.files
            .borrow()
            .get(handle.path())
            .map(|f| f.content.clone())
            .ok_or_else(|| Error::FileNotFound(handle.path().to_path_buf()))
    }

    fn select_directory(&mut self, prompt: &str) -> Result<PathBuf> {
        self.directory
            .clone()
            .ok_or_else(|| Error::Cancelled(prompt.to_string()))
    }

    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        let path = dir.join(name);
        self.written.borrow_mut().push((path.clone(), bytes.to_vec()));
        Ok(path)
    }
}

/// Serves a fixed PNG for every URL except those containing `broken`
pub struct StaticFetcher;

impl ImageFetcher for StaticFetcher {
    fn fetch(&self, url: &str) -> Result<Vec<u8>> {
        if url.contains("broken") {
            return Err(Error::Http(format!("404 for {}", url)));
        }
        Ok(tiny_png())
    }
}

/// A 2x2 RGBA PNG
pub fn tiny_png() -> Vec<u8> {
    let image = image::RgbaImage::from_pixel(2, 2, image::Rgba([200, 30, 30, 255]));
    let mut bytes = Vec::new();
    image::DynamicImage::ImageRgba8(image)
        .write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageOutputFormat::Png)
        .unwrap();
    bytes
}
