//! File-system capability used by the watcher and the downloader.
//!
//! Selection, reading and writing go through [`FileAccess`] so the pipeline
//! does not care whether paths come from the command line, an interactive
//! prompt, or an in-memory fake in tests.

use std::fs;
use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::error::{Error, Result};
use crate::logging::{log_file_error, log_fs_modification};

/// A selected file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileHandle {
    path: PathBuf,
    name: String,
}

impl FileHandle {
    /// Handle for an existing file
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if !path.is_file() {
            return Err(Error::FileNotFound(path));
        }
        Ok(Self::new(path))
    }

    /// Handle without an existence check
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "unknown".to_string());
        Self { path, name }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name for display
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Operations the pipeline needs from its environment
pub trait FileAccess {
    /// Ask the user for a file. `Error::Cancelled` when they back out.
    fn select_file(&mut self, prompt: &str) -> Result<FileHandle>;

    /// Last modification time of the file
    fn modified(&self, handle: &FileHandle) -> Result<SystemTime>;

    /// Full file body decoded as UTF-8 (invalid sequences replaced)
    fn read_file(&self, handle: &FileHandle) -> Result<String>;

    /// Ask the user for a destination directory
    fn select_directory(&mut self, prompt: &str) -> Result<PathBuf>;

    /// Write `bytes` to `dir/name`, returning the full path
    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf>;
}

/// Plain local file system; paths are supplied up front.
///
/// There is no picker, so selection is unsupported unless a destination
/// directory was preset.
#[derive(Debug, Clone, Default)]
pub struct LocalFileAccess {
    directory: Option<PathBuf>,
}

impl LocalFileAccess {
    pub fn new() -> Self {
        Self::default()
    }

    /// Directory returned by [`FileAccess::select_directory`]
    pub fn with_directory(mut self, dir: impl Into<PathBuf>) -> Self {
        self.directory = Some(dir.into());
        self
    }
}

impl FileAccess for LocalFileAccess {
    fn select_file(&mut self, _prompt: &str) -> Result<FileHandle> {
        Err(Error::Unsupported(
            "no file picker available; pass the file path on the command line".to_string(),
        ))
    }

    fn modified(&self, handle: &FileHandle) -> Result<SystemTime> {
        Ok(fs::metadata(handle.path())?.modified()?)
    }

    fn read_file(&self, handle: &FileHandle) -> Result<String> {
        let bytes = fs::read(handle.path())?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    fn select_directory(&mut self, _prompt: &str) -> Result<PathBuf> {
        self.directory.clone().ok_or_else(|| {
            Error::Unsupported(
                "no directory picker available; pass the destination on the command line"
                    .to_string(),
            )
        })
    }

    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        fs::create_dir_all(dir)?;
        let path = dir.join(name);
        if let Err(e) = fs::write(&path, bytes) {
            log_file_error(&path, "write", &e);
            return Err(e.into());
        }
        log_fs_modification("write", &path, Some(&format!("{} bytes", bytes.len())));
        Ok(path)
    }
}

/// Selects paths by prompting on a text stream; an empty answer cancels.
pub struct PromptFileAccess<R, W> {
    input: R,
    output: W,
    local: LocalFileAccess,
}

impl<R: BufRead, W: Write> PromptFileAccess<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            local: LocalFileAccess::new(),
        }
    }

    fn ask(&mut self, prompt: &str) -> Result<Option<PathBuf>> {
        write!(self.output, "{}: ", prompt)?;
        self.output.flush()?;

        let mut line = String::new();
        self.input.read_line(&mut line)?;

        let answer = line.trim().trim_matches('"');
        if answer.is_empty() {
            Ok(None)
        } else {
            Ok(Some(PathBuf::from(answer)))
        }
    }
}

impl<R: BufRead, W: Write> FileAccess for PromptFileAccess<R, W> {
    fn select_file(&mut self, prompt: &str) -> Result<FileHandle> {
        match self.ask(prompt)? {
            Some(path) => FileHandle::open(path),
            None => Err(Error::Cancelled(prompt.to_string())),
        }
    }

    fn modified(&self, handle: &FileHandle) -> Result<SystemTime> {
        self.local.modified(handle)
    }

    fn read_file(&self, handle: &FileHandle) -> Result<String> {
        self.local.read_file(handle)
    }

    fn select_directory(&mut self, prompt: &str) -> Result<PathBuf> {
        match self.ask(prompt)? {
            Some(path) => Ok(path),
            None => Err(Error::Cancelled(prompt.to_string())),
        }
    }

    fn write_file(&self, dir: &Path, name: &str, bytes: &[u8]) -> Result<PathBuf> {
        self.local.write_file(dir, name, bytes)
    }
}
