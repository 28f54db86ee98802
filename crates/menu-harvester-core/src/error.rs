use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = core::result::Result<T, Error>;

/// Custom error types for the menu-harvester library
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Malformed JSON payload or state file
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Image decode or encode error
    #[error("Image processing error: {0}")]
    Image(String),

    /// Image fetch error
    #[error("HTTP error: {0}")]
    Http(String),

    /// File not found error
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// The user backed out of a file or directory selection
    #[error("Selection cancelled: {0}")]
    Cancelled(String),

    /// The running environment lacks a required capability
    #[error("Unsupported environment: {0}")]
    Unsupported(String),

    /// Invalid configuration error
    #[error("Invalid configuration: {0}")]
    Configuration(String),

    /// The requested image has not been harvested
    #[error("Nothing to save for {0}")]
    MissingImage(String),

    /// Store history could not be loaded or saved
    #[error("Persistence error: {0}")]
    Persistence(String),
}

impl From<image::ImageError> for Error {
    fn from(err: image::ImageError) -> Self {
        Error::Image(err.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Http(err.to_string())
    }
}

impl Error {
    /// Whether this error means the user cancelled a selection dialog
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Error::Cancelled(_))
    }
}
