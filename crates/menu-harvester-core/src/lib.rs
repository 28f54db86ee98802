//! Core functionality for harvesting storefront and product images.
//!
//! This library provides the components of the harvesting pipeline:
//! - Change detection on captured API payload files
//! - Shape-tolerant extraction of image records
//! - Deduplication and persisted storefront history
//! - Bulk download with JPEG re-encoding

// -- Internal Modules --
mod error;

// -- Public Re-exports --
pub use config::*;
pub use error::{Error, Result};
pub use harvester::{Harvester, WatchCommand};
pub use types::*;

// -- Public Modules --
pub mod activity;
pub mod collector;
pub mod config;
pub mod download;
pub mod extract;
pub mod fs_access;
pub mod harvester;
pub mod image_url;
pub mod logging;
pub mod monitor;
pub mod persistence;
pub mod server;
pub mod types;

// -- Test Modules --
#[cfg(test)]
pub mod test_utils;
