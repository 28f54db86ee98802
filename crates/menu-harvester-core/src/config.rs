use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::persistence::MAX_HISTORY;

/// Default CDN host used to expand image hashes into URLs
pub const DEFAULT_CDN_HOST: &str = "cube.elemecdn.com";

/// Log level for the application
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    pub fn to_level_filter(self) -> log::LevelFilter {
        match self {
            LogLevel::Error => log::LevelFilter::Error,
            LogLevel::Warn => log::LevelFilter::Warn,
            LogLevel::Info => log::LevelFilter::Info,
            LogLevel::Debug => log::LevelFilter::Debug,
            LogLevel::Trace => log::LevelFilter::Trace,
        }
    }
}

/// Configuration for the harvesting process
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Milliseconds between two polls of a watched file
    pub poll_interval_ms: u64,

    /// Maximum number of storefronts kept in the history list
    pub history_limit: usize,

    /// Maximum number of files watched at once
    pub max_sessions: usize,

    /// Host used when expanding image hashes into URLs
    pub cdn_host: String,

    /// JPEG quality used when re-encoding downloaded images (1-100)
    pub jpeg_quality: u8,

    /// Per-image request timeout; `None` waits indefinitely
    pub request_timeout_secs: Option<u64>,

    /// Where the current storefront and history are persisted.
    /// Falls back to the platform data directory.
    pub state_dir: Option<PathBuf>,

    /// Port for the HTTP endpoint pair
    pub server_port: u16,

    /// Log level
    pub log_level: LogLevel,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            poll_interval_ms: 2000,
            history_limit: 10,
            max_sessions: 4,
            cdn_host: DEFAULT_CDN_HOST.to_string(),
            jpeg_quality: 95,
            request_timeout_secs: None,
            state_dir: None,
            server_port: 3000,
            log_level: LogLevel::Info,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .map_err(|e| Error::Configuration(format!("Failed to open config file: {}", e)))?;

        let config: Config = serde_json::from_reader(file)
            .map_err(|e| Error::Configuration(format!("Failed to parse config file: {}", e)))?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save_to_file(&self, path: &Path) -> Result<()> {
        let file = std::fs::File::create(path)
            .map_err(|e| Error::Configuration(format!("Failed to create config file: {}", e)))?;

        serde_json::to_writer_pretty(file, self)
            .map_err(|e| Error::Configuration(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.poll_interval_ms < 100 {
            return Err(Error::Configuration(
                "Poll interval must be at least 100ms".to_string(),
            ));
        }

        if self.history_limit == 0 || self.history_limit > MAX_HISTORY {
            return Err(Error::Configuration(format!(
                "History limit must be between 1 and {}",
                MAX_HISTORY
            )));
        }

        if self.max_sessions == 0 || self.max_sessions > 4 {
            return Err(Error::Configuration(
                "Between 1 and 4 watched files are supported".to_string(),
            ));
        }

        if self.cdn_host.trim().is_empty() {
            return Err(Error::Configuration("CDN host must not be empty".to_string()));
        }

        if self.jpeg_quality == 0 || self.jpeg_quality > 100 {
            return Err(Error::Configuration(
                "JPEG quality must be between 1 and 100".to_string(),
            ));
        }

        Ok(())
    }

    pub fn poll_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.poll_interval_ms)
    }

    /// Resolve the state directory, falling back to the platform data dir
    pub fn resolve_state_dir(&self) -> Result<PathBuf> {
        if let Some(dir) = &self.state_dir {
            return Ok(dir.clone());
        }

        directories::ProjectDirs::from("", "", "menu-harvester")
            .map(|dirs| dirs.data_dir().to_path_buf())
            .ok_or_else(|| {
                Error::Unsupported(
                    "No home directory found; set `state_dir` in the config file".to_string(),
                )
            })
    }
}
