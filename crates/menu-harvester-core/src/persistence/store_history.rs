use log::{info, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use super::error::{PersistenceError, PersistenceResult};
use crate::types::StoreRecord;

pub const CURRENT_STORE_FILE: &str = "current_store.json";
pub const HISTORY_FILE: &str = "store_history.json";

/// Upper bound on the history length, whatever limit is asked for
pub const MAX_HISTORY: usize = 10;

/// The active storefront plus a capped, newest-first history.
///
/// History holds at most `limit` records (never more than [`MAX_HISTORY`])
/// and never two with the same id.
/// When opened on a directory every change is written straight back to
/// `current_store.json` and `store_history.json`.
#[derive(Debug)]
pub struct StoreHistory {
    dir: Option<PathBuf>,
    limit: usize,
    current: Option<StoreRecord>,
    history: Vec<StoreRecord>,
}

impl StoreHistory {
    /// History that is never written to disk
    pub fn in_memory(limit: usize) -> Self {
        Self {
            dir: None,
            limit: limit.min(MAX_HISTORY),
            current: None,
            history: Vec::new(),
        }
    }

    /// Load state from `dir`, creating it if needed.
    ///
    /// Unreadable or corrupt state files are logged and treated as empty.
    /// A loaded history is deduplicated by id, keeping the newest entry.
    pub fn open(dir: impl Into<PathBuf>, limit: usize) -> PersistenceResult<Self> {
        let dir = dir.into();
        let limit = limit.min(MAX_HISTORY);
        fs::create_dir_all(&dir).map_err(|e| PersistenceError::Io(dir.clone(), e))?;

        let current = load_or_default::<Option<StoreRecord>>(&dir.join(CURRENT_STORE_FILE));
        let mut history = load_or_default::<Vec<StoreRecord>>(&dir.join(HISTORY_FILE));
        let mut seen = HashSet::new();
        history.retain(|item| seen.insert(item.id.clone()));
        history.truncate(limit);

        info!(
            "Loaded store state from {} ({} in history)",
            dir.display(),
            history.len()
        );

        Ok(Self {
            dir: Some(dir),
            limit,
            current,
            history,
        })
    }

    /// Make `record` the current storefront and move it to the front of history
    pub fn record(&mut self, record: StoreRecord) -> PersistenceResult<()> {
        self.history.retain(|item| item.id != record.id);
        self.history.insert(0, record.clone());
        self.history.truncate(self.limit);
        self.current = Some(record);

        self.save_current()?;
        self.save_history()
    }

    /// Make a history entry current again. History order is left alone.
    pub fn load_from_history(&mut self, id: &str) -> PersistenceResult<Option<&StoreRecord>> {
        let Some(record) = self.history.iter().find(|item| item.id == id).cloned() else {
            return Ok(None);
        };

        self.current = Some(record);
        self.save_current()?;
        Ok(self.current.as_ref())
    }

    pub fn clear_current(&mut self) -> PersistenceResult<()> {
        self.current = None;
        self.save_current()
    }

    pub fn clear_history(&mut self) -> PersistenceResult<()> {
        self.history.clear();
        self.save_history()
    }

    pub fn current(&self) -> Option<&StoreRecord> {
        self.current.as_ref()
    }

    /// Newest first
    pub fn history(&self) -> &[StoreRecord] {
        &self.history
    }

    pub fn dir(&self) -> Option<&Path> {
        self.dir.as_deref()
    }

    fn save_current(&self) -> PersistenceResult<()> {
        let Some(dir) = &self.dir else {
            return Ok(());
        };
        let path = dir.join(CURRENT_STORE_FILE);

        match &self.current {
            Some(record) => write_json(&path, record),
            None => match fs::remove_file(&path) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(PersistenceError::Io(path, e)),
            },
        }
    }

    fn save_history(&self) -> PersistenceResult<()> {
        match &self.dir {
            Some(dir) => write_json(&dir.join(HISTORY_FILE), &self.history),
            None => Ok(()),
        }
    }
}

fn load_or_default<T: DeserializeOwned + Default>(path: &Path) -> T {
    match read_json(path) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(e) => {
            warn!("Ignoring unreadable state file: {}", e);
            T::default()
        }
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> PersistenceResult<Option<T>> {
    let text = match fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(PersistenceError::Io(path.to_path_buf(), e)),
    };

    serde_json::from_str(&text)
        .map(Some)
        .map_err(|e| PersistenceError::Corrupt(path.to_path_buf(), e))
}

/// Write through a temporary file so a crash never leaves half a file behind
fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> PersistenceResult<()> {
    let json = serde_json::to_vec_pretty(value).map_err(PersistenceError::Encode)?;

    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, json).map_err(|e| PersistenceError::Io(tmp.clone(), e))?;
    fs::rename(&tmp, path).map_err(|e| PersistenceError::Io(path.to_path_buf(), e))
}
