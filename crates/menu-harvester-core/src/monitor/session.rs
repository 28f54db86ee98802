use std::time::SystemTime;

use log::{debug, info, warn};

use super::content_hash::ContentHash;
use crate::error::{Error, Result};
use crate::extract::{ExtractorKind, PRODUCT_CHAIN, STOREFRONT_CHAIN};
use crate::fs_access::{FileAccess, FileHandle};

/// What a watched file is expected to contain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionKind {
    Storefront,
    Products,
}

impl SessionKind {
    /// Extractors tried, in order, on each content change
    pub fn chain(self) -> &'static [ExtractorKind] {
        match self {
            SessionKind::Storefront => STOREFRONT_CHAIN,
            SessionKind::Products => PRODUCT_CHAIN,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Selected,
    Watching,
    Stopped,
}

/// Result of one poll
#[derive(Debug)]
pub enum PollOutcome {
    /// Session is not watching
    Inactive,
    /// Modification time did not advance
    Unchanged,
    /// Modification time advanced but the body is identical
    Touched,
    /// Body changed and the session is armed; run extraction on it
    Updated(String),
    /// Body changed while silenced; the session is armed again
    Rearmed,
    /// Reading failed; the session has stopped
    Failed(Error),
}

/// One watched file and its polling state.
///
/// Selecting a file records its modification time and content hash and arms
/// the session, but does not extract: extraction only happens on the first
/// real change after that.
#[derive(Debug)]
pub struct MonitorSession {
    label: String,
    kind: SessionKind,
    handle: Option<FileHandle>,
    last_modified: Option<SystemTime>,
    last_hash: Option<ContentHash>,
    armed: bool,
    state: SessionState,
}

impl MonitorSession {
    pub fn new(label: impl Into<String>, kind: SessionKind) -> Self {
        Self {
            label: label.into(),
            kind,
            handle: None,
            last_modified: None,
            last_hash: None,
            armed: false,
            state: SessionState::Idle,
        }
    }

    /// Take `handle` as the watched file and capture its current state
    pub fn select(&mut self, handle: FileHandle, fs: &dyn FileAccess) -> Result<()> {
        let modified = fs.modified(&handle)?;
        let content = fs.read_file(&handle)?;
        let hash = ContentHash::of(&content);

        info!(
            "[{}] selected {} (hash {})",
            self.label,
            handle.path().display(),
            hash
        );

        self.handle = Some(handle);
        self.last_modified = Some(modified);
        self.last_hash = Some(hash);
        self.armed = true;
        self.state = SessionState::Selected;
        Ok(())
    }

    /// Begin watching a selected file
    pub fn start(&mut self) -> Result<()> {
        match self.state {
            SessionState::Selected | SessionState::Watching => {
                self.state = SessionState::Watching;
                Ok(())
            }
            _ => Err(Error::Configuration(format!(
                "[{}] select a file before watching",
                self.label
            ))),
        }
    }

    /// Stop watching and release the file handle
    pub fn stop(&mut self) {
        if self.state != SessionState::Stopped {
            debug!("[{}] stopped", self.label);
        }
        self.state = SessionState::Stopped;
        self.handle = None;
    }

    /// Keep watching but skip extraction for the next content change
    pub fn silence(&mut self) {
        self.armed = false;
    }

    /// Check the file once
    pub fn poll(&mut self, fs: &dyn FileAccess) -> PollOutcome {
        if self.state != SessionState::Watching {
            return PollOutcome::Inactive;
        }
        let Some(handle) = self.handle.clone() else {
            self.stop();
            return PollOutcome::Inactive;
        };

        match self.check(&handle, fs) {
            Ok(outcome) => outcome,
            Err(e) => {
                warn!("[{}] read failed, stopping: {}", self.label, e);
                self.stop();
                PollOutcome::Failed(e)
            }
        }
    }

    fn check(&mut self, handle: &FileHandle, fs: &dyn FileAccess) -> Result<PollOutcome> {
        let modified = fs.modified(handle)?;
        let is_newer = self.last_modified.map_or(true, |last| modified > last);
        if !is_newer {
            return Ok(PollOutcome::Unchanged);
        }
        self.last_modified = Some(modified);

        let content = fs.read_file(handle)?;
        let hash = ContentHash::of(&content);
        if self.last_hash == Some(hash) {
            debug!("[{}] modified time changed but content did not", self.label);
            return Ok(PollOutcome::Touched);
        }
        self.last_hash = Some(hash);

        if self.armed {
            Ok(PollOutcome::Updated(content))
        } else {
            self.armed = true;
            Ok(PollOutcome::Rearmed)
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn kind(&self) -> SessionKind {
        self.kind
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.armed
    }

    pub fn handle(&self) -> Option<&FileHandle> {
        self.handle.as_ref()
    }

    pub fn last_modified(&self) -> Option<SystemTime> {
        self.last_modified
    }

    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Selected | SessionState::Watching)
    }
}
