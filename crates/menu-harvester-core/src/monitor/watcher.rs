use std::time::Duration;

use crate::config::Config;
use crate::error::{Error, Result};
use crate::fs_access::{FileAccess, FileHandle};

use super::session::{MonitorSession, PollOutcome, SessionKind};

/// Owns the watched files and polls them one after another.
///
/// All sessions share one timer; every poll of a tick runs to completion
/// before the next session is looked at.
#[derive(Debug)]
pub struct Watcher {
    sessions: Vec<MonitorSession>,
    interval: Duration,
    max_sessions: usize,
}

impl Watcher {
    pub fn new(config: &Config) -> Self {
        Self {
            sessions: Vec::new(),
            interval: config.poll_interval(),
            max_sessions: config.max_sessions,
        }
    }

    /// Select `handle` for the session called `label` and start watching it.
    ///
    /// A previous session with the same label is stopped and replaced.
    pub fn watch(
        &mut self,
        label: &str,
        kind: SessionKind,
        handle: FileHandle,
        fs: &dyn FileAccess,
    ) -> Result<()> {
        let existing = self.sessions.iter().position(|s| s.label() == label);
        let active = self.sessions.iter().filter(|s| s.is_active()).count();
        if existing.is_none() && active >= self.max_sessions {
            return Err(Error::Configuration(format!(
                "at most {} files can be watched at once",
                self.max_sessions
            )));
        }

        let mut session = MonitorSession::new(label, kind);
        session.select(handle, fs)?;
        session.start()?;

        match existing {
            Some(slot) => {
                self.sessions[slot].stop();
                self.sessions[slot] = session;
            }
            None => self.sessions.push(session),
        }
        Ok(())
    }

    /// Poll every session once, handing each outcome to `on_outcome`
    pub fn poll_all<F>(&mut self, fs: &dyn FileAccess, mut on_outcome: F)
    where
        F: FnMut(&MonitorSession, PollOutcome),
    {
        for session in self.sessions.iter_mut() {
            let outcome = session.poll(fs);
            if !matches!(outcome, PollOutcome::Inactive | PollOutcome::Unchanged) {
                on_outcome(session, outcome);
            }
        }
    }

    /// Stop the session called `label`; returns whether it existed
    pub fn stop(&mut self, label: &str) -> bool {
        match self.sessions.iter_mut().find(|s| s.label() == label) {
            Some(session) => {
                session.stop();
                true
            }
            None => false,
        }
    }

    pub fn stop_all(&mut self) {
        self.sessions.iter_mut().for_each(MonitorSession::stop);
    }

    /// Skip the next content change of every session of `kind`
    pub fn silence(&mut self, kind: SessionKind) {
        self.sessions
            .iter_mut()
            .filter(|s| s.kind() == kind)
            .for_each(MonitorSession::silence);
    }

    pub fn sessions(&self) -> &[MonitorSession] {
        &self.sessions
    }

    pub fn has_active_sessions(&self) -> bool {
        self.sessions.iter().any(MonitorSession::is_active)
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}
