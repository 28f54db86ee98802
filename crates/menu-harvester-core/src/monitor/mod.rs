//! Change detection for watched payload files.

mod content_hash;
mod session;
mod watcher;

pub use content_hash::ContentHash;
pub use session::{MonitorSession, PollOutcome, SessionKind, SessionState};
pub use watcher::Watcher;
