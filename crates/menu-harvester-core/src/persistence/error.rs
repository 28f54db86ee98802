use std::path::PathBuf;

/// Result type for persistence operations
pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Persistence-specific errors
#[derive(Debug)]
pub enum PersistenceError {
    /// Reading, writing or removing a state file failed
    Io(PathBuf, std::io::Error),

    /// A state file exists but does not hold valid JSON
    Corrupt(PathBuf, serde_json::Error),

    /// Serializing a record failed
    Encode(serde_json::Error),
}

impl std::fmt::Display for PersistenceError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(path, err) => write!(f, "I/O error for {}: {}", path.display(), err),
            Self::Corrupt(path, err) => {
                write!(f, "Corrupt state file {}: {}", path.display(), err)
            }
            Self::Encode(err) => write!(f, "Failed to encode state: {}", err),
        }
    }
}

impl std::error::Error for PersistenceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Io(_, err) => Some(err),
            Self::Corrupt(_, err) | Self::Encode(err) => Some(err),
        }
    }
}

// Implement conversion from PersistenceError to the main Error type
impl From<PersistenceError> for crate::Error {
    fn from(err: PersistenceError) -> Self {
        crate::Error::Persistence(err.to_string())
    }
}
