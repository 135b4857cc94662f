use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CullError {
    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Cannot access {path}: {source}")]
    FileAccess {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // Filesystem errors
    #[error("Directory walker error: {0}")]
    Walkdir(#[from] walkdir::Error),

    #[error("Path not found: {0}")]
    PathNotFound(PathBuf),

    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    // Quarantine errors
    #[error("Cannot restore, original path is occupied: {0}")]
    RestoreConflict(PathBuf),

    // Session store errors
    #[error("Session store error: {0}")]
    Json(#[from] serde_json::Error),

    // Metadata errors
    #[error("Date parsing error: {0}")]
    InvalidDateFormat(String),

    #[error("Failed to extract metadata from {path}: {reason}")]
    MetadataExtraction { path: PathBuf, reason: String },

    // Engine state
    #[error("Ignored: {0}")]
    InvalidState(String),

    #[error("Argument error: {0}")]
    Argument(String),
}

impl CullError {
    /// Wrap an I/O error with the path it happened on.
    pub fn access(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        CullError::FileAccess {
            path: path.into(),
            source,
        }
    }

    /// Whether this error is a reported no-op rather than a real failure.
    pub fn is_invalid_state(&self) -> bool {
        matches!(self, CullError::InvalidState(_))
    }
}

/// Files that could not be moved into quarantine during one batch.
#[derive(Debug)]
pub struct RelocationFailures {
    pub failures: Vec<RelocationFailure>,
}

#[derive(Debug)]
pub struct RelocationFailure {
    pub path: PathBuf,
    pub error: CullError,
}

impl std::fmt::Display for RelocationFailures {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        for failure in &self.failures {
            writeln!(f, "  {}: {}", failure.path.display(), failure.error)?;
        }
        Ok(())
    }
}

impl RelocationFailures {
    pub fn new() -> Self {
        Self {
            failures: Vec::new(),
        }
    }

    pub fn add(&mut self, path: PathBuf, error: CullError) {
        self.failures.push(RelocationFailure { path, error });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }
}

impl Default for RelocationFailures {
    fn default() -> Self {
        Self::new()
    }
}

/// Result type for burstcull operations.
pub type Result<T> = std::result::Result<T, CullError>;
