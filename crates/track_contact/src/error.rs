//! Errors for the few fallible operations: snapshot output and config files.

/// Errors that can occur while reading config or writing contact snapshots.
#[derive(Debug)]
pub enum TrackContactError {
    /// File system error
    Io(std::io::Error),
    /// JSON (de)serialization error
    Json(serde_json::Error),
    /// Config parsed but is unusable
    InvalidConfig(String),
}

impl std::fmt::Display for TrackContactError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrackContactError::Io(e) => write!(f, "IO error: {}", e),
            TrackContactError::Json(e) => write!(f, "JSON error: {}", e),
            TrackContactError::InvalidConfig(msg) => write!(f, "Invalid config: {}", msg),
        }
    }
}

impl std::error::Error for TrackContactError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TrackContactError::Io(e) => Some(e),
            TrackContactError::Json(e) => Some(e),
            TrackContactError::InvalidConfig(_) => None,
        }
    }
}

impl From<std::io::Error> for TrackContactError {
    fn from(e: std::io::Error) -> Self {
        TrackContactError::Io(e)
    }
}

impl From<serde_json::Error> for TrackContactError {
    fn from(e: serde_json::Error) -> Self {
        TrackContactError::Json(e)
    }
}

/// Result type for track contact I/O.
pub type TrackContactResult<T> = Result<T, TrackContactError>;
