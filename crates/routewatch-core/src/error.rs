//! Error types for routewatch-core.
//!
//! Only startup problems are fatal. Everything that can go wrong during a
//! tick is absorbed where it happens: a broken check becomes `false`, a failed
//! write is logged and retried on the next tick.

use std::path::PathBuf;

/// Result type alias for routewatch operations.
pub type Result<T> = std::result::Result<T, WatchError>;

/// Error type for the health watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// Invalid or unreadable configuration.
    #[error("configuration error: {0}")]
    Config(String),

    /// Writing the generated artifact failed.
    #[error("failed to write {}: {source}", path.display())]
    Write {
        /// Target path of the artifact.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Signal handling error.
    #[error("signal error: {0}")]
    Signal(String),

    /// Runtime error outside the control loop (signal setup and the like).
    #[error("runtime error: {0}")]
    Runtime(String),
}

impl WatchError {
    /// Creates a configuration error.
    #[must_use]
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Creates a write error for `path`.
    #[must_use]
    pub fn write(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Write {
            path: path.into(),
            source,
        }
    }

    /// Creates a runtime error.
    #[must_use]
    pub fn runtime(msg: impl Into<String>) -> Self {
        Self::Runtime(msg.into())
    }

    /// Returns true if this error must stop the process before the loop starts.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = WatchError::config("poll_interval must be positive");
        assert_eq!(
            err.to_string(),
            "configuration error: poll_interval must be positive"
        );
    }

    #[test]
    fn test_write_error_display() {
        let err = WatchError::write(
            "/srv/out.conf",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        let msg = err.to_string();
        assert!(msg.contains("/srv/out.conf"));
        assert!(msg.contains("denied"));
    }

    #[test]
    fn test_error_fatal() {
        assert!(WatchError::config("bad").is_fatal());
        assert!(!WatchError::runtime("transient").is_fatal());
        assert!(!WatchError::write("/x", std::io::Error::other("full")).is_fatal());
    }
}
