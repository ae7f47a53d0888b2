//! Error types for the dbx-marker crate.

use camino::Utf8PathBuf;

/// Errors that can occur while reading or writing ignore markers.
///
/// # Examples
///
/// ```
/// use dbx_marker::MarkerError;
///
/// let err = MarkerError::io("set", "/d/node_modules", std::io::ErrorKind::PermissionDenied.into());
/// assert!(err.to_string().contains("/d/node_modules"));
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum MarkerError {
    /// No marker mechanism is available on this platform.
    #[error("ignore markers are not supported: {reason}")]
    Unsupported {
        /// What is missing.
        reason: String,
    },

    /// An OS call on a specific path failed.
    #[error("failed to {operation} ignore marker on {path}: {source}")]
    Io {
        /// `set`, `remove`, or `read`.
        operation: &'static str,
        /// The path the call targeted.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MarkerError {
    /// Creates an [`Io`](Self::Io) error.
    pub fn io(operation: &'static str, path: impl Into<Utf8PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            operation,
            path: path.into(),
            source,
        }
    }

    /// Returns `true` if the failure only affects one path.
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }

    /// Returns `true` if the path vanished before the call.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Io { source, .. } if source.kind() == std::io::ErrorKind::NotFound)
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::Io { path, .. } => Some(path),
            Self::Unsupported { .. } => None,
        }
    }
}
