//! Error types for the dbx-watcher crate.

use camino::Utf8PathBuf;

/// Errors that can occur while watching a directory tree.
///
/// # Error Recovery Strategy
///
/// - **Subscription errors** ([`WatchError::Notify`] from `new`,
///   [`WatchError::PathNotFound`]): fatal for that root
/// - **Backend errors while running** ([`WatchError::Notify`] on the error
///   stream): logged, watching continues
/// - **Overflow** ([`WatchError::Overflow`]): recoverable, some events were lost
/// - **Non-UTF-8 path** ([`WatchError::NonUtf8Path`]): recoverable, skipped
/// - **Channel closed** ([`WatchError::ChannelClosed`]): the watcher is gone
///
/// # Examples
///
/// ```
/// use dbx_watcher::WatchError;
///
/// let err = WatchError::path_not_found("/home/u/Dropbox");
/// assert!(err.is_fatal());
/// assert_eq!(err.path().map(|p| p.as_str()), Some("/home/u/Dropbox"));
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    /// The notify backend failed to subscribe or reported a runtime error.
    #[error("notify watcher error: {0}")]
    Notify(#[from] notify::Error),

    /// The directory to watch does not exist.
    #[error("path does not exist: {0}")]
    PathNotFound(Utf8PathBuf),

    /// The backend dropped events and asked for a rescan.
    #[error("event queue overflowed, some changes below {0} were missed")]
    Overflow(Utf8PathBuf),

    /// The watcher task ended or panicked before reporting.
    #[error("watcher channel closed unexpectedly")]
    ChannelClosed,

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// An I/O error occurred while resolving the directory.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WatchError {
    /// Creates a new [`WatchError::PathNotFound`] error.
    #[inline]
    pub fn path_not_found(path: impl Into<Utf8PathBuf>) -> Self {
        Self::PathNotFound(path.into())
    }

    /// Creates a new [`WatchError::NonUtf8Path`] error.
    #[inline]
    pub fn non_utf8_path(path: impl Into<std::path::PathBuf>) -> Self {
        Self::NonUtf8Path(path.into())
    }

    /// Returns `true` if watching can continue after this error.
    #[inline]
    #[must_use]
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::NonUtf8Path(_) | Self::Overflow(_))
    }

    /// Returns `true` if this error ends watching of the affected root.
    #[inline]
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        !self.is_recoverable()
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::PathNotFound(path) | Self::Overflow(path) => Some(path),
            Self::Notify(_) | Self::ChannelClosed | Self::NonUtf8Path(_) | Self::Io(_) => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_path_not_found_is_fatal() {
        let err = WatchError::path_not_found("/missing/root");
        assert!(err.is_fatal());
        assert_eq!(err.path().map(|p| p.as_str()), Some("/missing/root"));
        assert!(err.to_string().contains("/missing/root"));
    }

    #[test]
    fn test_overflow_is_recoverable() {
        let err = WatchError::Overflow(Utf8PathBuf::from("/root"));
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("overflowed"));
    }

    #[test]
    fn test_non_utf8_is_recoverable() {
        let err = WatchError::non_utf8_path(PathBuf::from("bad"));
        assert!(err.is_recoverable());
        assert!(err.path().is_none());
        assert!(err.to_string().contains("not valid UTF-8"));
    }

    #[test]
    fn test_channel_closed_is_fatal() {
        let err = WatchError::ChannelClosed;
        assert!(err.is_fatal());
        assert!(err.path().is_none());
    }

    #[test]
    fn test_notify_from() {
        let err: WatchError = notify::Error::generic("backend gone").into();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("backend gone"));
    }
}
