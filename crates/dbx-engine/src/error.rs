//! Error types for the dbx-engine crate.
//!
//! This module provides the [`EngineError`] type covering the failure
//! classes of an ignore engine.
//!
//! # Error Recovery Strategy
//!
//! - **Setup** ([`EngineError::ResolveRoot`], [`EngineError::NotADirectory`],
//!   [`EngineError::Watch`]): fatal for that root only
//! - **Rules** ([`EngineError::Rules`]): log, keep the previous rules of the directory
//! - **Marker and walk** ([`EngineError::Marker`], [`EngineError::Walk`]): log, skip the path
//! - **Cancellation** ([`EngineError::ShuttingDown`]): not a failure, stop quietly

use camino::Utf8PathBuf;
use dbx_marker::MarkerError;
use dbx_rules::RuleError;
use dbx_watcher::WatchError;

/// Errors that can occur while running an ignore engine.
///
/// # Examples
///
/// ```
/// use camino::Utf8PathBuf;
/// use dbx_engine::EngineError;
///
/// let err = EngineError::ShuttingDown(Utf8PathBuf::from("/d/project"));
/// assert!(err.is_cancellation());
/// assert!(!err.is_fatal());
/// ```
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The root could not be made absolute or inspected.
    #[error("failed to resolve root {path}: {source}")]
    ResolveRoot {
        /// The root as given.
        path: Utf8PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The root exists but is not a directory.
    #[error("root is not a directory: {0}")]
    NotADirectory(Utf8PathBuf),

    /// A path is not valid UTF-8.
    #[error("path is not valid UTF-8: {}", _0.display())]
    NonUtf8Path(std::path::PathBuf),

    /// A rule file could not be read or compiled.
    #[error(transparent)]
    Rules(#[from] RuleError),

    /// A marker operation failed.
    #[error(transparent)]
    Marker(#[from] MarkerError),

    /// The change watcher failed.
    #[error(transparent)]
    Watch(#[from] WatchError),

    /// A directory could not be walked.
    #[error("failed to walk {path}: {source}")]
    Walk {
        /// The directory the walk started at.
        path: Utf8PathBuf,
        /// The underlying traversal error.
        #[source]
        source: walkdir::Error,
    },

    /// A walk was aborted because the engine is shutting down.
    #[error("shutting down, walk of {0} aborted")]
    ShuttingDown(Utf8PathBuf),

    /// A background task panicked or was aborted.
    #[error("engine task failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl EngineError {
    /// Returns `true` for the shutdown condition, which is not a failure.
    #[must_use]
    pub const fn is_cancellation(&self) -> bool {
        matches!(self, Self::ShuttingDown(_))
    }

    /// Returns `true` if the engine for this root cannot start or continue.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::ResolveRoot { .. } | Self::NotADirectory(_) | Self::Watch(_) | Self::Task(_)
        )
    }

    /// Returns the path associated with this error, if any.
    #[must_use]
    pub fn path(&self) -> Option<&Utf8PathBuf> {
        match self {
            Self::ResolveRoot { path, .. }
            | Self::Walk { path, .. }
            | Self::NotADirectory(path)
            | Self::ShuttingDown(path) => Some(path),
            Self::Marker(err) => err.path(),
            Self::Watch(err) => err.path(),
            Self::NonUtf8Path(_) | Self::Rules(_) | Self::Task(_) => None,
        }
    }
}
