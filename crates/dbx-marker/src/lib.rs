//! Dropbox ignore markers.
//!
//! The Dropbox client skips any file or directory that carries the attribute
//! `com.dropbox.ignored` with value `1`. How an attribute is attached depends
//! on the platform:
//!
//! | Platform | Mechanism | Attribute |
//! |----------|-----------|-----------|
//! | Linux and other Unix | extended attribute | `user.com.dropbox.ignored` |
//! | macOS | extended attribute | `com.dropbox.ignored` |
//! | Windows | NTFS alternate data stream | `<path>:com.dropbox.ignored` |
//!
//! All mechanisms implement [`IgnoreMarker`]. [`platform_marker`] returns the
//! one compiled in for the current platform; [`MemoryMarker`] keeps markers
//! in process memory for tests and dry runs.
//!
//! # Examples
//!
//! ```no_run
//! use camino::Utf8Path;
//! use dbx_marker::{platform_marker, IgnoreMarker};
//!
//! let marker = platform_marker()?;
//! let path = Utf8Path::new("/home/u/Dropbox/project/node_modules");
//! if !marker.has_flag(path)? {
//!     marker.set_flag(path)?;
//! }
//! # Ok::<(), dbx_marker::MarkerError>(())
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

use std::fmt;
use std::sync::Arc;

use camino::Utf8Path;

pub mod error;
pub mod memory;
#[cfg(windows)]
pub mod stream;
#[cfg(unix)]
pub mod xattr;

pub use error::MarkerError;
pub use memory::MemoryMarker;
#[cfg(windows)]
pub use stream::StreamMarker;
#[cfg(unix)]
pub use xattr::XattrMarker;

/// Attribute name understood by the Dropbox client.
pub const DROPBOX_ATTRIBUTE: &str = "com.dropbox.ignored";

/// Attribute value meaning "ignored".
pub const IGNORED_VALUE: &[u8] = b"1";

/// Sets, clears, and queries the Dropbox ignore marker on a path.
///
/// Implementations are stateless with respect to the filesystem: every call
/// goes to the OS. All operations follow symlinks as the OS call does.
pub trait IgnoreMarker: Send + Sync + fmt::Debug {
    /// Short name of the mechanism, for logs.
    fn name(&self) -> &'static str;

    /// Marks `path` as ignored.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Io`] if the OS call fails.
    fn set_flag(&self, path: &Utf8Path) -> Result<(), MarkerError>;

    /// Clears the marker. Clearing an absent marker succeeds.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Io`] if the OS call fails.
    fn remove_flag(&self, path: &Utf8Path) -> Result<(), MarkerError>;

    /// Returns `true` if `path` currently carries the marker.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Io`] if the OS call fails.
    fn has_flag(&self, path: &Utf8Path) -> Result<bool, MarkerError>;
}

/// Returns the marker implementation for the current platform.
///
/// # Errors
///
/// Returns [`MarkerError::Unsupported`] if no mechanism exists for this
/// platform. Callers treat this as fatal.
pub fn platform_marker() -> Result<Arc<dyn IgnoreMarker>, MarkerError> {
    #[cfg(unix)]
    {
        let marker = XattrMarker::new()?;
        tracing::debug!(marker = marker.name(), attribute = marker.attribute(), "Selected ignore marker");
        Ok(Arc::new(marker))
    }
    #[cfg(windows)]
    {
        tracing::debug!(marker = "stream", "Selected ignore marker");
        Ok(Arc::new(StreamMarker))
    }
    #[cfg(not(any(unix, windows)))]
    {
        Err(MarkerError::Unsupported {
            reason: format!("no ignore marker for {}", std::env::consts::OS),
        })
    }
}
