//! Extended-attribute marker for Unix platforms.

use std::io;

use camino::Utf8Path;

use crate::error::MarkerError;
use crate::{IgnoreMarker, IGNORED_VALUE};

/// Attribute name on macOS, where xattrs have no namespace prefix.
#[cfg(target_os = "macos")]
const ATTRIBUTE: &str = "com.dropbox.ignored";

/// Attribute name on Linux and the BSDs, which require the `user.` namespace.
#[cfg(not(target_os = "macos"))]
const ATTRIBUTE: &str = "user.com.dropbox.ignored";

/// Marks paths with the `com.dropbox.ignored` extended attribute.
///
/// The filesystem must support user extended attributes; on filesystems
/// without them every call fails with [`MarkerError::Io`].
#[derive(Debug, Clone, Copy)]
pub struct XattrMarker {
    attribute: &'static str,
}

impl XattrMarker {
    /// Creates the marker for the current platform.
    ///
    /// # Errors
    ///
    /// Returns [`MarkerError::Unsupported`] if the platform has no extended
    /// attribute support.
    pub fn new() -> Result<Self, MarkerError> {
        if !xattr::SUPPORTED_PLATFORM {
            return Err(MarkerError::Unsupported {
                reason: format!("extended attributes are unavailable on {}", std::env::consts::OS),
            });
        }
        Ok(Self {
            attribute: ATTRIBUTE,
        })
    }

    /// Returns the attribute name written to files.
    #[inline]
    #[must_use]
    pub const fn attribute(&self) -> &'static str {
        self.attribute
    }

    fn read(&self, path: &Utf8Path) -> Result<Option<Vec<u8>>, MarkerError> {
        xattr::get(path, self.attribute).map_err(|source| MarkerError::io("read", path, source))
    }
}

impl IgnoreMarker for XattrMarker {
    fn name(&self) -> &'static str {
        "xattr"
    }

    fn set_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        xattr::set(path, self.attribute, IGNORED_VALUE)
            .map_err(|source| MarkerError::io("set", path, source))?;
        tracing::trace!(path = %path, attribute = self.attribute, "Set ignore marker");
        Ok(())
    }

    fn remove_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        // Removing an absent attribute fails with ENODATA/ENOATTR.
        if self.read(path)?.is_none() {
            return Ok(());
        }
        match xattr::remove(path, self.attribute) {
            Ok(()) => {
                tracing::trace!(path = %path, attribute = self.attribute, "Removed ignore marker");
                Ok(())
            }
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(MarkerError::io("remove", path, source)),
        }
    }

    fn has_flag(&self, path: &Utf8Path) -> Result<bool, MarkerError> {
        Ok(self.read(path)?.is_some_and(|value| value == IGNORED_VALUE))
    }
}
