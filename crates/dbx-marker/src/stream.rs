//! NTFS alternate-data-stream marker for Windows.

use std::fs;
use std::io;

use camino::{Utf8Path, Utf8PathBuf};

use crate::error::MarkerError;
use crate::{IgnoreMarker, DROPBOX_ATTRIBUTE, IGNORED_VALUE};

/// Marks paths by writing `1` to the `com.dropbox.ignored` stream.
///
/// Works for files and directories on NTFS; other filesystems reject named
/// streams and every call fails with [`MarkerError::Io`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamMarker;

impl StreamMarker {
    /// Returns the stream path for `path`, `<path>:com.dropbox.ignored`.
    #[must_use]
    pub fn stream_path(path: &Utf8Path) -> Utf8PathBuf {
        Utf8PathBuf::from(format!("{path}:{DROPBOX_ATTRIBUTE}"))
    }
}

impl IgnoreMarker for StreamMarker {
    fn name(&self) -> &'static str {
        "stream"
    }

    fn set_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        fs::write(Self::stream_path(path), IGNORED_VALUE)
            .map_err(|source| MarkerError::io("set", path, source))
    }

    fn remove_flag(&self, path: &Utf8Path) -> Result<(), MarkerError> {
        match fs::remove_file(Self::stream_path(path)) {
            Ok(()) => Ok(()),
            Err(source) if source.kind() == io::ErrorKind::NotFound && path.exists() => Ok(()),
            Err(source) => Err(MarkerError::io("remove", path, source)),
        }
    }

    fn has_flag(&self, path: &Utf8Path) -> Result<bool, MarkerError> {
        match fs::read(Self::stream_path(path)) {
            Ok(value) => Ok(value.trim_ascii() == IGNORED_VALUE),
            Err(source) if source.kind() == io::ErrorKind::NotFound && path.exists() => Ok(false),
            Err(source) => Err(MarkerError::io("read", path, source)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_stream_path() {
        assert_eq!(
            StreamMarker::stream_path(Utf8Path::new(r"C:\Dropbox\node_modules")),
            r"C:\Dropbox\node_modules:com.dropbox.ignored"
        );
    }

    #[test]
    fn test_set_has_remove() {
        let dir = TempDir::new().unwrap();
        let root = Utf8PathBuf::try_from(dir.path().to_path_buf()).unwrap();
        let target = root.join("node_modules");
        fs::create_dir(&target).unwrap();

        let marker = StreamMarker;
        assert!(!marker.has_flag(&target).unwrap());
        marker.set_flag(&target).unwrap();
        assert!(marker.has_flag(&target).unwrap());
        marker.remove_flag(&target).unwrap();
        assert!(!marker.has_flag(&target).unwrap());
        marker.remove_flag(&target).unwrap();
    }
}
